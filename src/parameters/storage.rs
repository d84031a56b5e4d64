//! Fixed-size parameter storage.
//!
//! Leaf models own their parameters through a [`ParameterBlock`], a shared
//! handle to a [`Storage`]. Two composites that map the same block see the
//! same parameters; this is how a parameter is shared between models.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::parameter::Parameter;
use super::ParameterPolicy;
use crate::error::{MealError, Result};

/// Storage for the parameters of one leaf model.
///
/// Constants have no parameters, a single parameter is stored inline and
/// anything else is stored in a vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Storage {
    Empty,
    Single(Parameter),
    Vector(Vec<Parameter>),
}

impl Storage {
    pub fn empty() -> Self {
        Storage::Empty
    }

    pub fn len(&self) -> usize {
        match self {
            Storage::Empty => 0,
            Storage::Single(_) => 1,
            Storage::Vector(params) => params.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Result<&Parameter> {
        let nparam = self.len();
        match self {
            Storage::Single(param) if index == 0 => Ok(param),
            Storage::Vector(params) if index < nparam => Ok(&params[index]),
            _ => Err(MealError::range(index, nparam, "Storage::get")),
        }
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut Parameter> {
        let nparam = self.len();
        match self {
            Storage::Single(param) if index == 0 => Ok(param),
            Storage::Vector(params) if index < nparam => Ok(&mut params[index]),
            _ => Err(MealError::range(index, nparam, "Storage::get_mut")),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        match self {
            Storage::Empty => (&[] as &[Parameter]).iter(),
            Storage::Single(param) => std::slice::from_ref(param).iter(),
            Storage::Vector(params) => params.iter(),
        }
    }

    /// Truncate or extend to `nparam` parameters, creating new ones with `fill`
    pub fn resize(&mut self, nparam: usize, mut fill: impl FnMut(usize) -> Parameter) {
        let mut params = std::mem::replace(self, Storage::Empty).into_vec();
        params.truncate(nparam);
        while params.len() < nparam {
            params.push(fill(params.len()));
        }
        *self = Storage::from(params);
    }

    fn into_vec(self) -> Vec<Parameter> {
        match self {
            Storage::Empty => Vec::new(),
            Storage::Single(param) => vec![param],
            Storage::Vector(params) => params,
        }
    }
}

impl From<Parameter> for Storage {
    fn from(param: Parameter) -> Self {
        Storage::Single(param)
    }
}

impl From<Vec<Parameter>> for Storage {
    fn from(params: Vec<Parameter>) -> Self {
        if params.is_empty() {
            return Storage::Empty;
        }
        match <[Parameter; 1]>::try_from(params) {
            Ok([param]) => Storage::Single(param),
            Err(params) => Storage::Vector(params),
        }
    }
}

struct BlockState {
    storage: RefCell<Storage>,
    version: Cell<u64>,
}

/// Shared handle to the parameters of a leaf model.
///
/// Identity matters: two handles refer to the same parameters only if one was
/// cloned from the other (see [`ParameterBlock::same`]).
#[derive(Clone)]
pub struct ParameterBlock {
    state: Rc<BlockState>,
}

impl ParameterBlock {
    pub fn new(storage: impl Into<Storage>) -> Self {
        Self {
            state: Rc::new(BlockState {
                storage: RefCell::new(storage.into()),
                version: Cell::new(0),
            }),
        }
    }

    /// A block without parameters, as used by constants
    pub fn empty() -> Self {
        Self::new(Storage::empty())
    }

    /// True if both handles refer to the same parameters
    pub fn same(&self, other: &ParameterBlock) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// Copy of the parameters currently stored
    pub fn parameters(&self) -> Vec<Parameter> {
        self.state.storage.borrow().iter().cloned().collect()
    }

    fn read<T>(&self, index: usize, f: impl FnOnce(&Parameter) -> T) -> Result<T> {
        let storage = self.state.storage.borrow();
        storage.get(index).map(f)
    }

    fn write<T>(&self, index: usize, f: impl FnOnce(&mut Parameter) -> T) -> Result<T> {
        let mut storage = self.state.storage.borrow_mut();
        storage.get_mut(index).map(f)
    }

    /// Truncate or extend the parameters; new ones are created by `fill`.
    ///
    /// Composites that have already mapped this block keep the old size, so
    /// resize a model before adding it to a parent.
    pub fn resize(&self, nparam: usize, fill: impl FnMut(usize) -> Parameter) {
        if self.nparam() == nparam {
            return;
        }
        self.state.storage.borrow_mut().resize(nparam, fill);
        self.touch();
    }

    fn touch(&self) {
        self.state.version.set(self.state.version.get() + 1);
    }
}

impl ParameterPolicy for ParameterBlock {
    fn nparam(&self) -> usize {
        self.state.storage.borrow().len()
    }

    fn param_name(&self, index: usize) -> Result<String> {
        self.read(index, |p| p.name().to_string())
    }

    fn param(&self, index: usize) -> Result<f64> {
        self.read(index, Parameter::value)
    }

    fn set_param(&self, index: usize, value: f64) -> Result<()> {
        let changed = self.write(index, |p| {
            let changed = p.value().to_bits() != value.to_bits();
            p.set_value(value);
            changed
        })?;
        if changed {
            self.touch();
        }
        Ok(())
    }

    fn variance(&self, index: usize) -> Result<f64> {
        self.read(index, Parameter::variance)
    }

    fn set_variance(&self, index: usize, variance: f64) -> Result<()> {
        self.write(index, |p| p.set_variance(variance))?
    }

    fn infit(&self, index: usize) -> Result<bool> {
        self.read(index, Parameter::infit)
    }

    fn set_infit(&self, index: usize, flag: bool) -> Result<()> {
        self.write(index, |p| p.set_infit(flag))
    }

    fn blocks(&self) -> Vec<ParameterBlock> {
        vec![self.clone()]
    }

    fn version(&self) -> u64 {
        self.state.version.get()
    }
}

impl fmt::Debug for ParameterBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterBlock")
            .field("address", &Rc::as_ptr(&self.state))
            .field("version", &self.state.version.get())
            .field("storage", &*self.state.storage.borrow())
            .finish()
    }
}
