//! Index projection of child models into a shared parameter space.
//!
//! A [`Composite`] keeps the distinct parameter blocks of every model mapped
//! into it, in the order they were first seen. The parent's parameter `k` is
//! the `k`-th parameter of the concatenation of those blocks. A block reached
//! through more than one child occupies a single range of parent indices, and
//! gradient contributions from each child are summed into it.

use std::ops::Deref;
use std::rc::Rc;

use tracing::trace;

use crate::element::Element;
use crate::error::{MealError, Result};
use crate::model::Function;
use crate::parameters::{ParameterBlock, ParameterPolicy};

/// Handle returned by [`Composite::map`], used to project and unmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MapKey(usize);

#[derive(Debug)]
struct Entry {
    block: ParameterBlock,
    offset: usize,
    references: usize,
}

#[derive(Debug)]
struct Mapping {
    blocks: Vec<ParameterBlock>,
    imap: Vec<usize>,
}

/// The union parameter space of a set of child models.
#[derive(Debug, Default)]
pub struct Composite {
    entries: Vec<Entry>,
    mappings: Vec<Option<Mapping>>,
    nparam: usize,
}

impl Composite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct parameter blocks mapped
    pub fn nblock(&self) -> usize {
        self.entries.len()
    }

    /// Number of children currently mapped
    pub fn nmodel(&self) -> usize {
        self.mappings.iter().filter(|m| m.is_some()).count()
    }

    /// Map the parameters of `model` into this space.
    ///
    /// Blocks already present (by identity) are reused, so the parameter
    /// they hold keeps one parent index however many children share it.
    pub fn map<M: Function + ?Sized>(&mut self, model: &M) -> MapKey {
        let blocks = model.blocks();
        debug_assert_eq!(
            blocks.iter().map(|b| b.nparam()).sum::<usize>(),
            model.nparam(),
            "{} parameter blocks do not cover its parameters",
            model.name()
        );

        for block in &blocks {
            match self.entries.iter_mut().find(|e| e.block.same(block)) {
                Some(entry) => entry.references += 1,
                None => self.entries.push(Entry {
                    block: block.clone(),
                    offset: 0,
                    references: 1,
                }),
            }
        }

        let key = MapKey(self.mappings.len());
        self.mappings.push(Some(Mapping {
            blocks,
            imap: Vec::new(),
        }));
        self.remap();

        trace!(
            model = %model.name(),
            nparam = self.nparam,
            "Composite::map"
        );
        key
    }

    /// Remove a previously mapped child.
    ///
    /// Blocks no longer referenced by any child are released and the
    /// remaining parent indices are renumbered.
    pub fn unmap(&mut self, key: MapKey) -> Result<()> {
        let mapping = self
            .mappings
            .get_mut(key.0)
            .and_then(Option::take)
            .ok_or_else(|| MealError::InvalidState(format!("Composite::unmap {:?} not mapped", key)))?;

        for block in &mapping.blocks {
            if let Some(entry) = self.entries.iter_mut().find(|e| e.block.same(block)) {
                entry.references -= 1;
            }
        }
        self.entries.retain(|e| e.references > 0);
        self.remap();

        trace!(nparam = self.nparam, "Composite::unmap");
        Ok(())
    }

    /// Parent index of every parameter of the child mapped under `key`
    pub fn imap(&self, key: MapKey) -> Result<&[usize]> {
        self.mapping(key).map(|m| m.imap.as_slice())
    }

    /// Add the gradient of a child into the gradient of the parent.
    ///
    /// `parent_gradient[imap[i]] += child_gradient[i]` for every child index;
    /// entries are summed so that shared parameters collect every
    /// contribution.
    pub fn project_gradient<R: Element>(
        &self,
        key: MapKey,
        child_gradient: &[R],
        parent_gradient: &mut [R],
    ) -> Result<()> {
        let imap = self.imap(key)?;
        if child_gradient.len() != imap.len() {
            return Err(MealError::InvalidState(format!(
                "Composite::project_gradient child gradient size={} != nparam={}",
                child_gradient.len(),
                imap.len()
            )));
        }

        for (&index, g) in imap.iter().zip(child_gradient) {
            let slot = parent_gradient
                .get_mut(index)
                .ok_or_else(|| MealError::range(index, self.nparam, "Composite::project_gradient"))?;
            *slot = slot.clone() + g.clone();
        }
        Ok(())
    }

    fn mapping(&self, key: MapKey) -> Result<&Mapping> {
        self.mappings
            .get(key.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| MealError::InvalidState(format!("Composite {:?} not mapped", key)))
    }

    fn remap(&mut self) {
        let mut offset = 0;
        for entry in &mut self.entries {
            entry.offset = offset;
            offset += entry.block.nparam();
        }
        self.nparam = offset;

        let entries = &self.entries;
        for mapping in self.mappings.iter_mut().flatten() {
            mapping.imap.clear();
            for block in &mapping.blocks {
                if let Some(entry) = entries.iter().find(|e| e.block.same(block)) {
                    mapping.imap.extend(entry.offset..entry.offset + block.nparam());
                }
            }
        }
    }

    fn locate(&self, index: usize, context: &str) -> Result<(&ParameterBlock, usize)> {
        self.entries
            .iter()
            .find(|e| index >= e.offset && index < e.offset + e.block.nparam())
            .map(|e| (&e.block, index - e.offset))
            .ok_or_else(|| MealError::range(index, self.nparam, context))
    }
}

impl ParameterPolicy for Composite {
    fn nparam(&self) -> usize {
        self.nparam
    }

    fn param_name(&self, index: usize) -> Result<String> {
        let (block, local) = self.locate(index, "Composite::param_name")?;
        block.param_name(local)
    }

    fn param(&self, index: usize) -> Result<f64> {
        let (block, local) = self.locate(index, "Composite::param")?;
        block.param(local)
    }

    fn set_param(&self, index: usize, value: f64) -> Result<()> {
        let (block, local) = self.locate(index, "Composite::set_param")?;
        block.set_param(local, value)
    }

    fn variance(&self, index: usize) -> Result<f64> {
        let (block, local) = self.locate(index, "Composite::variance")?;
        block.variance(local)
    }

    fn set_variance(&self, index: usize, variance: f64) -> Result<()> {
        let (block, local) = self.locate(index, "Composite::set_variance")?;
        block.set_variance(local, variance)
    }

    fn infit(&self, index: usize) -> Result<bool> {
        let (block, local) = self.locate(index, "Composite::infit")?;
        block.infit(local)
    }

    fn set_infit(&self, index: usize, flag: bool) -> Result<()> {
        let (block, local) = self.locate(index, "Composite::set_infit")?;
        block.set_infit(local, flag)
    }

    fn blocks(&self) -> Vec<ParameterBlock> {
        self.entries.iter().map(|e| e.block.clone()).collect()
    }

    fn version(&self) -> u64 {
        self.entries.iter().map(|e| e.block.version()).sum()
    }
}

/// A shared child model together with its mapping into a parent.
pub struct Project<M: ?Sized> {
    model: Rc<M>,
    key: MapKey,
}

impl<M: Function + ?Sized> Project<M> {
    /// Map `model` into `composite` and remember the key
    pub fn new(model: Rc<M>, composite: &mut Composite) -> Self {
        let key = composite.map(&*model);
        Self { model, key }
    }

    pub fn key(&self) -> MapKey {
        self.key
    }

    /// The shared model
    pub fn model(&self) -> &Rc<M> {
        &self.model
    }
}

impl<M: ?Sized> Clone for Project<M> {
    fn clone(&self) -> Self {
        Self {
            model: Rc::clone(&self.model),
            key: self.key,
        }
    }
}

impl<M: ?Sized> Deref for Project<M> {
    type Target = M;

    fn deref(&self) -> &M {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::parameters::Parameter;

    struct Leaf {
        block: ParameterBlock,
    }

    impl Leaf {
        fn new(names: &[&str]) -> Self {
            let params = names.iter().map(|n| Parameter::new(n, 1.0)).collect::<Vec<_>>();
            Self {
                block: ParameterBlock::new(params),
            }
        }
    }

    impl Function for Leaf {
        fn name(&self) -> String {
            "Leaf".to_string()
        }

        fn policy(&self) -> &dyn ParameterPolicy {
            &self.block
        }
    }

    #[test]
    fn test_map_assigns_fresh_indices() {
        let a = Leaf::new(&["a0", "a1"]);
        let b = Leaf::new(&["b0"]);

        let mut composite = Composite::new();
        let ka = composite.map(&a);
        let kb = composite.map(&b);

        assert_eq!(composite.nparam(), 3);
        assert_eq!(composite.imap(ka).unwrap(), &[0, 1]);
        assert_eq!(composite.imap(kb).unwrap(), &[2]);
        assert_eq!(composite.param_name(2).unwrap(), "b0");
    }

    #[test]
    fn test_aliased_block_shares_indices() {
        let shared = Leaf::new(&["s"]);
        let alias = Leaf {
            block: shared.block.clone(),
        };
        let other = Leaf::new(&["o"]);

        let mut composite = Composite::new();
        let k1 = composite.map(&shared);
        let k2 = composite.map(&other);
        let k3 = composite.map(&alias);

        assert_eq!(composite.nparam(), 2);
        assert_eq!(composite.imap(k1).unwrap(), &[0]);
        assert_eq!(composite.imap(k2).unwrap(), &[1]);
        assert_eq!(composite.imap(k3).unwrap(), &[0]);

        let mut gradient = vec![0.0; 2];
        composite.project_gradient(k1, &[1.5], &mut gradient).unwrap();
        composite.project_gradient(k2, &[2.0], &mut gradient).unwrap();
        composite.project_gradient(k3, &[0.25], &mut gradient).unwrap();
        assert_eq!(gradient, vec![1.75, 2.0]);

        composite.set_param(0, 4.0).unwrap();
        assert_eq!(alias.param(0).unwrap(), 4.0);
    }

    #[test]
    fn test_unmap_releases_and_renumbers() {
        let a = Leaf::new(&["a"]);
        let b = Leaf::new(&["b0", "b1"]);
        let c = Leaf::new(&["c"]);

        let mut composite = Composite::new();
        let ka = composite.map(&a);
        let kb = composite.map(&b);
        let kc = composite.map(&c);
        assert_eq!(composite.imap(kc).unwrap(), &[3]);

        composite.unmap(kb).unwrap();
        assert_eq!(composite.nparam(), 2);
        assert_eq!(composite.imap(ka).unwrap(), &[0]);
        assert_eq!(composite.imap(kc).unwrap(), &[1]);
        assert_eq!(composite.nmodel(), 2);

        assert_eq!(composite.imap(kb).unwrap_err().kind(), ErrorKind::InvalidState);
        assert!(composite.unmap(kb).is_err());
    }

    #[test]
    fn test_unmap_keeps_blocks_still_referenced() {
        let a = Leaf::new(&["a"]);
        let alias = Leaf {
            block: a.block.clone(),
        };

        let mut composite = Composite::new();
        let k1 = composite.map(&a);
        let k2 = composite.map(&alias);
        composite.unmap(k1).unwrap();

        assert_eq!(composite.nparam(), 1);
        assert_eq!(composite.imap(k2).unwrap(), &[0]);
    }

    #[test]
    fn test_gradient_size_mismatch() {
        let a = Leaf::new(&["a0", "a1"]);
        let mut composite = Composite::new();
        let key = composite.map(&a);

        let mut gradient = vec![0.0; 2];
        let err = composite
            .project_gradient(key, &[1.0], &mut gradient)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn test_out_of_range() {
        let composite = Composite::new();
        assert_eq!(composite.param(0).unwrap_err().kind(), ErrorKind::InvalidRange);
    }
}
