use thiserror::Error;

/// Error types for the meal-rs library.
#[derive(Error, Debug)]
pub enum MealError {
    /// A model was evaluated or fitted before it was completely configured.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// An argument was out of its allowed domain (sizes, variances, ...).
    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    /// A parameter or model index was out of range.
    #[error("Invalid range: {context} index={index} >= nparam={nparam}")]
    InvalidRange {
        index: usize,
        nparam: usize,
        context: String,
    },

    /// Gauss-Jordan elimination found no pivot above the singular threshold.
    #[error("Singular matrix: pivot={pivot:e} at row {row}{}", degenerate_suffix(.degenerate))]
    SingularMatrix {
        pivot: f64,
        row: usize,
        degenerate: Vec<String>,
    },

    /// The solver was asked to fit a model with every parameter fixed.
    ///
    /// This is a configuration error and reports [`ErrorKind::InvalidState`].
    #[error("No parameters in fit")]
    NoFreeParameters,

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An error raised deeper in a composed model, annotated with where it passed through.
    #[error("{source}\n\tin {location}")]
    Traced {
        location: String,
        source: Box<MealError>,
    },
}

fn degenerate_suffix(degenerate: &[String]) -> String {
    if degenerate.is_empty() {
        String::new()
    } else {
        format!(" (degenerate: {})", degenerate.join(", "))
    }
}

/// The broad category of a [`MealError`], independent of how it was annotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidState,
    InvalidParam,
    InvalidRange,
    NumericalFailure,
    Serialization,
}

impl MealError {
    /// Returns the category of the error that was originally raised.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MealError::InvalidState(_) | MealError::NoFreeParameters => ErrorKind::InvalidState,
            MealError::InvalidParam(_) => ErrorKind::InvalidParam,
            MealError::InvalidRange { .. } => ErrorKind::InvalidRange,
            MealError::SingularMatrix { .. } => ErrorKind::NumericalFailure,
            MealError::Json(_) => ErrorKind::Serialization,
            MealError::Traced { source, .. } => source.kind(),
        }
    }

    /// True if the fit failed for numerical reasons rather than misconfiguration.
    ///
    /// Callers may retry a numerical failure with different initial conditions;
    /// configuration errors should be fixed instead.
    pub fn is_numerical(&self) -> bool {
        self.kind() == ErrorKind::NumericalFailure
    }

    /// Returns the innermost error, skipping any annotations.
    pub fn root(&self) -> &MealError {
        match self {
            MealError::Traced { source, .. } => source.root(),
            other => other,
        }
    }

    /// Annotate the error with the location it propagated through.
    pub fn within(self, location: impl Into<String>) -> Self {
        MealError::Traced {
            location: location.into(),
            source: Box::new(self),
        }
    }

    pub(crate) fn range(index: usize, nparam: usize, context: impl Into<String>) -> Self {
        MealError::InvalidRange {
            index,
            nparam,
            context: context.into(),
        }
    }
}

/// Result type alias for meal-rs operations.
pub type Result<T> = std::result::Result<T, MealError>;

/// Adds location annotations to errors as they propagate out of a model tree.
pub trait ResultExt<T> {
    fn context<F, S>(self, location: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context<F, S>(self, location: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|error| error.within(location()))
    }
}
