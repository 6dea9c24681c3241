use strum_macros::{Display, IntoStaticStr};

/// Errors returned by the tool interface. Each error corresponds to a JVMTI error code.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum TiError {
    /// A required argument is missing.
    #[strum(serialize = "NULL_POINTER")]
    NullPointer,
    /// The argument is not a class.
    #[strum(serialize = "INVALID_CLASS")]
    InvalidClass,
    /// The argument is not a valid object.
    #[strum(serialize = "INVALID_OBJECT")]
    InvalidObject,
    #[strum(serialize = "ILLEGAL_ARGUMENT")]
    IllegalArgument,
    /// The environment lacks a capability the operation requires.
    #[strum(serialize = "MUST_POSSESS_CAPABILITY")]
    MustPossessCapability,
    #[strum(serialize = "OUT_OF_MEMORY")]
    OutOfMemory,
    #[strum(serialize = "NOT_FOUND")]
    NotFound,
}

impl TiError {
    /// The numeric JVMTI error code.
    pub fn code(self) -> u32 {
        match self {
            TiError::InvalidObject => 20,
            TiError::InvalidClass => 21,
            TiError::NotFound => 41,
            TiError::MustPossessCapability => 99,
            TiError::NullPointer => 100,
            TiError::IllegalArgument => 103,
            TiError::OutOfMemory => 110,
        }
    }
}

impl std::error::Error for TiError {}

pub type TiResult<T> = Result<T, TiError>;
