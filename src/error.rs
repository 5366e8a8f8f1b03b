//! Error types shared by every subsystem

use std::fmt;

/// Errors produced by the template parser/evaluator (see [`crate::parser`])
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// a `{:` was not matched by a later `:}` at the top level
    #[error("misaligned closing block near {0:?}")]
    MisalignedBlock(String),
    /// a token appeared where the grammar did not expect one
    #[error("wrong token {0:?}")]
    WrongToken(String),
    /// a `(` was expected but not found
    #[error("open parenthesis expected near {0:?}")]
    ExpectedOpenParen(String),
    /// a `)` was expected but not found
    #[error("closed parenthesis expected near {0:?}")]
    ExpectedCloseParen(String),
    /// a `{:` was expected but not found
    #[error("open block expected near {0:?}")]
    ExpectedOpenBlock(String),
    /// a `:}` was expected but not found
    #[error("closed block expected near {0:?}")]
    ExpectedCloseBlock(String),
    /// a comparison operator was expected but not found
    #[error("operator expected near {0:?}")]
    ExpectedOperator(String),
    /// an identifier has no entry in the symbol table
    #[error("unknown terminal {0:?}")]
    UnknownTerminal(String),
}

/// Raised when a model's parameters cannot be made memory-safe
///
/// The core otherwise assumes the caller validated `Model`; these are the
/// two fields that directly size arrays and shifts, so they are checked
/// regardless.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// `width` must lie in `1..=128`
    #[error("width {0} out of range 1..=128")]
    WidthOutOfRange(usize),
    /// `table_idx_width` must be one of {1, 2, 4, 8}
    #[error("table index width {0} must be one of 1, 2, 4, 8")]
    BadTableIdxWidth(usize),
    /// a reference algorithm needs a parameter the model leaves undefined
    #[error("model is missing required parameter {0}")]
    MissingParameter(&'static str),
}

/// The unified error type returned by every public entry point
#[derive(Debug, thiserror::Error)]
pub enum CrcError {
    /// a model parameter made the request unsafe to run
    #[error(transparent)]
    Model(#[from] ModelError),
    /// the macro/template evaluator failed
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// two or more requested algorithms produced different results
    #[error("inconsistent algorithms: {0}")]
    InconsistentAlgorithms(InconsistentAlgorithms),
}

/// Detail attached to [`CrcError::InconsistentAlgorithms`]
#[derive(Debug)]
pub struct InconsistentAlgorithms {
    pub(crate) results: Vec<(&'static str, u128)>,
}

impl fmt::Display for InconsistentAlgorithms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.results.iter()
            .map(|(name, v)| format!("{}=0x{:x}", name, v))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}
