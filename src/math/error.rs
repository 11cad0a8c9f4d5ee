use thiserror::Error;

/// Failures raised by the exact-arithmetic layer and the RPN evaluator on top of it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("division by zero")]
    DivisionByZero,

    /// Negative denominators are rejected, never flipped silently.
    #[error("missing normalization: denominator {0} is negative")]
    MissingNormalization(String),

    #[error("square root of negative numbers is not supported")]
    NegativeSquareRoot,

    #[error("invalid fraction literal '{0}'")]
    Parse(String),

    #[error("value {0} does not fit a decimal")]
    DecimalOverflow(String),

    #[error("regression requires at least one sample")]
    EmptySamples,

    #[error("stack underflow for '{op}'")]
    StackUnderflow { op: String },

    #[error("unknown operand '{0}'")]
    UnknownOperand(String),

    #[error("one element should remain on the stack, found {remaining}")]
    ExpectedSingleResult { remaining: usize },
}
