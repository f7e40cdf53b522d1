use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("{operation}: IR operation error"))]
    Ir { operation: String, source: veil_ir::Error },

    /// No routine is registered under this name.
    #[snafu(display("operation '{operation}' is not supported"))]
    UnsupportedOperation { operation: String },

    /// Operation deliberately left out in favour of another one.
    #[snafu(display("operation '{operation}' is not supported, use {replacement} instead"))]
    ReplacedOperation { operation: String, replacement: String },

    /// Routine exists but takes a different number of operands.
    #[snafu(display("operation '{operation}' takes {arity} operand(s)"))]
    RoutineArity { operation: String, arity: usize },

    /// Binary operation where neither operand is a constant.
    #[snafu(display("operation '{operation}' needs a constant operand"))]
    NoConstantOperand { operation: String },

    /// Index component that is only known at run time.
    #[snafu(display("index component {position} is a traced value, only constant indices are supported"))]
    DynamicIndex { position: usize },

    #[snafu(display("operands of '{operation}' belong to different traces"))]
    SessionMismatch { operation: String },

    #[snafu(display("parameter '{name}' is declared more than once"))]
    DuplicateParameter { name: String },

    #[snafu(display("parameter '{name}' has an invalid dtype"))]
    InvalidParameter { name: String, source: veil_dtype::Error },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
