use snafu::Snafu;

use crate::{Value, shape::Shape};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    // =========================================================================
    // Value mixing
    // =========================================================================
    /// Shapes are neither equal nor scalar-broadcastable.
    #[snafu(display("cannot mix shapes {lhs:?} and {rhs:?}"))]
    ShapeMix { lhs: Shape, rhs: Shape },

    /// Dtypes cannot be reconciled.
    #[snafu(display("dtype mixing failed: {source}"))]
    DTypeMix { source: veil_dtype::Error },

    /// Edge dtype with a bit width outside its family.
    #[snafu(display("invalid edge dtype: {source}"))]
    InvalidDType { source: veil_dtype::Error },

    // =========================================================================
    // Node construction
    // =========================================================================
    /// Wrong number of inputs for a node kind.
    #[snafu(display("{node} expects {expected} input(s), got {actual}"))]
    Arity { node: &'static str, expected: usize, actual: usize },

    /// Operand is not the kind of tensor the node requires.
    #[snafu(display("{node} expects {expected} operands, got shape {shape:?}"))]
    RankMismatch { node: &'static str, expected: &'static str, shape: Shape },

    /// Contracted dimensions of `dot` / `matmul` disagree.
    #[snafu(display("{node} cannot contract shapes {lhs:?} and {rhs:?}"))]
    ContractionMismatch { node: &'static str, lhs: Shape, rhs: Shape },

    /// Reshape to a different number of elements.
    #[snafu(display("reshape size mismatch: input size {input_size} != output size {output_size}"))]
    ReshapeSizeMismatch { input_size: usize, output_size: usize },

    // =========================================================================
    // Indexing
    // =========================================================================
    #[snafu(display("too many indices: {count} components for a tensor of rank {ndim}"))]
    TooManyIndices { count: usize, ndim: usize },

    /// Integer index outside of `[-dim, dim)`.
    #[snafu(display("index {index} is out of bounds for axis {axis} with size {dim}"))]
    IndexRange { axis: usize, index: isize, dim: usize },

    #[snafu(display("slice step cannot be zero (axis {axis})"))]
    ZeroSliceStep { axis: usize },

    // =========================================================================
    // Trace log and graph
    // =========================================================================
    /// Operand refers to an entry that is not recorded yet.
    #[snafu(display("operand {operand} of entry {entry} is not an earlier entry"))]
    ForwardReference { entry: usize, operand: usize },

    #[snafu(display("entry {entry} is not recorded in the trace log"))]
    UnknownEntry { entry: usize },

    /// Producer output disagrees with the value the consumer recorded for a slot.
    #[snafu(display("slot {slot} expects {expected}, producer yields {actual}"))]
    OperandMismatch { slot: usize, expected: Value, actual: Value },

    #[snafu(display("a graph needs at least one output"))]
    NoOutputs,

    // =========================================================================
    // Evaluation
    // =========================================================================
    #[snafu(display("no data provided for input {position}"))]
    MissingInput { position: usize },

    /// Node evaluation failed for the given data.
    #[snafu(display("evaluating {node} failed: {reason}"))]
    Evaluation { node: String, reason: String },

    // =========================================================================
    // Table lookup synthesis
    // =========================================================================
    /// Table requested for a node that is not a TLU over an unsigned integer.
    #[snafu(display("{node} with input {input} cannot be turned into a lookup table"))]
    TableUnsupported { node: String, input: Value },

    #[snafu(display("lookup table over {bit_width} bits exceeds the {max_bit_width}-bit limit"))]
    TableTooLarge { bit_width: u32, max_bit_width: u32 },

    /// Function is undefined over the whole input domain.
    #[snafu(display("{node} is undefined for every input, no table can be built"))]
    EmptyDomain { node: String },
}
