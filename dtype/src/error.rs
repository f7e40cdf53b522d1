use snafu::Snafu;

use crate::{DType, MAX_INTEGER_BITS};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Bit width outside of what the dtype family supports.
    #[snafu(display("invalid {kind} bit width {bit_width}"))]
    InvalidBitWidth { bit_width: u32, kind: &'static str },

    /// No integer dtype is wide enough for a value range.
    #[snafu(display("no integer of at most {MAX_INTEGER_BITS} bits holds the range [{min}, {max}]"))]
    RangeTooWide { min: i128, max: i128 },

    /// Two dtypes cannot be reconciled into one representable integer.
    #[snafu(display("cannot mix {lhs} and {rhs}: no integer of at most {MAX_INTEGER_BITS} bits holds both"))]
    DTypeMix { lhs: DType, rhs: DType },
}
