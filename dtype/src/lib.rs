//! Element data types for traced values.
//!
//! A [`DType`] describes one element flowing on a graph edge: an integer of an
//! explicit bit width and signedness, or a float. Floats only ever appear on
//! clear, compile-time constant data; everything that reaches an encrypted
//! lookup table is an integer.

use std::fmt;

pub mod error;
pub mod mix;


pub use error::{Error, Result};

/// Widest integer the value model can describe.
pub const MAX_INTEGER_BITS: u32 = 64;

/// Float widths accepted by [`DType::float`].
pub const FLOAT_BIT_WIDTHS: [u32; 3] = [16, 32, 64];

/// Element data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// Integer with `bit_width` in `1..=64`.
    Integer { bit_width: u32, is_signed: bool },

    /// Floating point value (constant data only).
    Float { bit_width: u32 },
}

impl DType {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Unsigned integer of `bit_width` bits.
    pub const fn unsigned(bit_width: u32) -> Self {
        Self::Integer { bit_width, is_signed: false }
    }

    /// Signed integer of `bit_width` bits.
    pub const fn signed(bit_width: u32) -> Self {
        Self::Integer { bit_width, is_signed: true }
    }

    pub const fn float64() -> Self {
        Self::Float { bit_width: 64 }
    }

    /// Checked integer constructor.
    pub fn integer(bit_width: u32, is_signed: bool) -> Result<Self> {
        snafu::ensure!(
            (1..=MAX_INTEGER_BITS).contains(&bit_width),
            error::InvalidBitWidthSnafu { bit_width, kind: "integer" }
        );
        Ok(Self::Integer { bit_width, is_signed })
    }

    /// Checked float constructor.
    pub fn float(bit_width: u32) -> Result<Self> {
        snafu::ensure!(FLOAT_BIT_WIDTHS.contains(&bit_width), error::InvalidBitWidthSnafu { bit_width, kind: "float" });
        Ok(Self::Float { bit_width })
    }

    /// Smallest integer dtype holding every value of `[min, max]`.
    ///
    /// The result is unsigned whenever `min >= 0`.
    pub fn holding(min: i128, max: i128) -> Result<Self> {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        let is_signed = min < 0;
        let bit_width = bits_to_represent(min, is_signed).max(bits_to_represent(max, is_signed));

        snafu::ensure!(bit_width <= MAX_INTEGER_BITS, error::RangeTooWideSnafu { min, max });
        Ok(Self::Integer { bit_width, is_signed })
    }

    /// Check that the bit width fits the dtype family.
    ///
    /// The `const` constructors accept any width; dtypes coming from callers
    /// go through this before their range is computed.
    pub fn validate(self) -> Result<Self> {
        match self {
            Self::Integer { bit_width, is_signed } => Self::integer(bit_width, is_signed),
            Self::Float { bit_width } => Self::float(bit_width),
        }
    }

    /// Dtype of an integer literal: the smallest integer holding `value`.
    pub fn for_constant_int(value: i64) -> Self {
        let value = value as i128;
        let is_signed = value < 0;
        Self::Integer { bit_width: bits_to_represent(value, is_signed), is_signed }
    }

    // =========================================================================
    // Properties
    // =========================================================================

    pub const fn bit_width(&self) -> u32 {
        match self {
            Self::Integer { bit_width, .. } | Self::Float { bit_width } => *bit_width,
        }
    }

    pub const fn is_integer(&self) -> bool {
        matches!(self, Self::Integer { .. })
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float { .. })
    }

    pub const fn is_signed(&self) -> bool {
        match self {
            Self::Integer { is_signed, .. } => *is_signed,
            Self::Float { .. } => true,
        }
    }

    pub const fn is_unsigned_integer(&self) -> bool {
        matches!(self, Self::Integer { is_signed: false, .. })
    }

    /// Inclusive value range of an integer dtype, `None` for floats.
    pub fn range(&self) -> Option<(i128, i128)> {
        match *self {
            Self::Integer { bit_width, is_signed } => Some(integer_range(bit_width, is_signed)),
            Self::Float { .. } => None,
        }
    }

    /// Check whether `value` fits this dtype. Floats accept everything.
    pub fn can_represent(&self, value: i128) -> bool {
        self.range().is_none_or(|(min, max)| (min..=max).contains(&value))
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer { bit_width, is_signed: true } => write!(f, "int{bit_width}"),
            Self::Integer { bit_width, is_signed: false } => write!(f, "uint{bit_width}"),
            Self::Float { bit_width } => write!(f, "float{bit_width}"),
        }
    }
}

/// Inclusive range of an integer of `bit_width` bits.
pub const fn integer_range(bit_width: u32, is_signed: bool) -> (i128, i128) {
    if is_signed {
        let half = 1i128 << (bit_width - 1);
        (-half, half - 1)
    } else {
        (0, (1i128 << bit_width) - 1)
    }
}

/// Number of bits needed for `value`, counting a sign bit when `is_signed`.
///
/// Never returns less than one bit.
pub fn bits_to_represent(value: i128, is_signed: bool) -> u32 {
    // Negative values need as many magnitude bits as `-value - 1`.
    let magnitude = if value >= 0 { value as u128 } else { (-(value + 1)) as u128 };
    let bits = u128::BITS - magnitude.leading_zeros() + u32::from(is_signed);
    bits.max(1)
}
