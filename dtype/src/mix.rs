use super::*;

impl DType {
    /// Find the dtype holding every value of both `self` and `other`.
    ///
    /// Mixing rules:
    /// - Integer + Integer → smallest integer holding the union of both ranges,
    ///   so the result is never narrower than either operand
    /// - Float + Float → the wider float
    /// - Float + Integer → `float64`
    ///
    /// The operation is commutative. Invalid bit widths are rejected.
    pub fn mix(self, other: Self) -> Result<Self> {
        match (self.validate()?, other.validate()?) {
            (Self::Float { bit_width: lhs }, Self::Float { bit_width: rhs }) => {
                Ok(Self::Float { bit_width: lhs.max(rhs) })
            }
            (Self::Float { .. }, Self::Integer { .. }) | (Self::Integer { .. }, Self::Float { .. }) => {
                Ok(Self::float64())
            }
            (
                Self::Integer { bit_width: lhs_bits, is_signed: lhs_signed },
                Self::Integer { bit_width: rhs_bits, is_signed: rhs_signed },
            ) => {
                let (lhs_min, lhs_max) = integer_range(lhs_bits, lhs_signed);
                let (rhs_min, rhs_max) = integer_range(rhs_bits, rhs_signed);
                Self::holding(lhs_min.min(rhs_min), lhs_max.max(rhs_max))
                    .map_err(|_| Error::DTypeMix { lhs: self, rhs: other })
            }
        }
    }

    /// Check if every value of `self` is representable in `to`.
    pub fn can_safe_cast(self, to: Self) -> bool {
        match (self.range(), to.range()) {
            (Some((min, max)), Some(_)) => to.can_represent(min) && to.can_represent(max),
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => self.bit_width() <= to.bit_width(),
        }
    }
}
