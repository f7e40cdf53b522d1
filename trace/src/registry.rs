//! Named elementwise operations.
//!
//! The registry maps an operation name to the routine that records it. Unary
//! routines produce a table-lookup `GenericFunction`; binary routines bake
//! their constant operand into one. The set of node kinds stays closed while
//! the registry can be extended with [`OperationRegistry::register`].

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use snafu::OptionExt;
use veil_dtype::DType;
use veil_ir::{Data, error::EvaluationSnafu};

use crate::{Operand, Result, Tracer, error::*};

/// Element kernel of a unary operation.
pub type UnaryKernel = Arc<dyn Fn(&Data) -> veil_ir::Result<Data> + Send + Sync>;
/// Element kernel of a binary operation, operands in call order.
pub type BinaryKernel = Arc<dyn Fn(&Data, &Data) -> veil_ir::Result<Data> + Send + Sync>;

/// Node construction routine of a named operation.
#[derive(Clone)]
pub enum Routine {
    Unary(Rc<dyn Fn(&Tracer) -> Result<Tracer>>),
    Binary(Rc<dyn Fn(&Operand, &Operand) -> Result<Tracer>>),
}

impl Routine {
    pub fn arity(&self) -> usize {
        match self {
            Self::Unary(_) => 1,
            Self::Binary(_) => 2,
        }
    }
}

/// Output dtype of a unary operation, from its input dtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryRule {
    Preserve,
    Float,
    /// 0 or 1.
    Boolean,
    Negated,
    Absolute,
    Squared,
    Sign,
}

impl UnaryRule {
    /// Output dtype for `input`.
    ///
    /// Range based rules map the input range through the operation; float
    /// inputs stay `float64`.
    pub fn output_dtype(self, input: DType) -> veil_dtype::Result<DType> {
        let Some((min, max)) = input.range() else {
            return Ok(match self {
                Self::Boolean => DType::unsigned(1),
                Self::Preserve => input,
                _ => DType::float64(),
            });
        };

        match self {
            Self::Preserve => Ok(input),
            Self::Float => Ok(DType::float64()),
            Self::Boolean => Ok(DType::unsigned(1)),
            Self::Negated => DType::holding(-max, -min),
            Self::Absolute => DType::holding(0, min.abs().max(max.abs())),
            Self::Squared => {
                let low = if min <= 0 && max >= 0 { 0 } else { (min * min).min(max * max) };
                DType::holding(low, (min * min).max(max * max))
            }
            Self::Sign => DType::holding(if min < 0 { -1 } else { 0 }, 1),
        }
    }
}

/// Output dtype of a binary operation with a baked constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryRule {
    /// Dtype holding both operands.
    Mix,
    /// Dtype of the traced operand.
    Variable,
    Float,
    Boolean,
}

impl BinaryRule {
    pub fn output_dtype(self, variable: DType, constant: DType) -> veil_dtype::Result<DType> {
        match self {
            Self::Mix => variable.mix(constant),
            Self::Variable => Ok(variable),
            Self::Float => Ok(DType::float64()),
            Self::Boolean => Ok(DType::unsigned(1)),
        }
    }
}

/// Table from operation name to node construction routine.
///
/// The default registry carries the numeric catalogue.
#[derive(Clone)]
pub struct OperationRegistry {
    routines: BTreeMap<String, Routine>,
}

impl std::fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.routines.keys()).finish()
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::numeric()
    }
}

impl OperationRegistry {
    /// Registry without any operation.
    pub fn empty() -> Self {
        Self { routines: BTreeMap::new() }
    }

    /// Registry with the numeric catalogue.
    pub fn numeric() -> Self {
        let mut registry = Self::empty();
        catalogue::install(&mut registry);
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, routine: Routine) {
        self.routines.insert(name.into(), routine);
    }

    /// Register an elementwise unary operation lowered to a table lookup.
    pub fn register_unary(
        &mut self,
        name: impl Into<String>,
        rule: UnaryRule,
        kernel: impl Fn(&Data) -> veil_ir::Result<Data> + Send + Sync + 'static,
    ) {
        let name = name.into();
        let kernel: UnaryKernel = Arc::new(kernel);
        let operation = name.clone();
        self.register(
            name,
            Routine::Unary(Rc::new(move |input: &Tracer| input.unary_tlu(&operation, rule, kernel.clone()))),
        );
    }

    /// Register a binary operation whose constant operand is baked into a table lookup.
    pub fn register_binary(
        &mut self,
        name: impl Into<String>,
        rule: BinaryRule,
        kernel: impl Fn(&Data, &Data) -> veil_ir::Result<Data> + Send + Sync + 'static,
    ) {
        let name = name.into();
        let kernel: BinaryKernel = Arc::new(kernel);
        let operation = name.clone();
        self.register(
            name,
            Routine::Binary(Rc::new(move |lhs: &Operand, rhs: &Operand| {
                Tracer::baked_tlu(&operation, rule, kernel.clone(), lhs, rhs)
            })),
        );
    }

    pub fn get(&self, name: &str) -> Option<&Routine> {
        self.routines.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.routines.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.routines.keys().map(String::as_str)
    }

    pub(crate) fn lookup(&self, name: &str) -> Result<Routine> {
        self.get(name).cloned().context(UnsupportedOperationSnafu { operation: name })
    }
}

mod catalogue {
    use std::cmp::Ordering;

    use super::*;

    fn integers_only(
        operation: &'static str,
        int: fn(i64, i64) -> Option<i64>,
    ) -> impl Fn(&Data, &Data) -> veil_ir::Result<Data> + Send + Sync + 'static {
        move |lhs, rhs| {
            snafu::ensure!(
                lhs.is_int() && rhs.is_int(),
                EvaluationSnafu { node: operation, reason: "operands must be integers" }
            );
            lhs.zip_with(rhs, operation, int, |_, _| f64::NAN)
        }
    }

    /// Binary function always computed in `f64`.
    fn floats(
        operation: &'static str,
        float: fn(f64, f64) -> f64,
    ) -> impl Fn(&Data, &Data) -> veil_ir::Result<Data> + Send + Sync + 'static {
        move |lhs, rhs| Data::Float(lhs.to_float()).zip_with(&Data::Float(rhs.to_float()), operation, |_, _| None, float)
    }

    /// Comparison producing 0 or 1. Unordered floats compare false.
    fn comparison(
        operation: &'static str,
        test: fn(Ordering) -> bool,
    ) -> impl Fn(&Data, &Data) -> veil_ir::Result<Data> + Send + Sync + 'static {
        move |lhs, rhs| {
            let flags = lhs.zip_with(
                rhs,
                operation,
                |a, b| Some(test(a.cmp(&b)) as i64),
                |a, b| a.partial_cmp(&b).is_some_and(test) as i64 as f64,
            )?;
            flags.astype(DType::unsigned(1))
        }
    }

    /// Truth-value connective producing 0 or 1. Any non-zero element is true.
    fn logical(
        operation: &'static str,
        test: fn(bool, bool) -> bool,
    ) -> impl Fn(&Data, &Data) -> veil_ir::Result<Data> + Send + Sync + 'static {
        move |lhs, rhs| {
            let flags = lhs.zip_with(
                rhs,
                operation,
                |a, b| Some(test(a != 0, b != 0) as i64),
                |a, b| test(a != 0.0, b != 0.0) as i64 as f64,
            )?;
            flags.astype(DType::unsigned(1))
        }
    }

    /// Elementwise predicate producing 0 or 1.
    fn predicate(x: &Data, int: fn(i64) -> bool, float: fn(f64) -> bool) -> veil_ir::Result<Data> {
        x.map(|v| int(v) as i64, |v| float(v) as i64 as f64).astype(DType::unsigned(1))
    }

    /// Python style remainder: the result takes the sign of the divisor.
    fn remainder(a: i64, b: i64) -> Option<i64> {
        let r = a.checked_rem(b)?;
        Some(if r != 0 && (r < 0) != (b < 0) { r + b } else { r })
    }

    fn floor_divide(a: i64, b: i64) -> Option<i64> {
        let q = a.checked_div(b)?;
        Some(if a % b != 0 && (a < 0) != (b < 0) { q - 1 } else { q })
    }

    fn power(a: i64, b: i64) -> Option<i64> {
        a.checked_pow(u32::try_from(b).ok()?)
    }

    fn gcd(a: i64, b: i64) -> Option<i64> {
        let (mut a, mut b) = (a.checked_abs()?, b.checked_abs()?);
        while b != 0 {
            (a, b) = (b, a % b);
        }
        Some(a)
    }

    fn lcm(a: i64, b: i64) -> Option<i64> {
        match gcd(a, b)? {
            0 => Some(0),
            divisor => (a / divisor).checked_mul(b)?.checked_abs(),
        }
    }

    /// Next representable float after `from` in the direction of `to`.
    fn next_after(from: f64, to: f64) -> f64 {
        if from.is_nan() || to.is_nan() {
            return f64::NAN;
        }
        if from == to {
            return to;
        }
        if from == 0.0 {
            return f64::from_bits(1).copysign(to);
        }
        let bits = from.to_bits();
        f64::from_bits(if (to > from) == (from > 0.0) { bits + 1 } else { bits - 1 })
    }

    /// Distance to the adjacent float of larger magnitude.
    fn spacing(x: f64) -> f64 {
        if x.is_infinite() {
            return f64::NAN;
        }
        next_after(x, f64::INFINITY.copysign(x)) - x
    }

    fn log_add_exp(a: f64, b: f64) -> f64 {
        if a == b {
            return a + std::f64::consts::LN_2;
        }
        a.max(b) + (-(a - b).abs()).exp().ln_1p()
    }

    fn log_add_exp2(a: f64, b: f64) -> f64 {
        if a == b {
            return a + 1.0;
        }
        a.max(b) + (-(a - b).abs()).exp2().ln_1p() / std::f64::consts::LN_2
    }

    fn heaviside(x: f64, at_zero: f64) -> f64 {
        match x.partial_cmp(&0.0) {
            Some(Ordering::Less) => 0.0,
            Some(Ordering::Equal) => at_zero,
            Some(Ordering::Greater) => 1.0,
            None => f64::NAN,
        }
    }

    /// Float maximum that propagates NaN, unlike `fmax`.
    fn nan_max(a: f64, b: f64) -> f64 {
        if a.is_nan() || b.is_nan() { f64::NAN } else { a.max(b) }
    }

    fn nan_min(a: f64, b: f64) -> f64 {
        if a.is_nan() || b.is_nan() { f64::NAN } else { a.min(b) }
    }

    pub(super) fn install(registry: &mut OperationRegistry) {
        use UnaryRule as U;

        registry.register_unary("absolute", U::Absolute, |x| Ok(x.map(i64::wrapping_abs, f64::abs)));
        registry.register_unary("negative", U::Negated, |x| Ok(x.map(i64::wrapping_neg, |v| -v)));
        registry.register_unary("positive", U::Preserve, |x| Ok(x.clone()));
        registry.register_unary("square", U::Squared, |x| x.mul(x));
        registry.register_unary("sign", U::Sign, |x| Ok(x.map(i64::signum, f64::signum)));

        let float_kernels: [(&str, fn(f64) -> f64); 31] = [
            ("sqrt", f64::sqrt),
            ("cbrt", f64::cbrt),
            ("exp", f64::exp),
            ("exp2", f64::exp2),
            ("expm1", f64::exp_m1),
            ("log", f64::ln),
            ("log2", f64::log2),
            ("log10", f64::log10),
            ("log1p", f64::ln_1p),
            ("sin", f64::sin),
            ("cos", f64::cos),
            ("tan", f64::tan),
            ("arcsin", f64::asin),
            ("arccos", f64::acos),
            ("arctan", f64::atan),
            ("sinh", f64::sinh),
            ("cosh", f64::cosh),
            ("tanh", f64::tanh),
            ("arcsinh", f64::asinh),
            ("arccosh", f64::acosh),
            ("arctanh", f64::atanh),
            ("degrees", f64::to_degrees),
            ("rad2deg", f64::to_degrees),
            ("radians", f64::to_radians),
            ("deg2rad", f64::to_radians),
            ("floor", f64::floor),
            ("ceil", f64::ceil),
            ("trunc", f64::trunc),
            ("rint", f64::round_ties_even),
            ("fabs", f64::abs),
            ("reciprocal", f64::recip),
        ];
        for (name, f) in float_kernels {
            registry.register_unary(name, U::Float, move |x| Ok(x.map_float(f)));
        }
        registry.register_unary("spacing", U::Float, |x| Ok(x.map_float(spacing)));

        registry.register_unary("logical_not", U::Boolean, |x| predicate(x, |v| v == 0, |v| v == 0.0));
        registry.register_unary("isfinite", U::Boolean, |x| predicate(x, |_| true, f64::is_finite));
        registry.register_unary("isinf", U::Boolean, |x| predicate(x, |_| false, f64::is_infinite));
        registry.register_unary("isnan", U::Boolean, |x| predicate(x, |_| false, f64::is_nan));
        registry.register_unary("signbit", U::Boolean, |x| predicate(x, |v| v < 0, f64::is_sign_negative));

        registry.register(
            "invert",
            Routine::Unary(Rc::new(|_: &Tracer| -> Result<Tracer> {
                ReplacedOperationSnafu { operation: "invert", replacement: "bitwise_xor with an all-ones mask" }.fail()
            })),
        );

        use BinaryRule as B;

        registry.register_binary("power", B::Mix, |lhs, rhs| lhs.zip_with(rhs, "power", power, f64::powf));
        registry.register_binary("float_power", B::Float, floats("float_power", f64::powf));
        registry.register_binary("remainder", B::Mix, |lhs, rhs| {
            lhs.zip_with(rhs, "remainder", remainder, |a, b| a - b * (a / b).floor())
        });
        registry.register_binary("fmod", B::Mix, |lhs, rhs| lhs.zip_with(rhs, "fmod", i64::checked_rem, |a, b| a % b));
        registry.register_binary("floor_divide", B::Mix, |lhs, rhs| {
            lhs.zip_with(rhs, "floor_divide", floor_divide, |a, b| (a / b).floor())
        });
        registry.register_binary("true_divide", B::Float, floats("true_divide", |a, b| a / b));
        registry.register_binary("maximum", B::Mix, |lhs, rhs| {
            lhs.zip_with(rhs, "maximum", |a, b| Some(a.max(b)), nan_max)
        });
        registry.register_binary("minimum", B::Mix, |lhs, rhs| {
            lhs.zip_with(rhs, "minimum", |a, b| Some(a.min(b)), nan_min)
        });
        registry.register_binary("fmax", B::Mix, |lhs, rhs| lhs.zip_with(rhs, "fmax", |a, b| Some(a.max(b)), f64::max));
        registry.register_binary("fmin", B::Mix, |lhs, rhs| lhs.zip_with(rhs, "fmin", |a, b| Some(a.min(b)), f64::min));
        registry.register_binary("gcd", B::Mix, integers_only("gcd", gcd));
        registry.register_binary("lcm", B::Mix, integers_only("lcm", lcm));
        registry.register_binary("arctan2", B::Float, floats("arctan2", f64::atan2));
        registry.register_binary("hypot", B::Float, floats("hypot", f64::hypot));
        registry.register_binary("copysign", B::Float, floats("copysign", f64::copysign));
        registry.register_binary("nextafter", B::Float, floats("nextafter", next_after));
        registry.register_binary("logaddexp", B::Float, floats("logaddexp", log_add_exp));
        registry.register_binary("logaddexp2", B::Float, floats("logaddexp2", log_add_exp2));
        registry.register_binary("heaviside", B::Float, floats("heaviside", heaviside));
        registry.register_binary("ldexp", B::Float, |lhs, rhs| {
            snafu::ensure!(rhs.is_int(), EvaluationSnafu { node: "ldexp", reason: "exponent must be an integer" });
            floats("ldexp", |mantissa, exponent| mantissa * exponent.exp2())(lhs, rhs)
        });
        registry.register_binary("bitwise_and", B::Mix, integers_only("bitwise_and", |a, b| Some(a & b)));
        registry.register_binary("bitwise_or", B::Mix, integers_only("bitwise_or", |a, b| Some(a | b)));
        registry.register_binary("bitwise_xor", B::Mix, integers_only("bitwise_xor", |a, b| Some(a ^ b)));
        registry.register_binary(
            "left_shift",
            B::Mix,
            integers_only("left_shift", |a, b| a.checked_shl(u32::try_from(b).ok()?)),
        );
        registry.register_binary(
            "right_shift",
            B::Variable,
            integers_only("right_shift", |a, b| a.checked_shr(u32::try_from(b).ok()?)),
        );
        registry.register_binary("logical_and", B::Boolean, logical("logical_and", |a, b| a && b));
        registry.register_binary("logical_or", B::Boolean, logical("logical_or", |a, b| a || b));
        registry.register_binary("logical_xor", B::Boolean, logical("logical_xor", |a, b| a != b));
        registry.register_binary("equal", B::Boolean, comparison("equal", Ordering::is_eq));
        registry.register_binary("not_equal", B::Boolean, comparison("not_equal", Ordering::is_ne));
        registry.register_binary("less", B::Boolean, comparison("less", Ordering::is_lt));
        registry.register_binary("less_equal", B::Boolean, comparison("less_equal", Ordering::is_le));
        registry.register_binary("greater", B::Boolean, comparison("greater", Ordering::is_gt));
        registry.register_binary("greater_equal", B::Boolean, comparison("greater_equal", Ordering::is_ge));
    }
}
