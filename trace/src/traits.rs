use crate::{Operand, Tracer};

/// Implement an operator trait for every ownership combination of two tracers.
///
/// `&Tracer op &Tracer` calls the `try_*` method; the other three forward to it.
macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $try_method:ident, $error_msg:expr) => {
        impl std::ops::$trait for &Tracer {
            type Output = Tracer;

            #[track_caller]
            fn $method(self, other: &Tracer) -> Tracer {
                self.$try_method(other).expect($error_msg)
            }
        }

        impl std::ops::$trait for Tracer {
            type Output = Tracer;

            #[track_caller]
            fn $method(self, other: Tracer) -> Tracer {
                (&self).$method(&other)
            }
        }

        impl std::ops::$trait<Tracer> for &Tracer {
            type Output = Tracer;

            #[track_caller]
            fn $method(self, other: Tracer) -> Tracer {
                self.$method(&other)
            }
        }

        impl std::ops::$trait<&Tracer> for Tracer {
            type Output = Tracer;

            #[track_caller]
            fn $method(self, other: &Tracer) -> Tracer {
                (&self).$method(other)
            }
        }
    };
}

/// Implement an operator trait between tracers and a scalar literal type, on either side.
macro_rules! impl_scalar_op {
    ($trait:ident, $method:ident, $try_method:ident, $error_msg:expr, $($scalar:ty),+) => {
        $(
            impl std::ops::$trait<$scalar> for &Tracer {
                type Output = Tracer;

                #[track_caller]
                fn $method(self, other: $scalar) -> Tracer {
                    self.$try_method(other).expect($error_msg)
                }
            }

            impl std::ops::$trait<$scalar> for Tracer {
                type Output = Tracer;

                #[track_caller]
                fn $method(self, other: $scalar) -> Tracer {
                    (&self).$method(other)
                }
            }

            impl std::ops::$trait<&Tracer> for $scalar {
                type Output = Tracer;

                #[track_caller]
                fn $method(self, other: &Tracer) -> Tracer {
                    other.materialize(Operand::from(self)).and_then(|lhs| lhs.$try_method(other)).expect($error_msg)
                }
            }

            impl std::ops::$trait<Tracer> for $scalar {
                type Output = Tracer;

                #[track_caller]
                fn $method(self, other: Tracer) -> Tracer {
                    self.$method(&other)
                }
            }
        )+
    };
}

impl_binary_op!(Add, add, try_add, "Addition failed");
impl_binary_op!(Sub, sub, try_sub, "Subtraction failed");
impl_binary_op!(Mul, mul, try_mul, "Multiplication failed");

impl_scalar_op!(Add, add, try_add, "Addition failed", i32, i64, f64);
impl_scalar_op!(Sub, sub, try_sub, "Subtraction failed", i32, i64, f64);
impl_scalar_op!(Mul, mul, try_mul, "Multiplication failed", i32, i64, f64);

impl std::ops::Neg for &Tracer {
    type Output = Tracer;

    #[track_caller]
    fn neg(self) -> Tracer {
        self.apply("negative").expect("Negation failed")
    }
}

impl std::ops::Neg for Tracer {
    type Output = Tracer;

    #[track_caller]
    fn neg(self) -> Tracer {
        (&self).neg()
    }
}
