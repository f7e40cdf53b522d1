//! Leveled arithmetic: add, sub, mul, dot and matmul.
//!
//! These operations take two traced operands. A constant operand is first
//! recorded as a `Constant` node so both inputs are graph edges.

use ndarray::ArrayD;
use snafu::ResultExt;
use veil_ir::{Data, IntermediateNode, NodeKind};

use crate::{Result, Tracer, error::*};

/// Second operand of a tracer operation.
#[derive(Debug, Clone)]
pub enum Operand {
    Traced(Tracer),
    Constant(Data),
}

impl Operand {
    /// Constant data of this operand, whether literal or a traced `Constant` node.
    pub fn constant_data(&self) -> Option<Data> {
        match self {
            Self::Traced(tracer) => tracer.constant_data(),
            Self::Constant(data) => Some(data.clone()),
        }
    }

    pub fn as_tracer(&self) -> Option<&Tracer> {
        match self {
            Self::Traced(tracer) => Some(tracer),
            Self::Constant(_) => None,
        }
    }
}

impl From<Tracer> for Operand {
    fn from(tracer: Tracer) -> Self {
        Self::Traced(tracer)
    }
}

impl From<&Tracer> for Operand {
    fn from(tracer: &Tracer) -> Self {
        Self::Traced(tracer.clone())
    }
}

impl From<Data> for Operand {
    fn from(data: Data) -> Self {
        Self::Constant(data)
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Self::Constant(Data::int(value))
    }
}

impl From<i32> for Operand {
    fn from(value: i32) -> Self {
        Self::Constant(Data::int(value.into()))
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Self::Constant(Data::float(value))
    }
}

impl From<ArrayD<i64>> for Operand {
    fn from(array: ArrayD<i64>) -> Self {
        Self::Constant(Data::Int(array))
    }
}

impl From<ArrayD<f64>> for Operand {
    fn from(array: ArrayD<f64>) -> Self {
        Self::Constant(Data::Float(array))
    }
}

macro_rules! impl_leveled_ops {
    ($($method:ident => $kind:ident, $label:literal);* $(;)?) => {
        $(
            #[doc = concat!("Record `", $label, "` with `rhs` as the second input.")]
            #[track_caller]
            pub fn $method(&self, rhs: impl Into<Operand>) -> Result<Tracer> {
                self.leveled(NodeKind::$kind, $label, rhs.into())
            }
        )*
    };
}

impl Tracer {
    impl_leveled_ops! {
        try_add => Add, "add";
        try_sub => Sub, "sub";
        try_mul => Mul, "mul";
        try_dot => Dot, "dot";
        try_matmul => MatMul, "matmul";
    }

    /// Turn `operand` into a tracer of this trace.
    pub fn materialize(&self, operand: Operand) -> Result<Tracer> {
        match operand {
            Operand::Traced(tracer) => Ok(tracer),
            Operand::Constant(data) => self.constant(data),
        }
    }

    fn leveled(&self, kind: NodeKind, operation: &str, rhs: Operand) -> Result<Tracer> {
        let rhs = self.materialize(rhs)?;
        self.leveled_with(kind, operation, &rhs)
    }

    /// Record a two-input node with `self` in slot 0.
    pub(crate) fn leveled_with(&self, kind: NodeKind, operation: &str, rhs: &Tracer) -> Result<Tracer> {
        let inputs = vec![self.output.clone(), rhs.output.clone()];
        let node = IntermediateNode::new(kind, inputs).context(IrSnafu { operation })?;
        self.session.record(operation, node, &[self, rhs])
    }
}
