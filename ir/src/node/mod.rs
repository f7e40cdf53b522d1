//! IR node taxonomy.
//!
//! [`NodeKind`] is closed: graph consumers match on it exhaustively. Every
//! node is validated when it is built and derives its output value from its
//! input values, so an invalid node never enters a trace log.

mod eval;
pub mod function;

use smallvec::{SmallVec, smallvec};
use snafu::{ResultExt, ensure};

pub use function::{Attribute, ElementFn, FunctionKind, GenericFunction, OpArgs, element_fn};

use crate::{
    Data, Result, Value,
    error::*,
    indexing::{self, IndexElem, IndexPlan},
    mix_values,
    shape::Shape,
};

/// Operation performed by a node.
#[derive(Debug, Clone, strum::IntoStaticStr)]
pub enum NodeKind {
    /// Function parameter, tagged with its declared position.
    Input { name: String, position: usize },
    /// Literal data known at trace time.
    Constant { data: Data },
    Add,
    Sub,
    Mul,
    /// Inner product of two 1-D tensors.
    Dot,
    /// Product of two 2-D tensors.
    MatMul,
    /// Constant index expression over a tensor.
    IndexConstant { index: Vec<IndexElem> },
    GenericFunction(GenericFunction),
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Declared input arity.
    pub fn n_in(&self) -> usize {
        match self {
            Self::Constant { .. } => 0,
            Self::Input { .. } | Self::IndexConstant { .. } | Self::GenericFunction(_) => 1,
            Self::Add | Self::Sub | Self::Mul | Self::Dot | Self::MatMul => 2,
        }
    }
}

/// One IR instruction with the values it consumes and produces.
#[derive(Debug, Clone)]
pub struct IntermediateNode {
    inputs: SmallVec<[Value; 2]>,
    outputs: SmallVec<[Value; 1]>,
    kind: NodeKind,
}

impl IntermediateNode {
    /// Validate `inputs` against `kind` and derive the output value.
    pub fn new(kind: NodeKind, inputs: Vec<Value>) -> Result<Self> {
        let expected = kind.n_in();
        ensure!(inputs.len() == expected, AritySnafu { node: kind.name(), expected, actual: inputs.len() });
        for input in &inputs {
            input.dtype.validate().context(InvalidDTypeSnafu)?;
        }

        let output = match &kind {
            NodeKind::Input { .. } => inputs[0].clone(),
            NodeKind::Constant { data } => data.value()?,
            NodeKind::Add | NodeKind::Sub | NodeKind::Mul => mix_values(&inputs[0], &inputs[1])?,
            NodeKind::Dot => dot_output(&inputs[0], &inputs[1])?,
            NodeKind::MatMul => matmul_output(&inputs[0], &inputs[1])?,
            NodeKind::IndexConstant { index } => index_output(&inputs[0], index)?,
            NodeKind::GenericFunction(function) => function.output().clone(),
        };

        Ok(Self { inputs: inputs.into(), outputs: smallvec![output], kind })
    }

    /// Parameter node: consumes and produces the declared value.
    pub fn input(name: impl Into<String>, position: usize, value: Value) -> Self {
        Self {
            inputs: smallvec![value.clone()],
            outputs: smallvec![value],
            kind: NodeKind::Input { name: name.into(), position },
        }
    }

    pub fn constant(data: Data) -> Result<Self> {
        Self::new(NodeKind::Constant { data }, Vec::new())
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn inputs(&self) -> &[Value] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Value] {
        &self.outputs
    }

    /// The single output value.
    pub fn output(&self) -> &Value {
        &self.outputs[0]
    }

    pub fn n_in(&self) -> usize {
        self.kind.n_in()
    }

    /// Number of graph edges feeding this node.
    ///
    /// Inputs consume a value from outside the graph and have no edges.
    pub fn n_edges(&self) -> usize {
        match self.kind {
            NodeKind::Input { .. } => 0,
            _ => self.n_in(),
        }
    }

    pub fn as_function(&self) -> Option<&GenericFunction> {
        match &self.kind {
            NodeKind::GenericFunction(function) => Some(function),
            _ => None,
        }
    }

    /// Short human readable label.
    pub fn label(&self) -> String {
        match &self.kind {
            NodeKind::Input { name, .. } => name.clone(),
            NodeKind::Constant { data } => data.to_string(),
            NodeKind::Add => "+".to_string(),
            NodeKind::Sub => "-".to_string(),
            NodeKind::Mul => "*".to_string(),
            NodeKind::Dot => "dot".to_string(),
            NodeKind::MatMul => "@".to_string(),
            NodeKind::IndexConstant { index } => format!("value[{}]", indexing::display(index)),
            NodeKind::GenericFunction(function) => function.name().to_string(),
        }
    }

    /// Check whether a lookup table can be synthesized for this node.
    ///
    /// Only elementwise functions over an encrypted unsigned integer qualify.
    pub fn is_table_eligible(&self) -> bool {
        let tlu = self.as_function().is_some_and(|function| function.kind() == FunctionKind::Tlu);
        tlu && self.inputs.first().is_some_and(|input| input.is_encrypted && input.dtype.is_unsigned_integer())
    }
}

fn dot_output(lhs: &Value, rhs: &Value) -> Result<Value> {
    for operand in [lhs, rhs] {
        ensure!(operand.ndim() == 1, RankMismatchSnafu { node: "Dot", expected: "1-D tensor", shape: operand.shape.clone() });
    }
    ensure!(lhs.shape == rhs.shape, ContractionMismatchSnafu { node: "Dot", lhs: lhs.shape.clone(), rhs: rhs.shape.clone() });

    let mixed = mix_values(lhs, rhs)?;
    Ok(Value::new(mixed.dtype, Shape::new(), mixed.is_encrypted))
}

fn matmul_output(lhs: &Value, rhs: &Value) -> Result<Value> {
    for operand in [lhs, rhs] {
        ensure!(
            operand.ndim() == 2,
            RankMismatchSnafu { node: "MatMul", expected: "2-D tensor", shape: operand.shape.clone() }
        );
    }
    ensure!(
        lhs.shape[1] == rhs.shape[0],
        ContractionMismatchSnafu { node: "MatMul", lhs: lhs.shape.clone(), rhs: rhs.shape.clone() }
    );

    let dtype = lhs.dtype.mix(rhs.dtype).context(DTypeMixSnafu)?;
    Ok(Value::new(dtype, Shape::from_slice(&[lhs.shape[0], rhs.shape[1]]), lhs.is_encrypted || rhs.is_encrypted))
}

fn index_output(input: &Value, index: &[IndexElem]) -> Result<Value> {
    ensure!(
        input.is_tensor(),
        RankMismatchSnafu { node: "IndexConstant", expected: "tensor", shape: input.shape.clone() }
    );
    let plan = IndexPlan::resolve(&input.shape, index)?;
    Ok(input.with_shape(plan.shape().clone()))
}
