use snafu::ensure;

use super::{IntermediateNode, NodeKind};
use crate::{Data, Result, error::*};

impl IntermediateNode {
    /// Evaluate the node on concrete data, one datum per input slot.
    ///
    /// An `Input` node receives the datum bound to its parameter.
    pub fn evaluate(&self, inputs: &[Data]) -> Result<Data> {
        let expected = self.n_in();
        ensure!(inputs.len() == expected, AritySnafu { node: self.kind.name(), expected, actual: inputs.len() });

        match &self.kind {
            NodeKind::Input { name, .. } => {
                let declared = &self.inputs[0].shape;
                ensure!(
                    inputs[0].shape() == *declared,
                    EvaluationSnafu {
                        node: name.clone(),
                        reason: format!("expected shape {declared:?}, got {:?}", inputs[0].shape()),
                    }
                );
                Ok(inputs[0].clone())
            }
            NodeKind::Constant { data } => Ok(data.clone()),
            NodeKind::Add => inputs[0].add(&inputs[1]),
            NodeKind::Sub => inputs[0].sub(&inputs[1]),
            NodeKind::Mul => inputs[0].mul(&inputs[1]),
            NodeKind::Dot => inputs[0].dot(&inputs[1]),
            NodeKind::MatMul => inputs[0].matmul(&inputs[1]),
            NodeKind::IndexConstant { index } => inputs[0].index(index),
            NodeKind::GenericFunction(function) => function.call(&inputs[0]),
        }
    }
}
