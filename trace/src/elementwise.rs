//! Elementwise functions lowered to table lookups.

use std::collections::BTreeMap;

use snafu::{OptionExt, ResultExt};
use veil_dtype::DType;
use veil_ir::{
    FunctionKind, GenericFunction, IntermediateNode, NodeKind, Value,
    error::{DTypeMixSnafu, EvaluationSnafu},
    node::{
        Attribute, element_fn,
        function::{BAKED_CONSTANT, BAKED_CONSTANT_POSITION, FUSABLE},
    },
    shape,
};

use crate::{
    Operand, Result, Tracer,
    error::*,
    registry::{BinaryKernel, BinaryRule, Routine, UnaryKernel, UnaryRule},
};

impl Tracer {
    /// Apply the unary operation registered as `name`.
    pub fn apply(&self, name: &str) -> Result<Tracer> {
        match self.session.registry().lookup(name)? {
            Routine::Unary(routine) => routine(self),
            routine => RoutineAritySnafu { operation: name, arity: routine.arity() }.fail(),
        }
    }

    /// Apply the binary operation registered as `name`, `self` on the left.
    pub fn apply_binary(&self, name: &str, rhs: impl Into<Operand>) -> Result<Tracer> {
        self.binary(name, &Operand::from(self), &rhs.into())
    }

    /// Apply the binary operation registered as `name`, `self` on the right.
    pub fn apply_binary_flipped(&self, name: &str, lhs: impl Into<Operand>) -> Result<Tracer> {
        self.binary(name, &lhs.into(), &Operand::from(self))
    }

    fn binary(&self, name: &str, lhs: &Operand, rhs: &Operand) -> Result<Tracer> {
        match self.session.registry().lookup(name)? {
            Routine::Binary(routine) => routine(lhs, rhs),
            routine => RoutineAritySnafu { operation: name, arity: routine.arity() }.fail(),
        }
    }

    /// Convert elements to `dtype` through a table lookup.
    ///
    /// Fusable when every input value survives the conversion unchanged.
    pub fn astype(&self, dtype: DType) -> Result<Tracer> {
        let dtype = dtype.validate().context(DTypeMixSnafu).context(IrSnafu { operation: "astype" })?;
        let name = format!("astype({dtype})");
        let fusable = self.output.dtype.can_safe_cast(dtype);
        let function = GenericFunction::builder()
            .name(name.as_str())
            .kind(FunctionKind::Tlu)
            .func(element_fn(move |input, _| input.astype(dtype)))
            .output(self.output.with_dtype(dtype))
            .attributes(BTreeMap::from([(FUSABLE.to_string(), Attribute::from(fusable))]))
            .build();
        self.record_function(&name, function)
    }

    pub(crate) fn unary_tlu(&self, operation: &str, rule: UnaryRule, kernel: UnaryKernel) -> Result<Tracer> {
        let dtype = rule.output_dtype(self.output.dtype).context(DTypeMixSnafu).context(IrSnafu { operation })?;
        let function = GenericFunction::builder()
            .name(operation)
            .kind(FunctionKind::Tlu)
            .func(element_fn(move |input, _| kernel(input)))
            .output(self.output.with_dtype(dtype))
            .build();
        self.record_function(operation, function)
    }

    /// Record a binary operation with its constant operand folded into the function.
    ///
    /// The rhs is baked when it is constant, otherwise the lhs. The traced
    /// operand becomes the single input of the node.
    pub(crate) fn baked_tlu(
        operation: &str,
        rule: BinaryRule,
        kernel: BinaryKernel,
        lhs: &Operand,
        rhs: &Operand,
    ) -> Result<Tracer> {
        let (variable, constant, position) = match (lhs.as_tracer(), rhs.constant_data()) {
            (Some(variable), Some(constant)) => (variable, constant, 1),
            _ => match (rhs.as_tracer(), lhs.constant_data()) {
                (Some(variable), Some(constant)) => (variable, constant, 0),
                _ => return NoConstantOperandSnafu { operation }.fail(),
            },
        };

        let constant_value = constant.value().context(IrSnafu { operation })?;
        let dtype = rule
            .output_dtype(variable.output.dtype, constant_value.dtype)
            .context(DTypeMixSnafu)
            .context(IrSnafu { operation })?;
        let shape = shape::broadcast(&variable.output.shape, &constant_value.shape).context(IrSnafu { operation })?;
        let output = Value::new(dtype, shape, variable.output.is_encrypted);

        let node_name = operation.to_string();
        let func = element_fn(move |input, args| {
            let constant = args.keyword.get(BAKED_CONSTANT).with_context(|| EvaluationSnafu {
                node: node_name.clone(),
                reason: "baked constant missing from keyword arguments",
            })?;
            if position == 0 { kernel(constant, input) } else { kernel(input, constant) }
        });

        let function = GenericFunction::builder()
            .name(operation)
            .kind(FunctionKind::Tlu)
            .func(func)
            .output(output)
            .kwargs(BTreeMap::from([(BAKED_CONSTANT.to_string(), constant.clone())]))
            .attributes(BTreeMap::from([
                (BAKED_CONSTANT.to_string(), Attribute::from(constant)),
                (BAKED_CONSTANT_POSITION.to_string(), Attribute::from(position as i64)),
            ]))
            .build();
        variable.record_function(operation, function)
    }

    /// Record `function` applied to this tracer.
    pub(crate) fn record_function(&self, operation: &str, function: GenericFunction) -> Result<Tracer> {
        let node = IntermediateNode::new(NodeKind::GenericFunction(function), vec![self.output.clone()])
            .context(IrSnafu { operation })?;
        self.session.record(operation, node, &[self])
    }
}

