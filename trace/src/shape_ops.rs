//! Layout operations and constant indexing.

use std::collections::BTreeMap;
use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use snafu::ResultExt;
use veil_ir::{
    Data, FunctionKind, GenericFunction, IndexElem, IntermediateNode, NodeKind,
    node::{Attribute, element_fn, function::FUSABLE},
    shape::{self, Shape},
};

use crate::{Result, Tracer, error::*};

/// One component of an index expression on a tracer.
#[derive(Debug, Clone)]
pub enum IndexArg {
    Elem(IndexElem),
    /// Traced component, rejected at trace time.
    Traced(Tracer),
}

macro_rules! impl_index_arg_from {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for IndexArg {
                fn from(elem: $source) -> Self {
                    Self::Elem(elem.into())
                }
            }
        )*
    };
}

impl_index_arg_from!(
    IndexElem,
    i32,
    isize,
    RangeFull,
    Range<i32>,
    RangeFrom<i32>,
    RangeTo<i32>,
    Range<isize>,
    RangeFrom<isize>,
    RangeTo<isize>,
);

impl From<Tracer> for IndexArg {
    fn from(tracer: Tracer) -> Self {
        Self::Traced(tracer)
    }
}

impl From<&Tracer> for IndexArg {
    fn from(tracer: &Tracer) -> Self {
        Self::Traced(tracer.clone())
    }
}

/// Index arguments for [`Tracer::index`].
///
/// ```rust,ignore
/// let row = x.index(&index![1, ..])?;
/// ```
#[macro_export]
macro_rules! index {
    ($($arg:expr),* $(,)?) => {
        vec![$($crate::IndexArg::from($arg)),*]
    };
}

impl Tracer {
    /// Record an `IndexConstant` node. Every component must be a constant.
    pub fn index(&self, args: &[IndexArg]) -> Result<Tracer> {
        let index = args
            .iter()
            .enumerate()
            .map(|(position, arg)| match arg {
                IndexArg::Elem(elem) => Ok(*elem),
                IndexArg::Traced(_) => DynamicIndexSnafu { position }.fail(),
            })
            .collect::<Result<Vec<_>>>()?;

        let node = IntermediateNode::new(NodeKind::IndexConstant { index }, vec![self.output.clone()])
            .context(IrSnafu { operation: "index" })?;
        self.session.record("index", node, &[self])
    }

    /// Reshape to `target`; fusable when the shape does not change.
    pub fn reshape(&self, target: &[usize]) -> Result<Tracer> {
        shape::validate_reshape(&self.output.shape, target).context(IrSnafu { operation: "reshape" })?;

        let target = Shape::from_slice(target);
        let fusable = target == self.output.shape;
        self.memory("reshape", target.clone(), fusable, move |input| input.reshape(&target))
    }

    /// Flatten to rank 1; fusable for tensors that already are.
    pub fn ravel(&self) -> Result<Tracer> {
        let fusable = self.output.ndim() == 1;
        self.memory("ravel", shape::ravel(&self.output.shape), fusable, |input| input.ravel())
    }

    /// Reverse the axis order; fusable for scalars and rank 1 tensors.
    pub fn transpose(&self) -> Result<Tracer> {
        let fusable = self.output.ndim() <= 1;
        self.memory("transpose", shape::transpose(&self.output.shape), fusable, |input| Ok(input.transpose()))
    }

    fn memory(
        &self,
        operation: &str,
        shape: Shape,
        fusable: bool,
        f: impl Fn(&Data) -> veil_ir::Result<Data> + Send + Sync + 'static,
    ) -> Result<Tracer> {
        let function = GenericFunction::builder()
            .name(operation)
            .kind(FunctionKind::Memory)
            .func(element_fn(move |input, _| f(input)))
            .output(self.output.with_shape(shape))
            .attributes(BTreeMap::from([(FUSABLE.to_string(), Attribute::from(fusable))]))
            .build();
        self.record_function(operation, function)
    }
}
