//! Symbolic tracing of numeric functions.
//!
//! A function is executed once against [`Tracer`]s standing in for its
//! parameters. Every operation on a tracer validates and records one IR node
//! in the session's [`TraceLog`]; the returned tracers then select which part
//! of the log is frozen into an [`OperatorGraph`].
//!
//! # Examples
//!
//! ```
//! # use std::collections::HashMap;
//! # use veil_dtype::DType;
//! # use veil_ir::{Data, Value};
//! use veil_trace::trace;
//!
//! let graph = trace(|args| Ok((&args[0] + 3) * 2), &[("x", Value::encrypted_scalar(DType::unsigned(3)))]).unwrap();
//! let result = graph.evaluate(&HashMap::from([(0, Data::int(4))])).unwrap();
//! assert_eq!(result, vec![Data::int(14)]);
//! ```

use std::{cell::RefCell, collections::HashSet, rc::Rc};

use snafu::{ResultExt, ensure};
use veil_ir::{Data, EntryId, IntermediateNode, NodeKind, OperatorGraph, TraceLog, Value};

pub mod error;
use error::*;

pub mod arithmetic;
pub mod elementwise;
pub mod registry;
pub mod shape_ops;
pub mod traits;

pub use arithmetic::Operand;
pub use error::{Error, Result};
pub use registry::{BinaryRule, OperationRegistry, Routine, UnaryRule};
pub use shape_ops::IndexArg;


struct SessionState {
    log: TraceLog,
    registry: Rc<OperationRegistry>,
}

/// Shared state of one trace. Tracing is single threaded.
#[derive(Clone)]
pub(crate) struct Session(Rc<RefCell<SessionState>>);

impl Session {
    fn new(registry: Rc<OperationRegistry>) -> Self {
        Self(Rc::new(RefCell::new(SessionState { log: TraceLog::new(), registry })))
    }

    fn same(&self, other: &Session) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn registry(&self) -> Rc<OperationRegistry> {
        self.0.borrow().registry.clone()
    }

    /// Append `node` fed by `operands` and return the tracer of its output.
    pub(crate) fn record(&self, operation: &str, node: IntermediateNode, operands: &[&Tracer]) -> Result<Tracer> {
        for operand in operands {
            ensure!(self.same(&operand.session), SessionMismatchSnafu { operation });
        }

        let output = node.output().clone();
        let entries: Vec<EntryId> = operands.iter().map(|operand| operand.entry).collect();
        let entry = self.0.borrow_mut().log.record(node, &entries).context(IrSnafu { operation })?;
        Ok(Tracer { session: self.clone(), entry, output })
    }

    fn node_kind<R>(&self, entry: EntryId, f: impl FnOnce(Option<&NodeKind>) -> R) -> R {
        let state = self.0.borrow();
        f(state.log.get(entry).map(|logged| logged.node.kind()))
    }

    fn take_log(&self) -> TraceLog {
        std::mem::take(&mut self.0.borrow_mut().log)
    }
}

/// Proxy for one graph edge during tracing.
///
/// Cloning a tracer is cheap and refers to the same edge.
#[derive(Clone, derive_more::Debug)]
pub struct Tracer {
    #[debug(skip)]
    session: Session,
    entry: EntryId,
    output: Value,
}

impl Tracer {
    /// Value flowing out of the traced node.
    pub fn output(&self) -> &Value {
        &self.output
    }

    pub fn entry(&self) -> EntryId {
        self.entry
    }

    /// Check whether this tracer is produced by a `Constant` node.
    pub fn is_constant(&self) -> bool {
        self.constant_data().is_some()
    }

    /// Data of the `Constant` node producing this tracer.
    pub fn constant_data(&self) -> Option<Data> {
        self.session.node_kind(self.entry, |kind| match kind {
            Some(NodeKind::Constant { data }) => Some(data.clone()),
            _ => None,
        })
    }

    /// Record a constant in this tracer's trace.
    pub fn constant(&self, data: impl Into<Data>) -> Result<Tracer> {
        let node = IntermediateNode::constant(data.into()).context(IrSnafu { operation: "constant" })?;
        self.session.record("constant", node, &[])
    }
}

/// Values a traced function may return.
pub trait TraceOutputs {
    fn into_tracers(self) -> Vec<Tracer>;
}

impl TraceOutputs for Tracer {
    fn into_tracers(self) -> Vec<Tracer> {
        vec![self]
    }
}

impl TraceOutputs for Vec<Tracer> {
    fn into_tracers(self) -> Vec<Tracer> {
        self
    }
}

impl<const N: usize> TraceOutputs for [Tracer; N] {
    fn into_tracers(self) -> Vec<Tracer> {
        self.into()
    }
}

impl TraceOutputs for (Tracer, Tracer) {
    fn into_tracers(self) -> Vec<Tracer> {
        vec![self.0, self.1]
    }
}

/// Trace `f` with the default operation registry.
///
/// `parameters` declares, in order, the name and value of every argument.
pub fn trace<F, O>(f: F, parameters: &[(&str, Value)]) -> Result<OperatorGraph>
where
    F: FnOnce(&[Tracer]) -> Result<O>,
    O: TraceOutputs,
{
    trace_with(&OperationRegistry::default(), f, parameters)
}

/// Trace `f`, dispatching named elementwise operations through `registry`.
#[tracing::instrument(skip_all, fields(parameters = parameters.len()))]
pub fn trace_with<F, O>(registry: &OperationRegistry, f: F, parameters: &[(&str, Value)]) -> Result<OperatorGraph>
where
    F: FnOnce(&[Tracer]) -> Result<O>,
    O: TraceOutputs,
{
    let mut names = HashSet::new();
    for (name, value) in parameters {
        ensure!(names.insert(*name), DuplicateParameterSnafu { name: *name });
        value.dtype.validate().context(InvalidParameterSnafu { name: *name })?;
    }

    let session = Session::new(Rc::new(registry.clone()));
    let inputs = parameters
        .iter()
        .enumerate()
        .map(|(position, (name, value))| {
            session.record("input", IntermediateNode::input(*name, position, value.clone()), &[])
        })
        .collect::<Result<Vec<_>>>()?;

    let outputs = f(&inputs)?.into_tracers();
    for output in &outputs {
        ensure!(session.same(&output.session), SessionMismatchSnafu { operation: "return" });
    }

    let log = session.take_log();
    let recorded = log.len();
    let entries: Vec<EntryId> = outputs.iter().map(Tracer::entry).collect();
    let graph = OperatorGraph::freeze(log, &entries).context(IrSnafu { operation: "freeze" })?;

    tracing::debug!(recorded, nodes = graph.len(), "traced function");
    Ok(graph)
}
