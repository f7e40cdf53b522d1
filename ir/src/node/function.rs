//! Payload of `GenericFunction` nodes.

use std::collections::BTreeMap;
use std::sync::Arc;

use bon::bon;

use crate::{Data, Result, Value};

/// Element function of a [`GenericFunction`]: input datum plus the node's extra arguments.
pub type ElementFn = Arc<dyn Fn(&Data, &OpArgs) -> Result<Data> + Send + Sync>;

/// Wrap a closure as an [`ElementFn`].
pub fn element_fn(f: impl Fn(&Data, &OpArgs) -> Result<Data> + Send + Sync + 'static) -> ElementFn {
    Arc::new(f)
}

/// Attribute key of the fusion eligibility hint.
pub const FUSABLE: &str = "fusable";
/// Attribute key of a constant folded into a binary operation.
pub const BAKED_CONSTANT: &str = "baked_constant";
/// Attribute key of the operand position the baked constant came from.
pub const BAKED_CONSTANT_POSITION: &str = "baked_constant_position";

/// Extra arguments passed to the element function on every call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpArgs {
    pub positional: Vec<Data>,
    pub keyword: BTreeMap<String, Data>,
}

/// Whether a function maps elements through a table or only moves them around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    /// Elementwise function, lowered to a table lookup.
    Tlu,
    /// Reshape, ravel, transpose and other layout changes.
    Memory,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Bool(bool),
    Int(i64),
    Data(Data),
}

impl From<bool> for Attribute {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Attribute {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<Data> for Attribute {
    fn from(value: Data) -> Self {
        Self::Data(value)
    }
}

/// Arbitrary single-input function.
///
/// The output value is supplied by whoever builds the node, since nothing
/// about `func` can be inspected at trace time.
#[derive(Clone, derive_more::Debug)]
pub struct GenericFunction {
    name: String,
    kind: FunctionKind,
    #[debug(skip)]
    func: ElementFn,
    output: Value,
    args: OpArgs,
    attributes: BTreeMap<String, Attribute>,
}

#[bon]
impl GenericFunction {
    /// Build a function payload.
    ///
    /// `attributes` are layered over the defaults (`fusable = true`).
    #[builder]
    pub fn new(
        #[builder(into)] name: String,
        kind: FunctionKind,
        func: ElementFn,
        output: Value,
        #[builder(default)] args: Vec<Data>,
        #[builder(default)] kwargs: BTreeMap<String, Data>,
        #[builder(default)] attributes: BTreeMap<String, Attribute>,
    ) -> Self {
        let mut merged = BTreeMap::from([(FUSABLE.to_string(), Attribute::Bool(true))]);
        merged.extend(attributes);

        Self { name, kind, func, output, args: OpArgs { positional: args, keyword: kwargs }, attributes: merged }
    }
}

impl GenericFunction {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FunctionKind {
        self.kind
    }

    pub fn output(&self) -> &Value {
        &self.output
    }

    pub fn args(&self) -> &OpArgs {
        &self.args
    }

    pub fn attributes(&self) -> &BTreeMap<String, Attribute> {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&Attribute> {
        self.attributes.get(key)
    }

    pub fn is_fusable(&self) -> bool {
        matches!(self.attribute(FUSABLE), Some(Attribute::Bool(true)))
    }

    /// Evaluate the element function on `input`.
    pub fn call(&self, input: &Data) -> Result<Data> {
        (self.func)(input, &self.args)
    }
}
