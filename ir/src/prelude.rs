//! Common imports for building and inspecting graphs.
//!
//! ```rust,ignore
//! use veil_ir::prelude::*;
//! ```

pub use crate::data::Data;
pub use crate::graph::{EntryId, NodeId, OperatorGraph, TraceLog};
pub use crate::indexing::IndexElem;
pub use crate::node::{Attribute, ElementFn, FunctionKind, GenericFunction, IntermediateNode, NodeKind, OpArgs};
pub use crate::tlu::{LookupTable, TableConfig};
pub use crate::value::Value;
pub use crate::{idx, shape::Shape};

pub use veil_dtype::DType;
