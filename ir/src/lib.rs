//! Intermediate representation of traced programs.
//!
//! This crate defines the typed value model, the IR node taxonomy and the
//! operator graph produced by tracing a function.
//!
//! # Module Organization
//!
//! - [`value`] - Edge type descriptor ([`Value`]) and value mixing
//! - [`data`] - Concrete data used by constants and evaluation
//! - [`indexing`] - Constant index expressions and the [`idx!`] macro
//! - [`node`] - Node kinds, validation and evaluation
//! - [`graph`] - Trace log and the frozen [`OperatorGraph`]
//! - [`tlu`] - Lookup table synthesis
//! - [`error`] - Error types and result handling
//! - [`shape`] - Shape utilities

pub mod data;
pub mod error;
pub mod graph;
pub mod indexing;
pub mod node;
pub mod prelude;
pub mod shape;
pub mod tlu;
pub mod value;


pub use data::Data;
pub use error::{Error, Result};
pub use graph::{EntryId, NodeId, OperatorGraph, TraceLog};
pub use indexing::IndexElem;
pub use node::{FunctionKind, GenericFunction, IntermediateNode, NodeKind};
pub use tlu::{LookupTable, TableConfig, flood_fill};
pub use value::{Value, mix_values};

pub use veil_dtype::DType;
