//! Label document validation pipeline.
//!
//! Parses a label while recording per-node source positions, validates it
//! against a schema and against rule sets, and maps every finding back to
//! an exact source location. The schema-validation and rule-transform
//! algorithms are consumed capabilities behind traits; this crate owns the
//! pipeline, the caches, and the position bookkeeping.

pub mod document;
pub mod path;
pub mod replay;
pub mod schema;
pub mod schematron;
pub mod validator;

pub use document::{Attribute, Document, Element, NodeId, NodeKind};
pub use replay::{StructuralEvent, StructuralHandler, replay, replay_node};
pub use schema::{CompiledSchema, SchemaCompiler, SchemaGate, SchemaSession, SchemaSource};
pub use schematron::{
    CatalogResolver, CompiledRuleSet, FailedAssertion, RuleCompiler, RuleGate, RuleReport,
};
pub use validator::{DocumentValidator, LabelValidator, file_url, is_bundle_or_collection};
