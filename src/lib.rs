//! # Descriptor Compiler
//!
//! Backend stage that turns a resolved component document into runtime data:
//! a descriptor tree the runtime instantiates declaratively, per-state
//! override instructions, and the binding/watcher graph.
//!
//! ## Output Invariants
//!
//! 1. **Determinism**: the same document compiles to byte-identical output.
//!    Nothing iterates an unordered collection where order is observable.
//!
//! 2. **Two Trees**: attributes of the document's own tag render into the
//!    properties tree. Its declared content renders into the descriptor tree.
//!
//! 3. **Ids**: explicit id, else the markup-derived id, else `instN` from 0.
//!    Synthesized ids never collide with ids the document declares.
//!
//! 4. **States**: state-dependent nodes are left out of the base trees.
//!    `AddItems` overrides are emitted in reverse document order, then
//!    `SetProperty` / `SetStyle` / `SetEventHandler` in document order.
//!
//! 5. **Watchers**: chains sharing a prefix share watchers. Merging is by
//!    `(kind, name)`, never by identity. Kind codes are fixed:
//!    Function=0, StaticProperty=1, Property=2, XML=3.
//!
//! 6. **Sub-documents**: inline components compile with a fresh context and
//!    are hoisted into the parent's `subDocuments`.
//!
//! ## Failure Model
//!
//! Unsupported binding expressions become [`CompilerProblem`]s and the binding
//! is skipped. Traversal-stack mismatches are contract violations and panic.

#[cfg(feature = "napi")]
use napi_derive::napi;

pub mod ast;
pub mod binding;
pub mod binding_expr;
mod builder;
pub mod cache;
mod compiler;
pub mod context;
pub mod descriptor;
pub mod diagnostics;
pub mod options;
pub mod render;
pub mod states;
pub mod visitor;

#[cfg(test)]
mod fixtures;

#[cfg(test)]
mod state_tests;

pub use ast::ComponentDocument;
pub use binding_expr::{DefaultStringifier, ExpressionStringifier};
pub use cache::CompileCache;
pub use compiler::{
    compile_document, compile_document_json, compile_document_with, compile_documents,
    CompiledDocument,
};
pub use diagnostics::{CompileError, CompilerProblem};
pub use options::CompileOptions;
pub use states::{CompiledState, ItemsPosition, OverrideDescriptor, OverrideValue};

/// Node host entry point. Takes the resolved document and optional options as
/// JSON values and returns the compiled document.
#[cfg(feature = "napi")]
#[napi]
pub fn compile_document_native(
    document: serde_json::Value,
    options: Option<serde_json::Value>,
) -> napi::Result<serde_json::Value> {
    let document: ComponentDocument = serde_json::from_value(document)
        .map_err(|e| napi::Error::from_reason(CompileError::InvalidDocument(e).to_string()))?;
    let options: CompileOptions = match options {
        Some(value) => serde_json::from_value(value)
            .map_err(|e| napi::Error::from_reason(CompileError::InvalidOptions(e).to_string()))?,
        None => CompileOptions::default(),
    };
    let compiled = compile_document(&document, &options);
    serde_json::to_value(compiled).map_err(|e| napi::Error::from_reason(e.to_string()))
}
