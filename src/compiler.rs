//! Document-level entry points.
//!
//! One document compiles single-threaded from start to finish. Independent
//! top-level documents may compile in parallel; sub-documents never do, they
//! are compiled inline by the document that declares them.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::ast::ComponentDocument;
use crate::binding_expr::{DefaultStringifier, ExpressionStringifier};
use crate::builder::DescriptorBuilder;
use crate::context::InstanceRecord;
use crate::descriptor::EventDescriptor;
use crate::diagnostics::{CompileError, CompilerProblem};
use crate::options::CompileOptions;
use crate::render::{render_bindings, render_descriptor_tree, render_properties_tree};
use crate::states::CompiledState;

/// Everything the emitter needs for one document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompiledDocument {
    pub class_name: String,
    /// Rendered attributes of the document's own tag.
    pub properties: String,
    /// Rendered content tree.
    pub descriptor: String,
    /// Rendered binding/watcher array, absent when nothing is bound.
    pub bindings: Option<String>,
    pub states: Vec<CompiledState>,
    pub instances: Vec<InstanceRecord>,
    pub events: Vec<EventDescriptor>,
    pub scripts: Vec<String>,
    /// Inline components, flattened in the order they finished compiling.
    pub sub_documents: Vec<CompiledDocument>,
    pub problems: Vec<CompilerProblem>,
}

impl CompiledDocument {
    /// SHA-256 over the rendered artifacts. Equal inputs give equal fingerprints.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.class_name.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.properties.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.descriptor.as_bytes());
        hasher.update([0u8]);
        if let Some(bindings) = &self.bindings {
            hasher.update(bindings.as_bytes());
        }
        for state in &self.states {
            hasher.update([0u8]);
            hasher.update(state.name.as_bytes());
            hasher.update(state.items_descriptors.as_bytes());
            if let Ok(overrides) = serde_json::to_vec(&state.overrides) {
                hasher.update(overrides);
            }
        }
        for sub in &self.sub_documents {
            hasher.update([0u8]);
            hasher.update(sub.fingerprint().as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn has_problems(&self) -> bool {
        !self.problems.is_empty() || self.sub_documents.iter().any(|d| d.has_problems())
    }
}

/// Compile `document` as class `class_name`. Sub-documents re-enter here with
/// a fresh builder and context.
pub(crate) fn compile_with(
    document: &ComponentDocument,
    options: &CompileOptions,
    stringifier: &dyn ExpressionStringifier,
    class_name: String,
) -> CompiledDocument {
    debug!(class = %class_name, file = %document.file_path, "compiling document");

    let mut builder = DescriptorBuilder::new(document, options, stringifier, class_name.clone());
    builder.build();
    let cx = builder.into_context();

    let content_property = options.content_property.as_str();
    let properties = render_properties_tree(&cx.arena, cx.properties_root, content_property);
    let descriptor = render_descriptor_tree(&cx.arena, cx.descriptor_root, content_property);
    let bindings = render_bindings(&cx.bindings);

    for problem in &cx.problems {
        warn!(%problem, "binding skipped");
    }
    debug!(
        class = %class_name,
        instances = cx.instances.len(),
        bindings = cx.bindings.entries().len(),
        watchers = cx.bindings.watchers().len(),
        states = cx.states.len(),
        "document compiled"
    );

    CompiledDocument {
        class_name,
        properties,
        descriptor,
        bindings,
        states: cx.states,
        instances: cx.instances,
        events: cx.events,
        scripts: cx.scripts,
        sub_documents: cx.sub_documents,
        problems: cx.problems,
    }
}

pub fn compile_document(document: &ComponentDocument, options: &CompileOptions) -> CompiledDocument {
    compile_with(
        document,
        options,
        &DefaultStringifier,
        document.class_name.clone(),
    )
}

/// Compile a document with a caller-supplied stringifier for code fragments.
pub fn compile_document_with(
    document: &ComponentDocument,
    options: &CompileOptions,
    stringifier: &dyn ExpressionStringifier,
) -> CompiledDocument {
    compile_with(document, options, stringifier, document.class_name.clone())
}

/// Compile independent documents in parallel. Output order matches input order.
pub fn compile_documents(documents: &[ComponentDocument], options: &CompileOptions) -> Vec<CompiledDocument> {
    documents
        .par_iter()
        .map(|document| compile_document(document, options))
        .collect()
}

/// JSON in, JSON out. `options_json` of `None` uses the defaults.
pub fn compile_document_json(document_json: &str, options_json: Option<&str>) -> Result<String, CompileError> {
    let document: ComponentDocument =
        serde_json::from_str(document_json).map_err(CompileError::InvalidDocument)?;
    let options = match options_json {
        Some(json) => CompileOptions::from_json(json).map_err(CompileError::InvalidOptions)?,
        None => CompileOptions::default(),
    };
    let compiled = compile_document(&document, &options);
    serde_json::to_string(&compiled).map_err(CompileError::Output)
}
