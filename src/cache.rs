use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, trace};

use crate::ast::ComponentDocument;
use crate::compiler::{compile_document, CompiledDocument};
use crate::options::CompileOptions;

/// In-memory memo of compiled documents keyed by a fingerprint of the input.
///
/// Compilation is deterministic, so a hit is exactly what a fresh compile would
/// produce. Safe to share across the threads of [`crate::compile_documents`].
#[derive(Debug, Default)]
pub struct CompileCache {
    entries: Mutex<HashMap<String, CompiledDocument>>,
}

impl CompileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// SHA-256 over the serialized document and options. `None` if either fails
    /// to serialize, in which case the document is compiled uncached.
    pub fn compute_key(document: &ComponentDocument, options: &CompileOptions) -> Option<String> {
        let document = serde_json::to_vec(document).ok()?;
        let options = serde_json::to_vec(options).ok()?;
        let mut hasher = Sha256::new();
        hasher.update(&document);
        hasher.update([0u8]);
        hasher.update(&options);
        Some(format!("{:x}", hasher.finalize()))
    }

    pub fn get(&self, key: &str) -> Option<CompiledDocument> {
        self.lock().get(key).cloned()
    }

    pub fn insert(&self, key: String, compiled: CompiledDocument) {
        self.lock().insert(key, compiled);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn compile(&self, document: &ComponentDocument, options: &CompileOptions) -> CompiledDocument {
        let Some(key) = Self::compute_key(document, options) else {
            debug!(class = %document.class_name, "document not hashable, compiling uncached");
            return compile_document(document, options);
        };
        if let Some(hit) = self.get(&key) {
            trace!(class = %document.class_name, %key, "compile cache hit");
            return hit;
        }
        let compiled = compile_document(document, options);
        self.insert(key, compiled.clone());
        compiled
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CompiledDocument>> {
        // A panic mid-insert leaves the map itself consistent.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
