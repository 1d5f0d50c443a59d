#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};

use crate::ast::SourceLocation;

// ═══════════════════════════════════════════════════════════════════════════════
// PROBLEM CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const PROBLEM_UNSUPPORTED_BINDING_SOURCE: &str = "DSC-BIND-001";
pub const PROBLEM_UNSUPPORTED_BINDING_DESTINATION: &str = "DSC-BIND-002";

fn get_guarantee(code: &str) -> &'static str {
    match code {
        PROBLEM_UNSUPPORTED_BINDING_SOURCE => {
            "Binding sources are identifiers, member accesses, casts, calls, literals or operators over them."
        }
        PROBLEM_UNSUPPORTED_BINDING_DESTINATION => {
            "Binding destinations are assignable identifier or member-access chains."
        }
        _ => "Unknown problem.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER PROBLEM
// ═══════════════════════════════════════════════════════════════════════════════

/// A recoverable problem attached to one node. The offending construct is left
/// out of the output; the rest of the document still compiles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct CompilerProblem {
    pub code: String,
    pub message: String,
    pub guarantee: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl CompilerProblem {
    pub fn new(code: &str, message: &str, file: &str, location: SourceLocation) -> Self {
        CompilerProblem {
            code: code.to_string(),
            message: message.to_string(),
            guarantee: get_guarantee(code).to_string(),
            file: file.to_string(),
            line: location.line,
            column: location.column,
        }
    }
}

impl std::fmt::Display for CompilerProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}: [{}] {}",
            self.file, self.line, self.column, self.code, self.message
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BOUNDARY ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Failures at the serialized entry points. Compilation itself never returns
/// an error: problems are collected, contract violations panic.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("invalid component document: {0}")]
    InvalidDocument(#[source] serde_json::Error),

    #[error("invalid compile options: {0}")]
    InvalidOptions(#[source] serde_json::Error),

    #[error("failed to serialize compiled output: {0}")]
    Output(#[source] serde_json::Error),
}
