// Error types for plan construction, optimization, and compilation.
//
// Every variant names the offending node and the violated rule in its
// message, per the documented error-handling design: user-visible
// messages never dump the whole plan.

use thiserror::Error;

/// Errors raised while building, optimizing, or compiling a plan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// An invariant of the plan was violated, at build-time or compile-time.
    #[error("plan error in {node}: {rule}")]
    Plan { node: String, rule: String },

    /// A tool required by the plan is missing from the host.
    #[error("unsupported environment: missing required tool {tool}")]
    UnsupportedEnvironment { tool: String },

    /// Internal escape-discipline assertion failed. Reaching this is a bug.
    #[error("quoting error: {0}")]
    Quoting(String),

    /// Reserved for the external executor; the compiler never returns this.
    #[error("execution error: {0}")]
    Execution(String),

    /// A tool-probe subprocess could not be spawned or read.
    #[error("tool probe I/O error: {0}")]
    Probe(String),
}

impl CompileError {
    pub fn plan(node: impl Into<String>, rule: impl Into<String>) -> Self {
        CompileError::Plan {
            node: node.into(),
            rule: rule.into(),
        }
    }

    pub fn unsupported(tool: impl Into<String>) -> Self {
        CompileError::UnsupportedEnvironment { tool: tool.into() }
    }
}

impl From<std::io::Error> for CompileError {
    fn from(e: std::io::Error) -> Self {
        CompileError::Probe(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;
