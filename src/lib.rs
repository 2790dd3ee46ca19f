//! Compiles a declarative data-transformation query, built through a
//! fluent [`PlanBuilder`], into a single Unix shell command line backed
//! by `awk`, `grep`/`ripgrep`, `jq`, `sort`, `uniq`, and `head`.
//!
//! ```no_run
//! use shellspark::plan::{ColOp, Format, PlanBuilder, Scalar};
//!
//! let plan = PlanBuilder::source("app.log", false)
//!     .filter_line(shellspark::plan::LineOp::Contains, "ERROR")?
//!     .build()?;
//!
//! let command = shellspark::default_compiler().compile(&plan)?;
//! # Ok::<(), shellspark::error::CompileError>(())
//! ```
//!
//! The plan, optimizer, tool registry, and code emitters are each their
//! own module; [`compiler::Compiler`] is the one type that wires them
//! together into [`compiler::Compiler::compile`].

pub mod assemble;
pub mod backend;
pub mod compiler;
pub mod error;
pub mod optimizer;
pub mod plan;
pub mod registry;

pub use compiler::{default_compiler, Compiler};
pub use error::CompileError;
pub use plan::{Plan, PlanBuilder};

/// Install a `tracing` subscriber reading `SHELLSPARK_LOG` (falling back
/// to `info`), mirroring the teacher's binary-entrypoint setup lifted
/// into a reusable library call for embedders and integration tests.
/// Safe to call more than once; only the first call takes effect.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("SHELLSPARK_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
