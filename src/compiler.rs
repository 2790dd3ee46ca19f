// Top-level compiler. Bundles a tool registry, the optimizer, the
// assembler, and a compile cache into the one public entry point:
// `Compiler::compile`. A process-wide default instance is exposed via
// `default_compiler()` for callers who don't need a private registry
// (e.g. a custom `SHELLSPARK_AWK` override for tests).

use crate::assemble::{self, cache::CompileCache};
use crate::error::Result;
use crate::optimizer;
use crate::plan::Plan;
use crate::registry::ToolRegistry;
use once_cell::sync::Lazy;

/// Compiles `Plan`s into shell command lines, caching by plan hash and
/// tool fingerprint.
pub struct Compiler {
    registry: ToolRegistry,
    cache: CompileCache,
}

impl Compiler {
    pub fn new(registry: ToolRegistry) -> Self {
        Compiler { registry, cache: CompileCache::new() }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Forget cached commands and re-run tool discovery on next use.
    pub fn reset(&self) {
        self.registry.clear();
        self.cache.clear();
    }

    /// Optimize and assemble `plan` into a single shell command line.
    /// `awk` is resolved unconditionally up front — its absence is fatal
    /// for every plan, not only ones that happen to touch field data.
    #[tracing::instrument(skip(self, plan))]
    pub fn compile(&self, plan: &Plan) -> Result<String> {
        self.registry.resolve_awk()?;

        let optimized = optimizer::optimize(plan);
        let plan_hash = optimized.structural_hash();
        let fingerprint = self.registry.fingerprint()?;

        self.cache.get_or_compile(plan_hash, &fingerprint, || assemble::assemble(&optimized, &self.registry))
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler::new(ToolRegistry::from_env())
    }
}

static DEFAULT_COMPILER: Lazy<Compiler> = Lazy::new(Compiler::default);

/// The process-wide default compiler, built from environment-derived
/// tool overrides. Most callers should use this rather than constructing
/// their own `Compiler`.
pub fn default_compiler() -> &'static Compiler {
    &DEFAULT_COMPILER
}
