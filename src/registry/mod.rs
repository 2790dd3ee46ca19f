// Tool discovery and capability detection.
//
// Discovers which text-processing binaries are installed, in what
// variant, and exposes an opaque fingerprint used as half of the
// compile-cache key. Discovery runs at most once per tool per process;
// results are memoized behind `parking_lot::RwLock`, mirroring the
// teacher's `Arc<RwLock<_>>` shared-state convention.

mod probe;

pub use probe::PROBE_TIMEOUT;

use crate::error::{CompileError, Result};
use parking_lot::RwLock;
use probe::{first_available, probe_binary, probe_binary_args};
use std::hash::{Hash, Hasher};

const ENV_AWK: &str = "SHELLSPARK_AWK";
const ENV_GREP: &str = "SHELLSPARK_GREP";
const ENV_SORT: &str = "SHELLSPARK_SORT";
const ENV_JQ: &str = "SHELLSPARK_JQ";

/// Explicit configuration, derived from the environment once at
/// construction time rather than via scattered `getenv` calls at
/// emission time (see design notes on environment-driven overrides).
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    pub awk_override: Option<String>,
    pub grep_override: Option<String>,
    pub sort_override: Option<String>,
    pub jq_override: Option<String>,
    pub tmpdir: Option<String>,
}

impl RegistryConfig {
    pub fn from_env() -> Self {
        RegistryConfig {
            awk_override: std::env::var(ENV_AWK).ok(),
            grep_override: std::env::var(ENV_GREP).ok(),
            sort_override: std::env::var(ENV_SORT).ok(),
            jq_override: std::env::var(ENV_JQ).ok(),
            tmpdir: std::env::var("TMPDIR").ok(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AwkVariant {
    Mawk,
    Gawk,
    Awk,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AwkInfo {
    pub path: String,
    pub variant: AwkVariant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrepVariant {
    Rg,
    Grep,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GrepInfo {
    pub path: String,
    pub variant: GrepVariant,
    pub supports_fixed_strings: bool,
    pub supports_extended_regex: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortInfo {
    pub path: String,
    pub supports_parallel: bool,
    pub supports_buffer_size: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JqInfo {
    pub path: String,
}

/// A stable summary of the currently resolved tool set. Changes iff any
/// resolution changes; used as half of the compile-cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(Vec<u8>);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[cfg(test)]
    pub(crate) fn from_bytes_for_test(bytes: Vec<u8>) -> Self {
        Fingerprint(bytes)
    }
}

/// Discovers and memoizes available binaries and their capabilities.
pub struct ToolRegistry {
    config: RegistryConfig,
    awk: RwLock<Option<AwkInfo>>,
    grep: RwLock<Option<GrepInfo>>,
    sort: RwLock<Option<SortInfo>>,
    jq: RwLock<Option<Option<JqInfo>>>,
    cpu_count: RwLock<Option<usize>>,
}

impl ToolRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        ToolRegistry {
            config,
            awk: RwLock::new(None),
            grep: RwLock::new(None),
            sort: RwLock::new(None),
            jq: RwLock::new(None),
            cpu_count: RwLock::new(None),
        }
    }

    pub fn from_env() -> Self {
        ToolRegistry::new(RegistryConfig::from_env())
    }

    /// Forget all cached resolutions. Safe to call concurrently; a
    /// resolution in flight on another thread simply re-runs.
    pub fn clear(&self) {
        *self.awk.write() = None;
        *self.grep.write() = None;
        *self.sort.write() = None;
        *self.jq.write() = None;
        *self.cpu_count.write() = None;
    }

    #[tracing::instrument(skip(self))]
    pub fn resolve_awk(&self) -> Result<AwkInfo> {
        if let Some(info) = self.awk.read().clone() {
            return Ok(info);
        }
        let mut slot = self.awk.write();
        if let Some(info) = slot.clone() {
            return Ok(info);
        }

        let info = if let Some(path) = &self.config.awk_override {
            AwkInfo { path: path.clone(), variant: AwkVariant::Awk }
        } else {
            let found = first_available(&["mawk", "gawk", "awk"], "--version")
                .ok_or_else(|| CompileError::unsupported("awk"))?;
            let variant = match found {
                "mawk" => AwkVariant::Mawk,
                "gawk" => AwkVariant::Gawk,
                _ => AwkVariant::Awk,
            };
            AwkInfo { path: found.to_string(), variant }
        };

        *slot = Some(info.clone());
        tracing::debug!(path = %info.path, variant = ?info.variant, "resolved awk");
        Ok(info)
    }

    #[tracing::instrument(skip(self))]
    pub fn resolve_grep(&self) -> Result<GrepInfo> {
        if let Some(info) = self.grep.read().clone() {
            return Ok(info);
        }
        let mut slot = self.grep.write();
        if let Some(info) = slot.clone() {
            return Ok(info);
        }

        let info = if let Some(path) = &self.config.grep_override {
            GrepInfo {
                path: path.clone(),
                variant: GrepVariant::Grep,
                supports_fixed_strings: true,
                supports_extended_regex: true,
            }
        } else if probe_binary("rg", "--version") {
            GrepInfo {
                path: "rg".to_string(),
                variant: GrepVariant::Rg,
                supports_fixed_strings: true,
                supports_extended_regex: true,
            }
        } else if probe_binary("grep", "--version") {
            GrepInfo {
                path: "grep".to_string(),
                variant: GrepVariant::Grep,
                supports_fixed_strings: true,
                supports_extended_regex: true,
            }
        } else {
            return Err(CompileError::unsupported("grep"));
        };

        *slot = Some(info.clone());
        tracing::debug!(path = %info.path, variant = ?info.variant, "resolved grep");
        Ok(info)
    }

    #[tracing::instrument(skip(self))]
    pub fn resolve_sort(&self) -> Result<SortInfo> {
        if let Some(info) = self.sort.read().clone() {
            return Ok(info);
        }
        let mut slot = self.sort.write();
        if let Some(info) = slot.clone() {
            return Ok(info);
        }

        let path = if let Some(path) = &self.config.sort_override {
            path.clone()
        } else if probe_binary("sort", "--version") {
            "sort".to_string()
        } else {
            return Err(CompileError::unsupported("sort"));
        };

        // `sort --version`/`--help` output differs between GNU and BSD;
        // GNU sort supports `--parallel` and `-S`/`--buffer-size`, BSD
        // sort supports neither. Probe by actually passing the flag.
        let supports_parallel = probe_binary_args(&path, &["--parallel=1", "--version"]);
        let supports_buffer_size = probe_binary_args(&path, &["-S", "1M", "--version"]);

        let info = SortInfo { path, supports_parallel, supports_buffer_size };
        *slot = Some(info.clone());
        tracing::debug!(path = %info.path, parallel = info.supports_parallel, "resolved sort");
        Ok(info)
    }

    #[tracing::instrument(skip(self))]
    pub fn resolve_jq(&self) -> Option<JqInfo> {
        if let Some(cached) = self.jq.read().clone() {
            return cached;
        }
        let mut slot = self.jq.write();
        if let Some(cached) = slot.clone() {
            return cached;
        }

        let info = if let Some(path) = &self.config.jq_override {
            Some(JqInfo { path: path.clone() })
        } else if probe_binary("jq", "--version") {
            Some(JqInfo { path: "jq".to_string() })
        } else {
            None
        };

        *slot = Some(info.clone());
        info
    }

    pub fn cpu_count(&self) -> usize {
        if let Some(n) = *self.cpu_count.read() {
            return n;
        }
        let n = num_cpus::get().max(1);
        *self.cpu_count.write() = Some(n);
        n
    }

    pub fn tmpdir(&self) -> String {
        self.config
            .tmpdir
            .clone()
            .unwrap_or_else(|| "/tmp".to_string())
    }

    /// Resolve everything this plan could need and summarize it into a
    /// stable fingerprint. `awk` is always required; `jq` is included
    /// only as an `Option`, since its absence is fatal only when the
    /// plan parses json — that check belongs to the compiler, not here.
    pub fn fingerprint(&self) -> Result<Fingerprint> {
        let awk = self.resolve_awk()?;
        let grep = self.resolve_grep()?;
        let sort = self.resolve_sort()?;
        let jq = self.resolve_jq();
        let cpus = self.cpu_count();

        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        awk.hash(&mut hasher);
        grep.hash(&mut hasher);
        sort.hash(&mut hasher);
        jq.hash(&mut hasher);
        cpus.hash(&mut hasher);
        let digest = hasher.finish();
        Ok(Fingerprint(digest.to_le_bytes().to_vec()))
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        ToolRegistry::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_bypasses_discovery() {
        let config = RegistryConfig {
            awk_override: Some("/usr/custom/awk".into()),
            ..Default::default()
        };
        let registry = ToolRegistry::new(config);
        let info = registry.resolve_awk().unwrap();
        assert_eq!(info.path, "/usr/custom/awk");
    }

    #[test]
    fn cpu_count_is_positive() {
        let registry = ToolRegistry::from_env();
        assert!(registry.cpu_count() >= 1);
    }

    #[test]
    fn clear_forces_rediscovery() {
        let registry = ToolRegistry::new(RegistryConfig {
            awk_override: Some("/bin/awk".into()),
            ..Default::default()
        });
        registry.resolve_awk().unwrap();
        assert!(registry.awk.read().is_some());
        registry.clear();
        assert!(registry.awk.read().is_none());
    }

    #[test]
    fn fingerprint_changes_when_override_changes() {
        let r1 = ToolRegistry::new(RegistryConfig {
            awk_override: Some("/bin/awk".into()),
            grep_override: Some("/bin/grep".into()),
            sort_override: Some("/bin/sort".into()),
            ..Default::default()
        });
        let r2 = ToolRegistry::new(RegistryConfig {
            awk_override: Some("/usr/bin/gawk".into()),
            grep_override: Some("/bin/grep".into()),
            sort_override: Some("/bin/sort".into()),
            ..Default::default()
        });
        assert_ne!(r1.fingerprint().unwrap(), r2.fingerprint().unwrap());
    }
}
