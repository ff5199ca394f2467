//! `quill.toml` configuration
//!
//! ```toml
//! [runtime]
//! break_policy = "function"
//! native_faults = "value"
//! max_call_depth = 10000
//!
//! [natives]
//! enabled = ["clock", "fileOpen", "getAvailableMemory"]
//!
//! [log]
//! level = "warn"
//! ```
//!
//! Every field is optional; unknown keys are rejected.

use crate::error::{CompileError, Result};
use crate::interp::NativeRegistry;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name searched for next to the script and in the working directory
pub const CONFIG_FILE: &str = "quill.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub runtime: RuntimeConfig,
    pub natives: NativesConfig,
    pub log: LogConfig,
}

/// Evaluator behaviour switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    pub break_policy: BreakPolicy,
    pub native_faults: NativeFaultPolicy,
    /// Calls nested deeper than this raise a stack overflow error
    pub max_call_depth: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            break_policy: BreakPolicy::default(),
            native_faults: NativeFaultPolicy::default(),
            max_call_depth: 10_000,
        }
    }
}

/// How far `break` unwinds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BreakPolicy {
    /// Leave the whole enclosing call, like a bare `return`
    #[default]
    Function,
    /// Leave only the innermost `while`
    Loop,
}

/// What a failing native call produces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NativeFaultPolicy {
    /// The fault becomes the call's result value
    #[default]
    Value,
    /// The fault is raised as a runtime error
    Error,
}

/// Which native capabilities scripts may call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NativesConfig {
    pub enabled: Vec<String>,
}

impl Default for NativesConfig {
    fn default() -> Self {
        NativesConfig {
            enabled: NativeRegistry::BUILTIN.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl NativesConfig {
    pub fn registry(&self) -> Result<NativeRegistry> {
        NativeRegistry::from_names(&self.enabled)
    }
}

/// Diagnostics verbosity; `RUST_LOG` takes precedence when set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Parse configuration text; `origin` names the source in error messages
    pub fn from_toml_str(text: &str, origin: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| CompileError::config(format!("{origin}: {e}")))
    }

    /// Read and parse a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| CompileError::config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text, &path.display().to_string())
    }

    /// First `quill.toml` next to `script`, then in the working directory
    pub fn discover(script: Option<&Path>) -> Option<PathBuf> {
        let beside_script = script
            .and_then(Path::parent)
            .map(|dir| dir.join(CONFIG_FILE));
        beside_script
            .into_iter()
            .chain(std::iter::once(PathBuf::from(CONFIG_FILE)))
            .find(|candidate| candidate.is_file())
    }

    /// Explicit path if given, else the discovered file, else defaults
    pub fn resolve(explicit: Option<&Path>, script: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => match Self::discover(script) {
                Some(path) => {
                    tracing::debug!(path = %path.display(), "loading configuration");
                    Self::load(&path)
                }
                None => Ok(Self::default()),
            },
        }
    }
}
