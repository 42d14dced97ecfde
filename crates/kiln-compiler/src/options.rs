//! Compile options
//!
//! Options are plain data with serde defaults so they can live in a
//! `[compile]`-style TOML table next to the rest of a project's settings.

use serde::{Deserialize, Serialize};

use crate::abi::MAX_SUPPORTED_DELEGATE_ARITY;
use crate::error::{CompileError, CompileResult};

/// Options controlling one compilation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Overrides the module name used as the root scope identifier
    pub module_name: Option<String>,

    /// Largest physical argument count (receiver + chain + parameters) the
    /// backend can pass in a typed delegate. Larger callables are counted
    /// in the metrics.
    pub max_delegate_arity: u32,

    /// Collect compilation metrics
    pub collect_metrics: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            module_name: None,
            max_delegate_arity: MAX_SUPPORTED_DELEGATE_ARITY,
            collect_metrics: true,
        }
    }
}

impl CompileOptions {
    /// Parse options from a TOML document
    pub fn from_toml_str(source: &str) -> CompileResult<Self> {
        let options: CompileOptions = toml::from_str(source).map_err(|e| CompileError::Config {
            message: e.to_string(),
        })?;
        options.validate()?;
        Ok(options)
    }

    /// Check option values for consistency
    pub fn validate(&self) -> CompileResult<()> {
        if self.max_delegate_arity == 0 {
            return Err(CompileError::Config {
                message: "max_delegate_arity must be at least 1".to_string(),
            });
        }
        if let Some(name) = &self.module_name {
            if name.is_empty() || name.contains('/') {
                return Err(CompileError::Config {
                    message: format!("module_name '{}' must be non-empty and contain no '/'", name),
                });
            }
        }
        Ok(())
    }
}
