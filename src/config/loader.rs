//! Reading edit plans from TOML

use crate::config::schema::{EditPlan, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Where a plan's text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanSource {
    Inline,
    File(PathBuf),
}

impl fmt::Display for PlanSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanSource::Inline => write!(f, "<inline>"),
            PlanSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read edit plan {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("edit plan {plan} is not valid TOML: {source}")]
    Toml {
        plan: PlanSource,
        source: toml_edit::de::Error,
    },

    #[error("edit plan {plan} has {} problem(s):\n{source}", .source.issues.len())]
    Validation {
        plan: PlanSource,
        source: ValidationError,
    },
}

impl ConfigError {
    fn read_from(self, path: &Path) -> Self {
        let file = PlanSource::File(path.to_path_buf());
        match self {
            ConfigError::Toml { source, .. } => ConfigError::Toml { plan: file, source },
            ConfigError::Validation { source, .. } => ConfigError::Validation { plan: file, source },
            io => io,
        }
    }
}

pub fn load_from_str(input: &str) -> Result<EditPlan, ConfigError> {
    let plan: EditPlan = toml_edit::de::from_str(input).map_err(|source| ConfigError::Toml {
        plan: PlanSource::Inline,
        source,
    })?;
    plan.validate().map_err(|source| ConfigError::Validation {
        plan: PlanSource::Inline,
        source,
    })?;
    Ok(plan)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<EditPlan, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.read_from(path))
}
