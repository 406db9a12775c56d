//! Brancher configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! branch_suffix = "branch"
//! clone_suffix = "clone"
//! subset_suffix = "subset"
//! strict_append_facts = true
//! ```

use crate::error::BranchError;
use crate::selection::CloneMode;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for [`crate::Brancher`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BranchConfig {
    /// Bracketed suffix of default names for branches
    pub branch_suffix: String,
    /// Bracketed suffix of default names for full clones
    pub clone_suffix: String,
    /// Bracketed suffix of default names for subset clones
    pub subset_suffix: String,
    /// Fail `append_facts` when namespaced ids make it match nothing
    pub strict_append_facts: bool,
}

impl Default for BranchConfig {
    fn default() -> Self {
        Self {
            branch_suffix: "branch".to_string(),
            clone_suffix: "clone".to_string(),
            subset_suffix: "subset".to_string(),
            strict_append_facts: true,
        }
    }
}

impl BranchConfig {
    /// Parse from TOML text
    ///
    /// # Errors
    /// [`BranchError::Config`] on malformed TOML, unknown keys or empty suffixes
    pub fn from_toml_str(text: &str) -> Result<Self, BranchError> {
        let config: Self = toml::from_str(text).map_err(|e| BranchError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// [`BranchError::Config`] if the file cannot be read or parsed
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, BranchError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| BranchError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Check field values
    ///
    /// # Errors
    /// [`BranchError::Config`] naming the first empty suffix
    pub fn validate(&self) -> Result<(), BranchError> {
        for (field, value) in [
            ("branch_suffix", &self.branch_suffix),
            ("clone_suffix", &self.clone_suffix),
            ("subset_suffix", &self.subset_suffix),
        ] {
            if value.trim().is_empty() {
                return Err(BranchError::Config(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }

    /// Set whether `append_facts` enforces its literal-id precondition
    #[inline]
    #[must_use]
    pub fn with_strict_append_facts(mut self, strict: bool) -> Self {
        self.strict_append_facts = strict;
        self
    }

    /// Suffix used in default names for `mode`
    #[inline]
    #[must_use]
    pub fn suffix(&self, mode: CloneMode) -> &str {
        match mode {
            CloneMode::Branch => &self.branch_suffix,
            CloneMode::Clone => &self.clone_suffix,
            CloneMode::Subset => &self.subset_suffix,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(BranchConfig::from_toml_str("").unwrap(), BranchConfig::default());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = BranchConfig::from_toml_str("branch_suffix = \"fork\"\n").unwrap();
        assert_eq!(config.suffix(CloneMode::Branch), "fork");
        assert_eq!(config.suffix(CloneMode::Clone), "clone");
        assert!(config.strict_append_facts);
    }

    #[test]
    fn unknown_keys_and_empty_suffixes_are_rejected() {
        assert!(matches!(
            BranchConfig::from_toml_str("colour = \"red\""),
            Err(BranchError::Config(_))
        ));
        assert!(matches!(
            BranchConfig::from_toml_str("subset_suffix = \" \""),
            Err(BranchError::Config(msg)) if msg.contains("subset_suffix")
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "strict_append_facts = false").unwrap();
        let config = BranchConfig::from_path(file.path()).unwrap();
        assert!(!config.strict_append_facts);
    }

    #[test]
    fn missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = BranchConfig::from_path(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, BranchError::Config(_)));
    }
}
