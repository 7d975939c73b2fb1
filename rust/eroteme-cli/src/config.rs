//! Configuration file parsing for `eroteme.toml`.
//!
//! Searches the current directory then its ancestors unless `--config`
//! names a file. Every field has a default, so an absent file is fine.

use eroteme_compiler::compiler::tokens::TokenKind;
use eroteme_compiler::TransformOptions;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE: &str = "eroteme.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid toml in '{}': {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid exclude pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct ErotemeConfig {
    pub transform: TransformSection,
    pub walk: WalkSection,
    pub batch: BatchSection,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct TransformSection {
    /// Comment prefix marking a directive
    pub sigil: String,
    /// Identifier that replaces the blank target
    pub error_ident: String,
}

impl Default for TransformSection {
    fn default() -> Self {
        let options = TransformOptions::default();
        Self { sigil: options.sigil, error_ident: options.error_ident }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct WalkSection {
    /// File extensions picked up in directories, without the dot
    pub extensions: Vec<String>,
    /// Directory names never descended into
    pub skip_dirs: Vec<String>,
    /// Glob patterns relative to the walk root
    pub exclude: Vec<String>,
}

impl Default for WalkSection {
    fn default() -> Self {
        Self {
            extensions: vec!["go".to_string()],
            skip_dirs: ["vendor", "testdata", ".git", "node_modules"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            exclude: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct BatchSection {
    /// Worker threads; 0 means one per CPU
    pub jobs: usize,
}

impl ErotemeConfig {
    /// Load the config named by `explicit`, or the nearest `eroteme.toml`
    /// above the current directory. Returns the path that was read, if any.
    pub fn load(explicit: Option<&Path>) -> Result<(Option<PathBuf>, Self), ConfigError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => std::env::current_dir().ok().and_then(|dir| Self::find(&dir)),
        };
        match path {
            Some(path) => {
                let config = Self::load_from(&path)?;
                Ok((Some(path), config))
            }
            None => Ok((None, Self::default())),
        }
    }

    /// Nearest `eroteme.toml` in `start` or its ancestors.
    pub fn find(start: &Path) -> Option<PathBuf> {
        let mut dir = start.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                return Some(candidate);
            }
            if !dir.pop() {
                return None;
            }
        }
    }

    /// Load and validate a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let config = Self::parse(&content)
            .map_err(|source| ConfigError::Toml { path: path.to_path_buf(), source })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML string without validating it.
    pub fn parse(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transform.sigil.trim().is_empty() {
            return Err(ConfigError::Invalid("transform.sigil must not be empty".to_string()));
        }
        if !self.transform.sigil.starts_with("//") && !self.transform.sigil.starts_with("/*") {
            return Err(ConfigError::Invalid(format!(
                "transform.sigil '{}' must start with '//' or '/*'",
                self.transform.sigil
            )));
        }
        if !is_go_identifier(&self.transform.error_ident) {
            return Err(ConfigError::Invalid(format!(
                "transform.error_ident '{}' is not a Go identifier",
                self.transform.error_ident
            )));
        }
        if self.walk.extensions.iter().any(|e| e.is_empty() || e.starts_with('.')) {
            return Err(ConfigError::Invalid(
                "walk.extensions are written without a leading dot".to_string(),
            ));
        }
        for pattern in &self.walk.exclude {
            glob::Pattern::new(pattern)
                .map_err(|source| ConfigError::Pattern { pattern: pattern.clone(), source })?;
        }
        Ok(())
    }

    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions {
            sigil: self.transform.sigil.clone(),
            error_ident: self.transform.error_ident.clone(),
        }
    }
}

/// A name the error can be bound to: an identifier that is neither a keyword nor `_`.
pub fn is_go_identifier(name: &str) -> bool {
    let pattern = Regex::new(r"^[\p{L}_][\p{L}\p{Nd}_]*$");
    name != "_"
        && TokenKind::keyword(name).is_none()
        && pattern.map(|re| re.is_match(name)).unwrap_or(false)

}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_when_empty() {
        let cfg = ErotemeConfig::parse("").expect("should parse");
        assert_eq!(cfg, ErotemeConfig::default());
        assert_eq!(cfg.transform.sigil, "//?");
        assert_eq!(cfg.walk.extensions, vec!["go"]);
        assert!(cfg.walk.skip_dirs.contains(&"vendor".to_string()));
        assert_eq!(cfg.batch.jobs, 0);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = ErotemeConfig::parse(
            r#"
[transform]
error_ident = "e"

[walk]
exclude = ["gen/**"]
"#,
        )
        .expect("should parse");
        assert_eq!(cfg.transform.sigil, "//?");
        assert_eq!(cfg.transform.error_ident, "e");
        assert_eq!(cfg.walk.exclude, vec!["gen/**"]);
        assert_eq!(cfg.walk.extensions, vec!["go"]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        let mut cfg = ErotemeConfig::default();
        cfg.transform.error_ident = "_".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
        cfg.transform.error_ident = "func".to_string();
        assert!(cfg.validate().is_err());
        cfg.transform.error_ident = "2err".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = ErotemeConfig::default();
        cfg.transform.sigil = "  ".to_string();
        assert!(cfg.validate().is_err());
        cfg.transform.sigil = "#?".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = ErotemeConfig::default();
        cfg.walk.exclude = vec!["[".to_string()];
        assert!(matches!(cfg.validate(), Err(ConfigError::Pattern { .. })));
    }

    #[test]
    fn identifiers() {
        assert!(is_go_identifier("err"));
        assert!(is_go_identifier("_err2"));
        assert!(is_go_identifier("ошибка"));
        assert!(!is_go_identifier(""));
        assert!(!is_go_identifier("a-b"));
    }

    #[test]
    fn finds_config_in_ancestor() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[batch]\njobs = 3\n").unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let found = ErotemeConfig::find(&nested).expect("config above nested dir");
        assert_eq!(found, dir.path().join(CONFIG_FILE));
        assert_eq!(ErotemeConfig::load_from(&found).unwrap().batch.jobs, 3);
    }

    #[test]
    fn invalid_toml_names_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[transform\n").unwrap();
        let err = ErotemeConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
        assert!(err.to_string().contains(CONFIG_FILE), "got: {}", err);
    }
}
