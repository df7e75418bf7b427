//! Configuration for the defval front end
//!
//! Values come from a TOML file (`--config` or `DEFVAL_CONFIG`), then
//! `DEFVAL_*` environment variables override individual settings. Anything
//! unset keeps its default.
//!
//! ```toml
//! [schema]
//! enabled = true
//! validator_command = ["check-jsonschema", "--schemafile"]
//! rule_schema = "/usr/share/defval/rules.schema.json"
//! manifest_schema = "/usr/share/defval/manifest.schema.json"
//!
//! [sections]
//! default_setters = "helpers/deflt_setter"
//! validators = "helpers/validator"
//!
//! [output]
//! format = "json"
//! ```

use std::path::{Path, PathBuf};

use defval_core::rules::{DEFAULT_ELEMENT, VALIDATE_ELEMENT};
use defval_core::{DEFAULT_SETTER_SECTION, VALIDATOR_SECTION};
use serde::{Deserialize, Serialize};

use crate::cli::OutputFormat;
use crate::error::{CliError, Result};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefvalConfig {
    pub schema: SchemaGateConfig,
    pub sections: SectionsConfig,
    pub output: OutputConfig,
}

/// Schema validator subprocess settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaGateConfig {
    /// Run the schema validator at all
    pub enabled: bool,
    /// Program and leading arguments; schema and document paths are appended
    pub validator_command: Vec<String>,
    /// Schema for rule documents
    pub rule_schema: Option<PathBuf>,
    /// Schema for data documents
    pub manifest_schema: Option<PathBuf>,
}

impl Default for SchemaGateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            validator_command: vec!["check-jsonschema".to_string(), "--schemafile".to_string()],
            rule_schema: None,
            manifest_schema: None,
        }
    }
}

/// Where rules and helper declarations live in the rule document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionsConfig {
    pub default_setters: String,
    pub validators: String,
    pub default_element: String,
    pub validate_element: String,
}

impl Default for SectionsConfig {
    fn default() -> Self {
        Self {
            default_setters: DEFAULT_SETTER_SECTION.to_string(),
            validators: VALIDATOR_SECTION.to_string(),
            default_element: DEFAULT_ELEMENT.to_string(),
            validate_element: VALIDATE_ELEMENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

impl DefvalConfig {
    /// Load from an optional TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    /// Like [`DefvalConfig::load`], reading variables through `lookup`
    ///
    /// Without an explicit path, `DEFVAL_CONFIG` names the file.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let from_env = match path {
            Some(_) => None,
            None => lookup("DEFVAL_CONFIG").map(PathBuf::from),
        };
        let config = match path.or(from_env.as_deref()) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(config.with_env_overrides(lookup))
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::file_error(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply `DEFVAL_*` overrides read through `lookup`
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(enabled) = lookup("DEFVAL_SCHEMA_ENABLED") {
            self.schema.enabled = enabled.parse().unwrap_or(self.schema.enabled);
        }
        if let Some(command) = lookup("DEFVAL_VALIDATOR_COMMAND") {
            let parts: Vec<String> = command.split_whitespace().map(str::to_string).collect();
            if !parts.is_empty() {
                self.schema.validator_command = parts;
            }
        }
        if let Some(schema) = lookup("DEFVAL_RULE_SCHEMA") {
            self.schema.rule_schema = Some(PathBuf::from(schema));
        }
        if let Some(schema) = lookup("DEFVAL_MANIFEST_SCHEMA") {
            self.schema.manifest_schema = Some(PathBuf::from(schema));
        }
        if let Some(format) = lookup("DEFVAL_OUTPUT_FORMAT") {
            self.output.format = format.parse().unwrap_or(self.output.format);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = DefvalConfig::default();
        assert!(config.schema.enabled);
        assert_eq!(config.schema.validator_command[0], "check-jsonschema");
        assert_eq!(config.sections.validators, "helpers/validator");
        assert_eq!(config.sections.default_element, "default");
        assert_eq!(config.output.format, OutputFormat::Table);
    }

    #[test]
    fn test_partial_toml() {
        let config: DefvalConfig = toml::from_str(
            r#"
            [schema]
            rule_schema = "/etc/defval/rules.json"

            [output]
            format = "yaml"
            "#,
        )
        .unwrap();
        assert!(config.schema.enabled);
        assert_eq!(
            config.schema.rule_schema,
            Some(PathBuf::from("/etc/defval/rules.json"))
        );
        assert_eq!(config.output.format, OutputFormat::Yaml);
        assert_eq!(config.sections, SectionsConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("DEFVAL_SCHEMA_ENABLED", "false"),
            ("DEFVAL_VALIDATOR_COMMAND", "xmllint --noout --relaxng"),
            ("DEFVAL_OUTPUT_FORMAT", "json"),
            ("DEFVAL_MANIFEST_SCHEMA", "/tmp/manifest.rng"),
        ]
        .into_iter()
        .collect();

        let config = DefvalConfig::default()
            .with_env_overrides(|name| env.get(name).map(|v| v.to_string()));
        assert!(!config.schema.enabled);
        assert_eq!(
            config.schema.validator_command,
            vec!["xmllint", "--noout", "--relaxng"]
        );
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(
            config.schema.manifest_schema,
            Some(PathBuf::from("/tmp/manifest.rng"))
        );
        assert!(config.schema.rule_schema.is_none());
    }

    #[test]
    fn test_config_path_from_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"[output]\nformat = \"yaml\"\n").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let config = DefvalConfig::load_with(None, |name| match name {
            "DEFVAL_CONFIG" => Some(path.clone()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.output.format, OutputFormat::Yaml);

        // an explicit path wins over the variable
        let config = DefvalConfig::load_with(Some(Path::new("/nonexistent/defval.toml")), |name| {
            match name {
                "DEFVAL_CONFIG" => Some(path.clone()),
                _ => None,
            }
        });
        assert!(matches!(config, Err(CliError::FileError(_))));
    }

    #[test]
    fn test_invalid_env_values_keep_current_settings() {
        let config = DefvalConfig::default().with_env_overrides(|name| match name {
            "DEFVAL_SCHEMA_ENABLED" => Some("perhaps".to_string()),
            "DEFVAL_OUTPUT_FORMAT" => Some("xml".to_string()),
            _ => None,
        });
        assert!(config.schema.enabled);
        assert_eq!(config.output.format, OutputFormat::Table);
    }
}
