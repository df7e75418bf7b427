//! Loading and saving documents by file extension

use std::path::Path;

use defval_core::{RuleDocument, Tree};
use serde_json::Value;

use crate::error::{CliError, Result};

/// Supported document encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
    Toml,
}

impl DocumentFormat {
    /// Pick the format from a path's extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "json" => Ok(DocumentFormat::Json),
            "yaml" | "yml" => Ok(DocumentFormat::Yaml),
            "toml" => Ok(DocumentFormat::Toml),
            _ => Err(CliError::invalid_input(format!(
                "Unsupported file format: {}. Supported formats: json, yaml, yml, toml",
                extension
            ))),
        }
    }

    /// Parse document text
    pub fn parse(self, content: &str) -> Result<Value> {
        match self {
            DocumentFormat::Json => serde_json::from_str(content)
                .map_err(|e| CliError::parse_error(format!("Invalid JSON: {}", e))),
            DocumentFormat::Yaml => serde_yaml::from_str(content)
                .map_err(|e| CliError::parse_error(format!("Invalid YAML: {}", e))),
            DocumentFormat::Toml => {
                let toml_value: toml::Value = toml::from_str(content)
                    .map_err(|e| CliError::parse_error(format!("Invalid TOML: {}", e)))?;
                serde_json::to_value(toml_value)
                    .map_err(|e| CliError::parse_error(format!("Conversion error: {}", e)))
            }
        }
    }

    /// Render a document value
    pub fn render(self, value: &Value) -> Result<String> {
        match self {
            DocumentFormat::Json => serde_json::to_string_pretty(value)
                .map_err(|e| CliError::SerializationError(e.to_string())),
            DocumentFormat::Yaml => serde_yaml::to_string(value)
                .map_err(|e| CliError::SerializationError(e.to_string())),
            DocumentFormat::Toml => toml::to_string_pretty(value)
                .map_err(|e| CliError::SerializationError(e.to_string())),
        }
    }
}

/// Read and parse a document file
pub fn load_value(path: &Path) -> Result<Value> {
    let format = DocumentFormat::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|e| {
        CliError::file_error(format!("Failed to read file '{}': {}", path.display(), e))
    })?;
    format.parse(&content)
}

/// Load a data document as a tree
pub fn load_tree(path: &Path) -> Result<Tree> {
    let value = load_value(path)?;
    Tree::from_value(&value)
        .map_err(|e| CliError::parse_error(format!("'{}': {}", path.display(), e)))
}

/// Load a rule document
pub fn load_rules(path: &Path) -> Result<RuleDocument> {
    let value = load_value(path)?;
    RuleDocument::from_value(&value)
        .map_err(|e| CliError::parse_error(format!("'{}': {}", path.display(), e)))
}

/// Write a tree to `path` in the format its extension names
pub fn save_tree(path: &Path, tree: &Tree) -> Result<()> {
    let format = DocumentFormat::from_path(path)?;
    let rendered = format.render(&tree.to_value())?;
    std::fs::write(path, rendered).map_err(|e| {
        CliError::file_error(format!("Failed to write file '{}': {}", path.display(), e))
    })?;
    tracing::info!(path = %path.display(), "wrote document");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            DocumentFormat::from_path(&PathBuf::from("a.YML")).unwrap(),
            DocumentFormat::Yaml
        );
        assert_eq!(
            DocumentFormat::from_path(&PathBuf::from("a.toml")).unwrap(),
            DocumentFormat::Toml
        );
        assert!(matches!(
            DocumentFormat::from_path(&PathBuf::from("a.xml")),
            Err(CliError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_toml_documents_map_onto_trees() {
        let value = DocumentFormat::Toml
            .parse(
                r#"
                [distro]
                "@name" = "demo"
                pkg = ["a", "b"]
                "#,
            )
            .unwrap();
        let tree = Tree::from_value(&value).unwrap();
        assert_eq!(tree.find("distro/pkg").len(), 2);
        assert_eq!(tree.find("distro/name").len(), 1);
    }

    #[test]
    fn test_invalid_documents_are_parse_errors() {
        assert!(matches!(
            DocumentFormat::Json.parse("{ not json"),
            Err(CliError::ParseError(_))
        ));
        assert!(matches!(
            DocumentFormat::Yaml.parse("a: [unclosed"),
            Err(CliError::ParseError(_))
        ));
    }
}
