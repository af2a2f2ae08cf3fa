//! Configuration file parsing for `pgdelta.toml`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{SchemaError, SchemaResult};

/// Main configuration structure for `pgdelta.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeltaConfig {
    /// Name resolution settings.
    #[serde(default)]
    pub schema: SchemaConfig,

    /// Diff engine settings.
    #[serde(default)]
    pub diff: DiffConfig,

    /// Migration generator settings.
    #[serde(default)]
    pub generator: GeneratorConfig,
}

impl DeltaConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| SchemaError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> SchemaResult<Self> {
        let expanded = expand_env_vars(content);
        let config: Self =
            toml::from_str(&expanded).map_err(|e| SchemaError::TomlError { source: e })?;
        config.validate()?;
        Ok(config)
    }

    /// Schema that unqualified names resolve to.
    pub fn default_schema(&self) -> &str {
        &self.schema.default_schema
    }

    /// Whether `name` is a schema that is never created or dropped.
    pub fn is_system_schema(&self, name: &str) -> bool {
        name == self.schema.default_schema || self.schema.system_schemas.iter().any(|s| s == name)
    }

    fn validate(&self) -> SchemaResult<()> {
        if self.schema.default_schema.trim().is_empty() {
            return Err(SchemaError::config("schema.default_schema must not be empty"));
        }
        Ok(())
    }
}

/// Name resolution settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaConfig {
    /// Schema that unqualified object names belong to.
    #[serde(default = "default_schema_name")]
    pub default_schema: String,

    /// Schemas that always exist on the target and are never created or dropped.
    #[serde(default = "default_system_schemas")]
    pub system_schemas: Vec<String>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            default_schema: default_schema_name(),
            system_schemas: default_system_schemas(),
        }
    }
}

fn default_schema_name() -> String {
    "public".to_string()
}

fn default_system_schemas() -> Vec<String> {
    vec!["public".to_string(), "pg_catalog".to_string()]
}

/// Diff engine settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DiffConfig {
    /// Attach structured old/new objects to every diff entry.
    #[serde(default)]
    pub with_metadata: bool,

    /// Produce comment diffs.
    #[serde(default = "default_true")]
    pub compare_comments: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            with_metadata: false,
            compare_comments: true,
        }
    }
}

/// Migration generator settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Emit `IF EXISTS` on every DROP.
    #[serde(default = "default_true")]
    pub if_exists: bool,

    /// Append `CASCADE` to DROP TABLE / VIEW / TYPE statements.
    #[serde(default)]
    pub cascade_drops: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            if_exists: true,
            cascade_drops: false,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Expand `${VAR}` references from the environment. Unset variables are left as-is.
fn expand_env_vars(content: &str) -> String {
    let Ok(re) = regex_lite::Regex::new(r"\$\{([^}]+)\}") else {
        return content.to_string();
    };

    let mut result = content.to_string();
    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        let full_match = &cap[0];

        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(full_match, &value);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DeltaConfig::default();
        assert_eq!(config.default_schema(), "public");
        assert!(config.diff.compare_comments);
        assert!(!config.diff.with_metadata);
        assert!(config.generator.if_exists);
        assert!(!config.generator.cascade_drops);
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = DeltaConfig::from_str("").unwrap();
        assert_eq!(config, DeltaConfig::default());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [schema]
            default_schema = "app"
            system_schemas = ["app", "pg_catalog", "extensions"]

            [diff]
            with_metadata = true
            compare_comments = false

            [generator]
            if_exists = false
            cascade_drops = true
        "#;

        let config = DeltaConfig::from_str(toml).unwrap();
        assert_eq!(config.default_schema(), "app");
        assert!(config.is_system_schema("extensions"));
        assert!(!config.is_system_schema("public"));
        assert!(config.diff.with_metadata);
        assert!(!config.diff.compare_comments);
        assert!(!config.generator.if_exists);
        assert!(config.generator.cascade_drops);
    }

    #[test]
    fn test_reject_unknown_keys() {
        let result = DeltaConfig::from_str("[diff]\nignore_everything = true\n");
        assert!(matches!(result, Err(SchemaError::TomlError { .. })));
    }

    #[test]
    fn test_reject_empty_default_schema() {
        let result = DeltaConfig::from_str("[schema]\ndefault_schema = \"\"\n");
        assert!(matches!(result, Err(SchemaError::ConfigError { .. })));
    }

    #[test]
    fn test_env_var_expansion() {
        // SAFETY: variable name is unique to this test and removed afterwards
        unsafe { std::env::set_var("PGDELTA_TEST_SCHEMA", "tenant") };
        let config =
            DeltaConfig::from_str("[schema]\ndefault_schema = \"${PGDELTA_TEST_SCHEMA}\"\n")
                .unwrap();
        assert_eq!(config.default_schema(), "tenant");
        unsafe { std::env::remove_var("PGDELTA_TEST_SCHEMA") };
    }
}
