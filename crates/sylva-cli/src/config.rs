//! Configuration file of the `sylva` binary

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use sylva_pipeline::PipelineConfig;
use sylva_transform::TransformerConfig;

/// Settings loaded through `--config`; command-line flags override them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub pipeline: PipelineConfig,
    pub transformer: TransformerConfig,
}

impl CliConfig {
    /// Read a JSON file when the extension says so, YAML otherwise
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            serde_json::from_str(&text)
                .with_context(|| format!("invalid JSON config {}", path.display()))?
        } else {
            serde_yaml::from_str(&text)
                .with_context(|| format!("invalid YAML config {}", path.display()))?
        };
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let file = config_file(".yaml", "pipeline:\n  track_positions: false\n");
        let config = CliConfig::load(file.path()).unwrap();

        assert!(!config.pipeline.track_positions);
        assert!(config.pipeline.measure_lexing_time);
        assert!(config.transformer.allow_generic_node);
    }

    #[test]
    fn test_json_by_extension() {
        let file = config_file(".json", r#"{"transformer": {"allow_generic_node": false}}"#);
        let config = CliConfig::load(file.path()).unwrap();

        assert!(!config.transformer.allow_generic_node);
        assert_eq!(config.pipeline, PipelineConfig::default());
    }

    #[test]
    fn test_invalid_file_names_the_path() {
        let file = config_file(".json", "{not json");
        let error = CliConfig::load(file.path()).unwrap_err();
        assert!(error.to_string().starts_with("invalid JSON config"));
    }
}
