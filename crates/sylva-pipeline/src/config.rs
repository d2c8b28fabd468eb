//! Pipeline configuration

use serde::{Deserialize, Serialize};

/// Options of a parsing run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Keep origins and positions on the AST
    pub track_positions: bool,
    /// Time the lexing phase separately
    pub measure_lexing_time: bool,
    /// `lex` drops tokens off the default channel
    pub only_default_channel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            track_positions: true,
            measure_lexing_time: true,
            only_default_channel: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert!(config.track_positions);
        assert!(config.measure_lexing_time);
        assert!(config.only_default_channel);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: PipelineConfig =
            serde_yaml::from_str("track_positions: false").unwrap();
        assert!(!config.track_positions);
        assert!(config.measure_lexing_time);

        let json: PipelineConfig = serde_json::from_str(r#"{"only_default_channel": false}"#).unwrap();
        assert!(!json.only_default_channel);
        assert!(json.track_positions);
    }
}
