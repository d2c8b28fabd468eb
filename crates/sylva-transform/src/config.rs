//! Transformer configuration

use serde::{Deserialize, Serialize};

/// Configuration for a [`crate::Transformer`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformerConfig {
    /// Substitute placeholder and error nodes instead of failing on
    /// unmapped source types and failing constructors
    pub allow_generic_node: bool,
}

impl Default for TransformerConfig {
    fn default() -> Self {
        Self {
            allow_generic_node: true,
        }
    }
}
