//! Council membership from TOML (`[council]` section)

use council_domain::ModelId;
use serde::{Deserialize, Serialize};

/// Raw council configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCouncilConfig {
    /// Council members, in submission order
    pub models: Vec<String>,
    /// Model that writes the final answer
    pub chairman: String,
    /// Model used for conversation titles
    pub title_model: String,
}

impl Default for FileCouncilConfig {
    fn default() -> Self {
        Self {
            models: ModelId::default_council()
                .iter()
                .map(|m| m.to_string())
                .collect(),
            chairman: ModelId::default_chairman().to_string(),
            title_model: ModelId::default_title_model().to_string(),
        }
    }
}

impl FileCouncilConfig {
    /// Non-blank council entries as model ids
    pub fn model_ids(&self) -> Vec<ModelId> {
        self.models
            .iter()
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .map(ModelId::new)
            .collect()
    }

    pub fn chairman_id(&self) -> ModelId {
        ModelId::new(self.chairman.trim())
    }

    pub fn title_model_id(&self) -> ModelId {
        ModelId::new(self.title_model.trim())
    }
}
