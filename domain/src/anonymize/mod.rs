//! Anonymization of council responses for peer review.
//!
//! Each successful Stage-1 response receives an opaque [`Label`] so that
//! reviewers rank content without knowing which model produced it. The
//! [`LabelMap`] keeps the label → model mapping for de-anonymization in the
//! final output and is never handed to the peer-review prompt builder.
//!
//! ```
//! use council_domain::anonymize::{Label, LabelMap};
//! use council_domain::ModelId;
//!
//! let models = vec![ModelId::new("openai/o1"), ModelId::new("x-ai/grok-3-beta")];
//! let map = LabelMap::from_models(&models);
//!
//! assert_eq!(map.resolve(&Label::from_index(0)), Some(&models[0]));
//! assert_eq!(map.label_for(&models[1]).map(|l| l.as_str()), Some("B"));
//! ```

use crate::core::model::ModelId;
use crate::deliberation::value_objects::ModelResponse;
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

/// Opaque label for an anonymized response ("A", "B", …, "Z", "AA", …)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(String);

impl Label {
    /// Label for the response at `index` in submission order
    pub fn from_index(index: usize) -> Self {
        let mut n = index + 1;
        let mut letters = Vec::new();
        while n > 0 {
            let rem = (n - 1) % 26;
            letters.push((b'A' + rem as u8) as char);
            n = (n - 1) / 26;
        }
        Self(letters.into_iter().rev().collect())
    }

    /// Parse a raw label token; only uppercase ASCII letters are accepted
    pub fn parse(raw: &str) -> Option<Self> {
        if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_uppercase()) {
            Some(Self(raw.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name used inside prompts, e.g. "Response A"
    pub fn display_name(&self) -> String {
        format!("Response {}", self.0)
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Shorter labels sort first so that "Z" < "AA" matches assignment order.
impl Ord for Label {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Bijective label → model mapping for one deliberation
///
/// Built once from the Stage-1 successes and never mutated afterwards.
/// Deserialization rejects malformed labels and models mapped twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LabelMap {
    entries: BTreeMap<Label, ModelId>,
}

impl LabelMap {
    /// Assign labels to successful responses in their given order
    pub fn assign(responses: &[ModelResponse]) -> Self {
        Self::from_models(responses.iter().map(|r| &r.model))
    }

    /// Assign labels to models in iteration order
    ///
    /// A model appearing more than once keeps its first label only.
    pub fn from_models<'a>(models: impl IntoIterator<Item = &'a ModelId>) -> Self {
        let mut entries = BTreeMap::new();
        let mut seen = HashSet::new();
        for model in models {
            if seen.insert(model.clone()) {
                entries.insert(Label::from_index(entries.len()), model.clone());
            }
        }
        Self { entries }
    }

    /// Resolve a label back to its model
    pub fn resolve(&self, label: &Label) -> Option<&ModelId> {
        self.entries.get(label)
    }

    /// Full label → model mapping, in label order
    pub fn resolve_all(&self) -> &BTreeMap<Label, ModelId> {
        &self.entries
    }

    /// Reverse lookup: the label assigned to a model
    pub fn label_for(&self, model: &ModelId) -> Option<&Label> {
        self.entries
            .iter()
            .find(|(_, m)| *m == model)
            .map(|(label, _)| label)
    }

    /// Labels in assignment order
    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.entries.keys()
    }

    /// Models in assignment order
    pub fn models(&self) -> impl Iterator<Item = &ModelId> {
        self.entries.values()
    }

    pub fn contains(&self, label: &Label) -> bool {
        self.entries.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TryFrom<BTreeMap<Label, ModelId>> for LabelMap {
    type Error = String;

    fn try_from(entries: BTreeMap<Label, ModelId>) -> Result<Self, Self::Error> {
        let mut seen = HashSet::new();
        for (label, model) in &entries {
            if Label::parse(label.as_str()).is_none() {
                return Err(format!("invalid label: {:?}", label.as_str()));
            }
            if !seen.insert(model) {
                return Err(format!("model {} is mapped to more than one label", model));
            }
        }
        Ok(Self { entries })
    }
}

impl<'de> Deserialize<'de> for LabelMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = BTreeMap::<Label, ModelId>::deserialize(deserializer)?;
        Self::try_from(entries).map_err(serde::de::Error::custom)
    }
}
