use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Classifier output index to emotion name. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    labels: Vec<String>,
}

/// On-disk forms of the label artifact: Keras `class_indices`
/// (`{"happy": 0, ...}`) or a list in index order.
#[derive(Deserialize)]
#[serde(untagged)]
enum LabelArtifact {
    ClassIndices(HashMap<String, usize>),
    Ordered(Vec<String>),
}

impl LabelMap {
    pub fn new<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> Result<Self> {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        Self::checked(labels).map_err(|reason| Error::artifact("<labels>", reason))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Error::artifact(path, e))?;
        let map = Self::parse(&raw).map_err(|reason| Error::artifact(path, reason))?;
        log::info!(
            "loaded {} labels from {}: {:?}",
            map.len(),
            path.display(),
            map.labels
        );
        Ok(map)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Self::parse(raw).map_err(|reason| Error::artifact("<json>", reason))
    }

    fn parse(raw: &str) -> std::result::Result<Self, String> {
        let artifact: LabelArtifact = serde_json::from_str(raw).map_err(|e| e.to_string())?;
        match artifact {
            LabelArtifact::Ordered(labels) => Self::checked(labels),
            LabelArtifact::ClassIndices(indices) => {
                let mut slots: Vec<Option<String>> = vec![None; indices.len()];
                for (label, index) in indices {
                    let slot = slots
                        .get_mut(index)
                        .ok_or_else(|| format!("index {index} for {label:?} is out of range"))?;
                    if let Some(existing) = slot {
                        return Err(format!("index {index} used by {existing:?} and {label:?}"));
                    }
                    *slot = Some(label);
                }
                // Every slot is filled: indices are distinct and all < len.
                Self::checked(slots.into_iter().flatten().collect())
            }
        }
    }

    fn checked(labels: Vec<String>) -> std::result::Result<Self, String> {
        if labels.is_empty() {
            return Err("label map is empty".to_string());
        }
        let mut seen = HashSet::new();
        for label in &labels {
            if !seen.insert(label.as_str()) {
                return Err(format!("label {label:?} appears more than once"));
            }
        }
        Ok(Self { labels })
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.labels.iter().map(String::as_str).enumerate()
    }
}
