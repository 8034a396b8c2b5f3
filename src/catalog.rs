use crate::error::CatalogError;
use itertools::Itertools;

pub const DEFAULT_CHALLENGES: [&str; 7] =
    ["grin", "angry", "shush", "peek", "kiss", "tongue", "scream"];

/// Ordered, immutable set of challenge identifiers for a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeCatalog {
    ids: Vec<String>,
}

impl ChallengeCatalog {
    pub fn new<I, S>(ids: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        if ids.is_empty() {
            return Err(CatalogError::Empty);
        }
        if let Some(dup) = ids.iter().duplicates().next() {
            return Err(CatalogError::Duplicate(dup.clone()));
        }
        Ok(Self { ids })
    }

    /// Parse a classifier labels file where each line reads `<index> <label>`.
    pub fn from_labels(text: &str) -> Result<Self, CatalogError> {
        let mut ids = Vec::new();
        for (n, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some(_index), Some(label)) => ids.push(label.to_string()),
                _ => {
                    return Err(CatalogError::MalformedLabels {
                        line: n + 1,
                        content: line.to_string(),
                    })
                }
            }
        }
        Self::new(ids)
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl Default for ChallengeCatalog {
    fn default() -> Self {
        Self {
            ids: DEFAULT_CHALLENGES.iter().map(|s| s.to_string()).collect(),
        }
    }
}
