//! Selecting catalog entries by id

use glob::Pattern;
use wardrobe_core::{Result, WardrobeError};
use wardrobe_schema::WearableEntity;

#[derive(Debug, Clone)]
enum IdPattern {
    Exact(String),
    Glob(Pattern),
}

impl IdPattern {
    fn matches(&self, id: &str) -> bool {
        match self {
            IdPattern::Exact(exact) => exact == id,
            IdPattern::Glob(pattern) => pattern.matches(id),
        }
    }
}

/// Patterns an entity id must match one of. A pattern containing `*` is a
/// glob; anything else must match exactly.
#[derive(Debug, Clone)]
pub struct IdFilter {
    patterns: Vec<IdPattern>,
}

impl IdFilter {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        if patterns.is_empty() {
            return Err(WardrobeError::Config(
                "at least one id must be specified".to_string(),
            ));
        }
        let patterns = patterns
            .iter()
            .map(|p| {
                let p = p.as_ref();
                if p.contains('*') {
                    Pattern::new(p).map(IdPattern::Glob).map_err(|e| {
                        WardrobeError::Config(format!("invalid id pattern '{}': {}", p, e))
                    })
                } else {
                    Ok(IdPattern::Exact(p.to_string()))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn matches(&self, id: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(id))
    }

    /// Matches against both the canonical and the legacy id
    pub fn matches_entity(&self, entity: &WearableEntity) -> bool {
        self.matches(&entity.id) || self.matches(&entity.legacy_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_glob() {
        let filter = IdFilter::new(&["dcl://base-avatars/*", "urn:decentraland:off-chain:x:cap"]).unwrap();
        assert!(filter.matches("dcl://base-avatars/eyebrows_00"));
        assert!(filter.matches("urn:decentraland:off-chain:x:cap"));
        assert!(!filter.matches("urn:decentraland:off-chain:x:cap2"));
        assert!(!filter.matches("dcl://xmas_2019/F_BlueStar"));
    }

    #[test]
    fn test_glob_spans_separators() {
        let filter = IdFilter::new(&["urn:decentraland:*:xmas_2019:*"]).unwrap();
        assert!(filter.matches("urn:decentraland:ethereum:collections-v1:xmas_2019:F_BlueStar"));
    }

    #[test]
    fn test_requires_a_pattern() {
        let none: [&str; 0] = [];
        assert!(IdFilter::new(&none).is_err());
    }

    #[test]
    fn test_invalid_glob() {
        assert!(IdFilter::new(&["dcl://[*"]).is_err());
    }
}
