//! Cache key normalization.

use std::fmt;

use crate::domain::error::DomainError;

/// Normalized drug name used to address both the memory and the disk cache.
///
/// Only alphanumerics, spaces and underscores survive; the result is trimmed
/// and lowercased. Distinct spellings that normalize identically share one
/// entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn normalize(drug_name: &str) -> Result<Self, DomainError> {
        let kept: String = drug_name
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '_')
            .collect();
        let key = kept.trim().to_lowercase();
        if key.is_empty() {
            return Err(DomainError::validation(
                "drug name must contain at least one letter or digit",
            ));
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
