//! School identifier classification.
//!
//! A path identifier is either a UUID in canonical 8-4-4-4-12 form (looked
//! up by primary id) or a human-readable school code (uppercased and looked
//! up by code). Other UUID spellings (braced, URN, no hyphens) are treated
//! as codes.

use schooldesk_store::{School, SchoolStore, StoreError};
use uuid::Uuid;

use crate::error::IdentifierError;

/// Hyphen offsets of the canonical textual UUID form.
const UUID_HYPHENS: [usize; 4] = [8, 13, 18, 23];

/// A classified school identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchoolIdentifier {
    Id(Uuid),
    Code(String),
}

impl SchoolIdentifier {
    /// Classify a raw identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::Missing`] if `raw` is empty or whitespace.
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IdentifierError::Missing);
        }

        if is_canonical_uuid(trimmed) {
            if let Ok(id) = Uuid::parse_str(trimmed) {
                return Ok(Self::Id(id));
            }
        }

        Ok(Self::Code(trimmed.to_uppercase()))
    }

    /// Look the school up in `store` by id or code.
    ///
    /// # Errors
    ///
    /// Propagates any [`StoreError`] from the store.
    pub async fn resolve(&self, store: &dyn SchoolStore) -> Result<Option<School>, StoreError> {
        match self {
            Self::Id(id) => store.find_by_id(*id).await,
            Self::Code(code) => store.find_by_code(code).await,
        }
    }
}

impl std::fmt::Display for SchoolIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id:{id}"),
            Self::Code(code) => write!(f, "code:{code}"),
        }
    }
}

/// Whether `s` is exactly 8-4-4-4-12 hex digits, any case.
#[must_use]
pub fn is_canonical_uuid(s: &str) -> bool {
    s.len() == 36
        && s.char_indices().all(|(i, c)| {
            if UUID_HYPHENS.contains(&i) {
                c == '-'
            } else {
                c.is_ascii_hexdigit()
            }
        })
}
