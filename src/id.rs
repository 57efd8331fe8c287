//! Time-ordered identifiers built on ULID.

use ulid::Ulid;

/// ID prefix types for different entities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPrefix {
    Progress,
}

impl IdPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdPrefix::Progress => "prg",
        }
    }
}

/// Generate an ascending (chronologically ordered) ID
pub fn ascending(prefix: IdPrefix) -> String {
    format!("{}_{}", prefix.as_str(), Ulid::new().to_string().to_lowercase())
}
