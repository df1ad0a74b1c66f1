//! Content kinds mapped to index collections.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RagError;

/// Kind of reference material stored in one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Books,
    Docs,
    Articles,
    Pdfs,
}

impl CollectionKind {
    /// Every kind, in search fan-out order.
    pub const ALL: [Self; 4] = [Self::Books, Self::Docs, Self::Articles, Self::Pdfs];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Books => "books",
            Self::Docs => "docs",
            Self::Articles => "articles",
            Self::Pdfs => "pdfs",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionKind {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "books" => Ok(Self::Books),
            "docs" => Ok(Self::Docs),
            "articles" => Ok(Self::Articles),
            "pdfs" => Ok(Self::Pdfs),
            other => Err(RagError::InvalidArgument(format!("unknown collection kind '{other}'"))),
        }
    }
}
