//! The fixed set of content collections.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A named collection inside a [`Dataset`](crate::Dataset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Batches,
    Subjects,
    Lectures,
    Notes,
    /// Daily practice problems.
    Dpps,
    Students,
}

impl Collection {
    /// Every collection, in the order they are serialized.
    pub const ALL: [Collection; 6] = [
        Collection::Batches,
        Collection::Subjects,
        Collection::Lectures,
        Collection::Notes,
        Collection::Dpps,
        Collection::Students,
    ];

    /// The key this collection is stored under in the serialized document.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Batches => "batches",
            Self::Subjects => "subjects",
            Self::Lectures => "lectures",
            Self::Notes => "notes",
            Self::Dpps => "dpps",
            Self::Students => "students",
        }
    }

    /// Prefix used for generated record ids (`batch_...`, `note_...`).
    #[must_use]
    pub const fn id_prefix(self) -> &'static str {
        match self {
            Self::Batches => "batch",
            Self::Subjects => "subject",
            Self::Lectures => "lecture",
            Self::Notes => "note",
            Self::Dpps => "dpp",
            Self::Students => "student",
        }
    }

    /// Generates a fresh record id for this collection.
    ///
    /// Ids are time-ordered (UUID v7), so records created later sort later.
    #[must_use]
    pub fn new_record_id(self) -> String {
        format!("{}_{}", self.id_prefix(), Uuid::now_v7().simple())
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Collection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.key() == wanted || c.id_prefix() == wanted)
            .ok_or_else(|| Error::UnknownCollection(s.to_string()))
    }
}
