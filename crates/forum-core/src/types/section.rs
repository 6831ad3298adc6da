//! Sections: the top level of the forum hierarchy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EntityId, SortKey, Topic};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: EntityId,
    pub name: String,
    pub description: Option<String>,
    /// Number of live topics, computed by storage.
    pub count_topics: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<Topic>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionAdd {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionEdit {
    pub id: EntityId,
    pub name: Option<String>,
    /// `Some("")` clears the description.
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionFilters {
    pub ids: Option<Vec<EntityId>>,
}

impl SectionFilters {
    pub fn by_ids(ids: Vec<EntityId>) -> Self {
        SectionFilters { ids: Some(ids) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectionSortBy {
    Name,
    CreatedAt,
}

impl SortKey for SectionSortBy {
    const CREATED_AT: Self = SectionSortBy::CreatedAt;

    fn column(self) -> &'static str {
        match self {
            SectionSortBy::Name => "name",
            SectionSortBy::CreatedAt => "created_at",
        }
    }
}

pub type SectionSort = super::Sort<SectionSortBy>;
