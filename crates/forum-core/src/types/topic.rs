//! Topics: discussion threads inside a section.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EntityId, Post, Section, SortKey, User};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: EntityId,
    pub section_id: EntityId,
    pub user_id: EntityId,
    pub name: String,
    /// Number of live posts, computed by storage.
    pub count_posts: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<Box<Section>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Box<User>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub posts: Vec<Post>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicAdd {
    pub section_id: EntityId,
    /// Overwritten with the caller's id by the use-case.
    pub user_id: EntityId,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicEdit {
    pub id: EntityId,
    pub section_id: Option<EntityId>,
    pub user_id: Option<EntityId>,
    pub name: Option<String>,
}

impl TopicEdit {
    /// Returns true if the edit changes ownership or placement.
    pub fn touches_protected(&self) -> bool {
        self.section_id.is_some() || self.user_id.is_some()
    }
}

/// Listing filters, also used to select topics for mass deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicFilters {
    pub ids: Option<Vec<EntityId>>,
    pub section_ids: Option<Vec<EntityId>>,
    pub user_ids: Option<Vec<EntityId>>,
}

impl TopicFilters {
    pub fn by_ids(ids: Vec<EntityId>) -> Self {
        TopicFilters {
            ids: Some(ids),
            ..Default::default()
        }
    }

    pub fn by_section_ids(section_ids: Vec<EntityId>) -> Self {
        TopicFilters {
            section_ids: Some(section_ids),
            ..Default::default()
        }
    }

    pub fn by_user_ids(user_ids: Vec<EntityId>) -> Self {
        TopicFilters {
            user_ids: Some(user_ids),
            ..Default::default()
        }
    }

    /// The explicit id set, if ids are the only criterion.
    pub fn only_ids(&self) -> Option<&[EntityId]> {
        match (&self.ids, &self.section_ids, &self.user_ids) {
            (Some(ids), None, None) => Some(ids),
            _ => None,
        }
    }

    /// Returns true if no criterion is set.
    pub fn is_empty(&self) -> bool {
        self.ids.is_none() && self.section_ids.is_none() && self.user_ids.is_none()
    }
}

/// Mass deletion takes either explicit ids or owner filters.
pub type TopicDelete = TopicFilters;

/// By-id lookup that attaches exactly the flagged relations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlainTopicById {
    pub id: EntityId,
    pub fetch_section: bool,
    pub fetch_user: bool,
}

impl PlainTopicById {
    pub fn new(id: EntityId) -> Self {
        PlainTopicById {
            id,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TopicSortBy {
    Name,
    CountPosts,
    CreatedAt,
}

impl SortKey for TopicSortBy {
    const CREATED_AT: Self = TopicSortBy::CreatedAt;

    fn column(self) -> &'static str {
        match self {
            TopicSortBy::Name => "name",
            TopicSortBy::CountPosts => "count_posts",
            TopicSortBy::CreatedAt => "created_at",
        }
    }
}

pub type TopicSort = super::Sort<TopicSortBy>;
