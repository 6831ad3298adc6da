//! Posts: messages inside a topic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EntityId, SortKey, Topic, User};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: EntityId,
    pub topic_id: EntityId,
    pub user_id: EntityId,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<Box<Topic>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Box<User>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostAdd {
    pub topic_id: EntityId,
    /// Overwritten with the caller's id by the use-case.
    pub user_id: EntityId,
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostEdit {
    pub id: EntityId,
    pub topic_id: Option<EntityId>,
    pub user_id: Option<EntityId>,
    pub text: Option<String>,
}

impl PostEdit {
    /// Returns true if the edit changes ownership or placement.
    pub fn touches_protected(&self) -> bool {
        self.topic_id.is_some() || self.user_id.is_some()
    }
}

/// Listing filters, also used to select posts for mass deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostFilters {
    pub ids: Option<Vec<EntityId>>,
    pub topic_ids: Option<Vec<EntityId>>,
    pub user_ids: Option<Vec<EntityId>>,
}

impl PostFilters {
    pub fn by_ids(ids: Vec<EntityId>) -> Self {
        PostFilters {
            ids: Some(ids),
            ..Default::default()
        }
    }

    pub fn by_topic_ids(topic_ids: Vec<EntityId>) -> Self {
        PostFilters {
            topic_ids: Some(topic_ids),
            ..Default::default()
        }
    }

    pub fn by_user_ids(user_ids: Vec<EntityId>) -> Self {
        PostFilters {
            user_ids: Some(user_ids),
            ..Default::default()
        }
    }

    /// The explicit id set, if ids are the only criterion.
    pub fn only_ids(&self) -> Option<&[EntityId]> {
        match (&self.ids, &self.topic_ids, &self.user_ids) {
            (Some(ids), None, None) => Some(ids),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_none() && self.topic_ids.is_none() && self.user_ids.is_none()
    }
}

pub type PostDelete = PostFilters;

/// By-id lookup that attaches exactly the flagged relations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlainPostById {
    pub id: EntityId,
    pub fetch_topic: bool,
    pub fetch_user: bool,
}

impl PlainPostById {
    pub fn new(id: EntityId) -> Self {
        PlainPostById {
            id,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostSortBy {
    CreatedAt,
}

impl SortKey for PostSortBy {
    const CREATED_AT: Self = PostSortBy::CreatedAt;

    fn column(self) -> &'static str {
        match self {
            PostSortBy::CreatedAt => "created_at",
        }
    }
}

pub type PostSort = super::Sort<PostSortBy>;
