//! User accounts, privilege levels and restrictions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EntityId, Post, SortKey, Topic};

// =============================================================================
// Privilege Level
// =============================================================================

/// What a user is allowed to administer.
///
/// ```text
/// None ──► Mod ──► Admin
///          │        └── sections, users, everything below
///          └── edit/delete any topic or post
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum UserLevel {
    #[default]
    None,
    Mod,
    Admin,
}

impl UserLevel {
    /// Returns true if this level grants at least `required`.
    ///
    /// `None` is never "at least" anything: requiring `None` means no
    /// privilege check applies, so callers never ask for it.
    pub fn at_least(self, required: UserLevel) -> bool {
        match required {
            UserLevel::Mod => matches!(self, UserLevel::Mod | UserLevel::Admin),
            UserLevel::Admin => self == UserLevel::Admin,
            UserLevel::None => false,
        }
    }
}

impl std::fmt::Display for UserLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UserLevel::None => "NONE",
            UserLevel::Mod => "MOD",
            UserLevel::Admin => "ADMIN",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Restriction
// =============================================================================

/// What a user is prevented from doing, independent of privilege.
///
/// `Banned` implies `ReadOnly`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRestriction {
    #[default]
    None,
    ReadOnly,
    Banned,
}

impl UserRestriction {
    /// Returns true if this restriction is at least as strict as `required`.
    pub fn at_least(self, required: UserRestriction) -> bool {
        match required {
            UserRestriction::ReadOnly => {
                matches!(self, UserRestriction::ReadOnly | UserRestriction::Banned)
            }
            UserRestriction::Banned => self == UserRestriction::Banned,
            UserRestriction::None => false,
        }
    }
}

impl std::fmt::Display for UserRestriction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UserRestriction::None => "NONE",
            UserRestriction::ReadOnly => "READONLY",
            UserRestriction::Banned => "BANNED",
        };
        f.write_str(s)
    }
}

// =============================================================================
// User
// =============================================================================

/// Secondary, optionally private information about a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl UserInfo {
    pub fn is_empty(&self) -> bool {
        self.phone.is_none()
            && self.email.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
    }
}

/// A registered forum member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    pub nickname: String,
    /// Whether `info` is visible to other members.
    pub show_info: bool,
    pub rank: i64,
    pub level: UserLevel,
    pub restriction: UserRestriction,
    pub count_topics: i64,
    pub count_posts: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Present only when `user_info` was requested and visible to the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<UserInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<Topic>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub posts: Vec<Post>,
}

impl User {
    /// Posts left before the next rank: `rank * posts_per_rank - count_posts`.
    pub fn posts_until_next_rank(&self, posts_per_rank: i64) -> i64 {
        self.rank * posts_per_rank - self.count_posts
    }

    /// Returns true if one more post reaches the next rank threshold.
    pub fn next_post_promotes(&self, posts_per_rank: i64) -> bool {
        self.posts_until_next_rank(posts_per_rank) == 1
    }
}

// =============================================================================
// Inputs
// =============================================================================

/// Registration input. `password` is plaintext until the service hashes it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserAdd {
    pub nickname: String,
    pub password: String,
    pub show_info: bool,
    #[serde(default)]
    pub info: UserInfo,
}

/// Sparse update: only `Some` fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserEdit {
    pub id: EntityId,
    pub nickname: Option<String>,
    pub password: Option<String>,
    pub show_info: Option<bool>,
    pub rank: Option<i64>,
    pub count_topics: Option<i64>,
    pub count_posts: Option<i64>,
    pub level: Option<UserLevel>,
    pub restriction: Option<UserRestriction>,
    pub info: Option<UserInfo>,
}

impl UserEdit {
    pub fn new(id: EntityId) -> Self {
        UserEdit {
            id,
            ..Default::default()
        }
    }

    /// Returns true if any administrator-only field is being changed.
    pub fn touches_protected(&self) -> bool {
        self.rank.is_some()
            || self.count_topics.is_some()
            || self.count_posts.is_some()
            || self.level.is_some()
            || self.restriction.is_some()
    }
}

/// Listing filters. Absent fields do not participate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFilters {
    pub ids: Option<Vec<EntityId>>,
    pub rank_from: Option<i64>,
    pub rank_to: Option<i64>,
    pub level: Option<UserLevel>,
    pub restriction: Option<UserRestriction>,
    pub count_posts_from: Option<i64>,
    pub count_posts_to: Option<i64>,
}

impl UserFilters {
    pub fn by_ids(ids: Vec<EntityId>) -> Self {
        UserFilters {
            ids: Some(ids),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserSortBy {
    Rank,
    CountPosts,
    CountTopics,
    CreatedAt,
}

impl SortKey for UserSortBy {
    const CREATED_AT: Self = UserSortBy::CreatedAt;

    fn column(self) -> &'static str {
        match self {
            UserSortBy::Rank => "rank",
            UserSortBy::CountPosts => "count_posts",
            UserSortBy::CountTopics => "count_topics",
            UserSortBy::CreatedAt => "created_at",
        }
    }
}

pub type UserSort = super::Sort<UserSortBy>;

// =============================================================================
// Unit Tests
// =============================================================================
