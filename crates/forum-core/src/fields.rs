//! # Requested-Field Tree
//!
//! Which relations the caller actually asked for, so services only fetch
//! what will be returned.
//!
//! ## Shape
//! ```text
//! query { topics { name user { nickname } posts { text user { nickname } } } }
//!
//!   ┌──────────┐
//!   │ (root)   │  ← session.requested_fields for Topic::all
//!   └────┬─────┘
//!        ├── "name"   → {}
//!        ├── "user"   → { "nickname" → {} }
//!        └── "posts"  → { "text" → {}, "user" → { "nickname" → {} } }
//! ```
//!
//! A leaf is an empty sub-tree. The topic service sees `user` and `posts`,
//! fetches both in one batch each, and hands `posts`'s sub-tree down to the
//! post service so it can decide about `user` on its own.

use std::collections::BTreeMap;
use std::ops::Index;

use serde::{Deserialize, Serialize};

/// Relation keys services look for.
pub mod keys {
    pub const USER: &str = "user";
    pub const TOPIC: &str = "topic";
    pub const SECTION: &str = "section";
    pub const POSTS: &str = "posts";
    pub const TOPICS: &str = "topics";
    pub const USER_INFO: &str = "user_info";
}

static EMPTY: RequestedFields = RequestedFields(BTreeMap::new());

/// Recursive field-name → sub-tree mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestedFields(BTreeMap<String, RequestedFields>);

impl RequestedFields {
    pub fn new() -> Self {
        RequestedFields::default()
    }

    /// Builds a tree from dotted paths: `["user", "posts.user.user_info"]`.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = RequestedFields::new();
        for path in paths {
            tree.put_path(path.as_ref());
        }
        tree
    }

    /// Returns true if any of `names` is a top-level key.
    pub fn contains_any(&self, names: &[&str]) -> bool {
        names.iter().any(|name| self.0.contains_key(*name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Sub-tree for `name`, empty when absent.
    pub fn get(&self, name: &str) -> &RequestedFields {
        self.0.get(name).unwrap_or(&EMPTY)
    }

    /// Inserts a leaf for `name`, keeping an existing sub-tree.
    pub fn put(&mut self, name: impl Into<String>) -> &mut RequestedFields {
        self.0.entry(name.into()).or_default()
    }

    /// Inserts every segment of a dotted path.
    pub fn put_path(&mut self, path: &str) {
        let mut node = self;
        for segment in path.split('.').map(str::trim).filter(|s| !s.is_empty()) {
            node = node.put(segment);
        }
    }

    /// Replaces the sub-tree for `name`.
    pub fn insert(&mut self, name: impl Into<String>, sub: RequestedFields) {
        self.0.insert(name.into(), sub);
    }

    pub fn remove(&mut self, name: &str) -> Option<RequestedFields> {
        self.0.remove(name)
    }

    /// Shallow union: later trees overwrite earlier ones key-for-key.
    pub fn merge<'a>(trees: impl IntoIterator<Item = &'a RequestedFields>) -> RequestedFields {
        let mut merged = RequestedFields::new();
        for tree in trees {
            for (name, sub) in &tree.0 {
                merged.0.insert(name.clone(), sub.clone());
            }
        }
        merged
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl Index<&str> for RequestedFields {
    type Output = RequestedFields;

    fn index(&self, name: &str) -> &RequestedFields {
        self.get(name)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_any() {
        let tree = RequestedFields::from_paths(["user", "posts.text"]);

        assert!(tree.contains_any(&[keys::TOPIC, keys::USER]));
        assert!(!tree.contains_any(&[keys::TOPIC, keys::SECTION]));
        assert!(!tree.contains_any(&["text"]));
    }

    #[test]
    fn test_index_returns_sub_tree() {
        let tree = RequestedFields::from_paths(["posts.user.user_info", "posts.text"]);

        let posts = &tree[keys::POSTS];
        assert!(posts.contains(keys::USER));
        assert!(posts.contains("text"));
        assert!(posts[keys::USER].contains(keys::USER_INFO));

        assert!(tree["missing"].is_empty());
        assert!(tree["missing"]["deeper"].is_empty());
    }

    #[test]
    fn test_merge_is_shallow_later_wins() {
        let first = RequestedFields::from_paths(["user.user_info", "topic"]);
        let second = RequestedFields::from_paths(["user.posts"]);

        let merged = RequestedFields::merge([&first, &second]);

        assert!(merged.contains(keys::TOPIC));
        assert!(merged[keys::USER].contains(keys::POSTS));
        assert!(!merged[keys::USER].contains(keys::USER_INFO));
    }

    #[test]
    fn test_put_keeps_existing_sub_tree() {
        let mut tree = RequestedFields::from_paths(["user.user_info"]);
        tree.put(keys::USER);

        assert!(tree[keys::USER].contains(keys::USER_INFO));
    }

    #[test]
    fn test_serde_is_plain_map() {
        let tree = RequestedFields::from_paths(["user.nickname"]);
        let json = serde_json::to_string(&tree).unwrap();

        assert_eq!(json, r#"{"user":{"nickname":{}}}"#);
    }
}
