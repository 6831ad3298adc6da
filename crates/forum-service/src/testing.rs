//! Test harness: a fully wired [`Forum`] over in-memory SQLite.

use std::sync::Arc;

use forum_core::ports::CredentialHasher;
use forum_core::{EntityId, ForumResult, PostAdd, SectionAdd, Session};
use forum_db::{Database, DbConfig};

use crate::config::ForumConfig;
use crate::forum::Forum;

pub(crate) const PASSWORD: &str = "correct horse";

/// Reversible stand-in for argon2, fast enough for every test.
pub(crate) struct PlainHasher;

impl CredentialHasher for PlainHasher {
    fn hash(&self, password: &str) -> ForumResult<String> {
        Ok(format!("plain:{}", password))
    }

    fn verify(&self, digest: &str, password: &str) -> bool {
        digest.strip_prefix("plain:") == Some(password)
    }
}

pub(crate) async fn forum() -> Forum {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    Forum::new(&db, Arc::new(PlainHasher), ForumConfig::default())
}

pub(crate) async fn section(forum: &Forum, admin: &Session, name: &str) -> EntityId {
    forum
        .sections()
        .add(
            admin,
            SectionAdd {
                name: name.to_string(),
                description: None,
            },
        )
        .await
        .unwrap()
        .id
}

pub(crate) async fn post(forum: &Forum, author: &Session, topic_id: EntityId, text: &str) -> EntityId {
    forum
        .posts()
        .add(
            author,
            PostAdd {
                topic_id,
                user_id: 0,
                text: text.to_string(),
            },
        )
        .await
        .unwrap()
        .id
}
