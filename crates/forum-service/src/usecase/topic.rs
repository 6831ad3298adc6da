//! # Topic Use-Case
//!
//! ## Notices
//! ```text
//! moved to another section  ──► owner:     "Your topic T was moved from section A to section B"
//! reassigned                ──► old owner: "Your topic T was assigned to user NEW"
//!                           └─► new owner: "Topic T was assigned from user OLD to you"
//! deleted                   ──► owner:     "Your topic T was removed"
//! ```

use std::sync::Arc;

use forum_core::policy::{check_content_owner, require_can_write, require_moderator};
use forum_core::{
    EntityId, ForumError, ForumResult, Pagination, PlainTopicById, Session, Topic, TopicAdd,
    TopicEdit, TopicFilters, TopicSort, UserEdit,
};
use tracing::warn;

use super::{enriched, single, Notifier};
use crate::service::{TopicService, UserService};

pub struct TopicUseCase {
    topics: Arc<TopicService>,
    users: Arc<UserService>,
    notifier: Notifier,
}

impl TopicUseCase {
    pub(crate) fn new(topics: Arc<TopicService>, users: Arc<UserService>, notifier: Notifier) -> Self {
        TopicUseCase {
            topics,
            users,
            notifier,
        }
    }

    /// Creates a topic owned by the caller.
    pub async fn add(&self, sess: &Session, mut topic: TopicAdd) -> ForumResult<Topic> {
        enriched(sess, async {
            require_can_write(sess)?;
            topic.user_id = sess.user_id;

            let id = self.topics.add(sess, topic).await?;
            if let Err(err) = self.count_topic(sess).await {
                warn!(session_id = %sess.id, user_id = sess.user_id, error = %err, "Failed to count topic");
            }
            self.fetch(sess, id).await
        })
        .await
    }

    pub async fn edit(&self, sess: &Session, edit: TopicEdit) -> ForumResult<Topic> {
        let (before, after, topic) = enriched(sess, async {
            require_can_write(sess)?;
            if edit.touches_protected() && !sess.is_moderator() {
                return Err(ForumError::forbidden());
            }

            let (fetch_section, fetch_user) = (edit.section_id.is_some(), edit.user_id.is_some());
            let lookup = move |id| PlainTopicById {
                id,
                fetch_section,
                fetch_user,
            };

            self.topics
                .do_transaction(sess, |tx| async move {
                    let id = edit.id;
                    let before = self.topics.plain_by_id(&tx, lookup(id)).await?;
                    check_content_owner(&tx, before.user_id)?;

                    self.topics.edit(&tx, edit).await?;
                    let after = self.topics.plain_by_id(&tx, lookup(id)).await?;
                    let topic = self.fetch(&tx, id).await?;
                    Ok((before, after, topic))
                })
                .await
        })
        .await?;

        if before.section_id != after.section_id {
            let text = format!(
                "Your topic {} was moved from section {} to section {}",
                after.name,
                section_name(&before),
                section_name(&after)
            );
            self.notifier.send(sess, after.user_id, text).await;
        }
        if before.user_id != after.user_id {
            let text = format!("Your topic {} was assigned to user {}", after.name, nickname(&after));
            self.notifier.send(sess, before.user_id, text).await;

            let text = format!("Topic {} was assigned from user {} to you", after.name, nickname(&before));
            self.notifier.send(sess, after.user_id, text).await;
        }

        Ok(topic)
    }

    /// Removes the topic with its posts. Moderators only.
    pub async fn delete(&self, sess: &Session, id: EntityId) -> ForumResult<()> {
        let topic = enriched(sess, async {
            require_moderator(sess)?;

            self.topics
                .do_transaction(sess, |tx| async move {
                    let topic = self.topics.plain_by_id(&tx, PlainTopicById::new(id)).await?;
                    self.topics.delete(&tx, id).await?;
                    Ok(topic)
                })
                .await
        })
        .await?;

        let text = format!("Your topic {} was removed", topic.name);
        self.notifier.send(sess, topic.user_id, text).await;
        Ok(())
    }

    pub async fn by_id(&self, sess: &Session, id: EntityId) -> ForumResult<Topic> {
        enriched(sess, self.fetch(sess, id)).await
    }

    pub async fn all(
        &self,
        sess: &Session,
        filters: TopicFilters,
        pagination: Option<Pagination>,
        sort: Option<TopicSort>,
    ) -> ForumResult<Vec<Topic>> {
        enriched(sess, self.topics.all(sess, filters, pagination, sort)).await
    }

    async fn fetch(&self, sess: &Session, id: EntityId) -> ForumResult<Topic> {
        let topics = self.topics.all(sess, TopicFilters::by_ids(vec![id]), None, None).await?;
        single(topics, "Topic", id)
    }

    /// Bumps the caller's topic counter in its own transaction.
    async fn count_topic(&self, sess: &Session) -> ForumResult<()> {
        self.users
            .do_transaction(sess, |tx| async move {
                let user = self.users.plain_by_id(&tx, tx.user_id).await?;
                let edit = UserEdit {
                    count_topics: Some(user.count_topics + 1),
                    ..UserEdit::new(user.id)
                };
                self.users.edit(&tx, edit).await
            })
            .await
    }
}

fn section_name(topic: &Topic) -> &str {
    topic.section.as_deref().map_or("", |s| s.name.as_str())
}

fn nickname(topic: &Topic) -> &str {
    topic.user.as_deref().map_or("", |u| u.nickname.as_str())
}
