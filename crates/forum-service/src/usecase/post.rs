//! # Post Use-Case
//!
//! Adding a post also advances its author toward the next rank.
//!
//! ## Rank Progression
//! ```text
//! posts_per_rank = 50
//!
//!   rank 1, count_posts 49 ──► add post ──► rank 2, count_posts 50
//!                                           └── "You achieved the rank 2, congratulations!"
//!
//!   promotion happens iff rank * posts_per_rank - count_posts == 1
//!   before the increment.
//! ```
//!
//! The counter update runs in its own transaction after the post commits.
//! A failed counter update is logged and does not fail the post.

use std::sync::Arc;

use forum_core::policy::{check_content_owner, require_can_write, require_moderator};
use forum_core::{
    EntityId, ForumError, ForumResult, Pagination, PlainPostById, Post, PostAdd, PostEdit,
    PostFilters, PostSort, Session, UserEdit,
};
use tracing::{info, warn};

use super::{enriched, single, Notifier};
use crate::config::ForumConfig;
use crate::service::{PostService, UserService};

pub struct PostUseCase {
    posts: Arc<PostService>,
    users: Arc<UserService>,
    notifier: Notifier,
    config: Arc<ForumConfig>,
}

impl PostUseCase {
    pub(crate) fn new(
        posts: Arc<PostService>,
        users: Arc<UserService>,
        notifier: Notifier,
        config: Arc<ForumConfig>,
    ) -> Self {
        PostUseCase {
            posts,
            users,
            notifier,
            config,
        }
    }

    /// Creates a post owned by the caller.
    pub async fn add(&self, sess: &Session, mut post: PostAdd) -> ForumResult<Post> {
        enriched(sess, async {
            require_can_write(sess)?;
            post.user_id = sess.user_id;

            let id = self.posts.add(sess, post).await?;

            match self.count_post(sess).await {
                Ok(Some(rank)) => {
                    info!(session_id = %sess.id, user_id = sess.user_id, rank, "Rank achieved");
                    let text = format!("You achieved the rank {}, congratulations!", rank);
                    self.notifier.send(sess, sess.user_id, text).await;
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(session_id = %sess.id, user_id = sess.user_id, error = %err, "Failed to count post");
                }
            }

            self.fetch(sess, id).await
        })
        .await
    }

    pub async fn edit(&self, sess: &Session, edit: PostEdit) -> ForumResult<Post> {
        let (before, after, post) = enriched(sess, async {
            require_can_write(sess)?;
            if edit.touches_protected() && !sess.is_moderator() {
                return Err(ForumError::forbidden());
            }

            let (fetch_topic, fetch_user) = (edit.topic_id.is_some(), edit.user_id.is_some());
            let lookup = move |id| PlainPostById {
                id,
                fetch_topic,
                fetch_user,
            };

            self.posts
                .do_transaction(sess, |tx| async move {
                    let id = edit.id;
                    let before = self.posts.plain_by_id(&tx, lookup(id)).await?;
                    check_content_owner(&tx, before.user_id)?;

                    self.posts.edit(&tx, edit).await?;
                    let after = self.posts.plain_by_id(&tx, lookup(id)).await?;
                    let post = self.fetch(&tx, id).await?;
                    Ok((before, after, post))
                })
                .await
        })
        .await?;

        if before.topic_id != after.topic_id {
            let text = format!(
                "Your post #{} was moved from topic {} to topic {}",
                after.id,
                topic_name(&before),
                topic_name(&after)
            );
            self.notifier.send(sess, after.user_id, text).await;
        }
        if before.user_id != after.user_id {
            let text = format!("Your post #{} was assigned to user {}", after.id, nickname(&after));
            self.notifier.send(sess, before.user_id, text).await;

            let text = format!("Post #{} was assigned from user {} to you", after.id, nickname(&before));
            self.notifier.send(sess, after.user_id, text).await;
        }

        Ok(post)
    }

    /// Moderators only.
    pub async fn delete(&self, sess: &Session, id: EntityId) -> ForumResult<()> {
        let post = enriched(sess, async {
            require_moderator(sess)?;

            self.posts
                .do_transaction(sess, |tx| async move {
                    let post = self.posts.plain_by_id(&tx, PlainPostById::new(id)).await?;
                    self.posts.delete(&tx, id).await?;
                    Ok(post)
                })
                .await
        })
        .await?;

        let text = format!("Your post #{} was removed", post.id);
        self.notifier.send(sess, post.user_id, text).await;
        Ok(())
    }

    pub async fn by_id(&self, sess: &Session, id: EntityId) -> ForumResult<Post> {
        enriched(sess, self.fetch(sess, id)).await
    }

    pub async fn all(
        &self,
        sess: &Session,
        filters: PostFilters,
        pagination: Option<Pagination>,
        sort: Option<PostSort>,
    ) -> ForumResult<Vec<Post>> {
        enriched(sess, self.posts.all(sess, filters, pagination, sort)).await
    }

    async fn fetch(&self, sess: &Session, id: EntityId) -> ForumResult<Post> {
        let posts = self.posts.all(sess, PostFilters::by_ids(vec![id]), None, None).await?;
        single(posts, "Post", id)
    }

    /// Increments the caller's post counter, returning the new rank on promotion.
    async fn count_post(&self, sess: &Session) -> ForumResult<Option<i64>> {
        let posts_per_rank = self.config.posts_per_rank;

        self.users
            .do_transaction(sess, |tx| async move {
                let user = self.users.plain_by_id(&tx, tx.user_id).await?;
                let promoted = user
                    .next_post_promotes(posts_per_rank)
                    .then_some(user.rank + 1);

                let edit = UserEdit {
                    count_posts: Some(user.count_posts + 1),
                    rank: promoted,
                    ..UserEdit::new(user.id)
                };
                self.users.edit(&tx, edit).await?;
                Ok(promoted)
            })
            .await
    }
}

fn topic_name(post: &Post) -> &str {
    post.topic.as_deref().map_or("", |t| t.name.as_str())
}

fn nickname(post: &Post) -> &str {
    post.user.as_deref().map_or("", |u| u.nickname.as_str())
}
