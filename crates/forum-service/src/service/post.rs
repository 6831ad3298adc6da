//! Post service: the leaves of the hierarchy. Deleting posts cascades nowhere.

use std::future::Future;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use forum_core::fields::keys;
use forum_core::ports::PostStorage;
use forum_core::validation::{validate_id_list, validate_pagination, validate_post_text};
use forum_core::{
    EntityId, ForumResult, Pagination, PlainPostById, PlainTopicById, Post, PostAdd, PostDelete,
    PostEdit, PostFilters, PostSort, Session, TopicFilters, UserFilters, unique_ids,
};
use tracing::debug;

use super::{by_id, missing_reference, non_empty};
use crate::adapters::{PostAdapter, Sibling, TopicAdapter, UserAdapter, EVERYTHING};
use crate::config::ForumConfig;
use crate::transaction;

pub struct PostService {
    storage: Arc<dyn PostStorage>,
    config: Arc<ForumConfig>,
    users: Sibling<dyn UserAdapter>,
    topics: Sibling<dyn TopicAdapter>,
}

impl PostService {
    pub fn new(storage: Arc<dyn PostStorage>, config: Arc<ForumConfig>) -> Self {
        PostService {
            storage,
            config,
            users: Sibling::new("User"),
            topics: Sibling::new("Topic"),
        }
    }

    pub fn attach(&self, users: Weak<dyn UserAdapter>, topics: Weak<dyn TopicAdapter>) {
        self.users.attach(users);
        self.topics.attach(topics);
    }

    pub async fn do_transaction<T, F, Fut>(&self, sess: &Session, body: F) -> ForumResult<T>
    where
        F: FnOnce(Session) -> Fut,
        Fut: Future<Output = ForumResult<T>>,
    {
        transaction::do_transaction(&*self.storage, sess, body).await
    }

    pub async fn add(&self, sess: &Session, mut post: PostAdd) -> ForumResult<EntityId> {
        post.text = validate_post_text(&post.text)?;

        self.do_transaction(sess, |tx| {
            let post = &post;
            async move {
                self.topics.get()?.exists_by_id(&tx, post.topic_id).await?;
                self.users.get()?.exists_by_id(&tx, post.user_id).await?;
                self.storage.insert(&tx, post).await
            }
        })
        .await
    }

    pub async fn edit(&self, sess: &Session, mut edit: PostEdit) -> ForumResult<()> {
        edit.text = edit.text.as_deref().map(validate_post_text).transpose()?;

        self.do_transaction(sess, |tx| {
            let edit = &edit;
            async move {
                self.exists_by_id(&tx, edit.id).await?;
                if let Some(topic_id) = edit.topic_id {
                    self.topics.get()?.exists_by_id(&tx, topic_id).await?;
                }
                if let Some(user_id) = edit.user_id {
                    self.users.get()?.exists_by_id(&tx, user_id).await?;
                }
                self.storage.update(&tx, edit).await
            }
        })
        .await
    }

    pub async fn delete(&self, sess: &Session, id: EntityId) -> ForumResult<()> {
        self.do_transaction(sess, |tx| async move {
            self.exists_by_id(&tx, id).await?;
            self.storage.delete(&tx, &[id]).await
        })
        .await
    }

    pub async fn mass_delete(&self, sess: &Session, filter: &PostDelete) -> ForumResult<()> {
        self.do_transaction(sess, |tx| async move {
            let ids = match filter.only_ids() {
                Some(ids) => ids.to_vec(),
                None => self.storage.ids_to_delete(&tx, filter).await?,
            };
            if ids.is_empty() {
                return Ok(());
            }

            debug!(session_id = %tx.id, count = ids.len(), "Mass deleting posts");
            self.storage.delete(&tx, &ids).await
        })
        .await
    }

    pub async fn all(
        &self,
        sess: &Session,
        filters: PostFilters,
        pagination: Option<Pagination>,
        sort: Option<PostSort>,
    ) -> ForumResult<Vec<Post>> {
        let pagination = self.config.pagination_or_default(pagination);
        let sort = self.config.sort_or_default(sort);
        validate_pagination(&pagination, self.config.max_page_limit)?;
        let max = self.config.max_ids();
        validate_id_list("IDs", filters.ids.as_ref(), max)?;
        validate_id_list("TopicIDs", filters.topic_ids.as_ref(), max)?;
        validate_id_list("UserIDs", filters.user_ids.as_ref(), max)?;

        self.do_transaction(sess, |tx| {
            let filters = &filters;
            async move {
                let posts = self.select(&tx, filters, pagination, sort).await?;
                non_empty(posts, "Posts not found")
            }
        })
        .await
    }

    pub async fn plain_by_id(&self, sess: &Session, query: PlainPostById) -> ForumResult<Post> {
        self.do_transaction(sess, |tx| async move {
            let mut post = self.storage.select_by_id(&tx, query.id).await?;

            if query.fetch_topic {
                let topic = self
                    .topics
                    .get()?
                    .plain_by_id(&tx, PlainTopicById::new(post.topic_id))
                    .await?;
                post.topic = Some(Box::new(topic));
            }
            if query.fetch_user {
                let user = self.users.get()?.plain_by_id(&tx, post.user_id).await?;
                post.user = Some(Box::new(user));
            }
            Ok(post)
        })
        .await
    }

    pub async fn exists_by_id(&self, sess: &Session, id: EntityId) -> ForumResult<()> {
        self.storage
            .select_by_id(sess, id)
            .await
            .map(|_| ())
            .map_err(|err| missing_reference(err, "Post", id))
    }

    async fn select(
        &self,
        sess: &Session,
        filters: &PostFilters,
        pagination: Pagination,
        sort: PostSort,
    ) -> ForumResult<Vec<Post>> {
        let mut posts = self.storage.select_all(sess, filters, pagination, sort).await?;
        if posts.is_empty() {
            return Ok(posts);
        }

        let fields = &sess.requested_fields;

        if fields.contains(keys::USER) {
            let ids = unique_ids(posts.iter().map(|p| p.user_id));
            let users = self
                .users
                .get()?
                .related(&sess.narrowed_to(keys::USER), UserFilters::by_ids(ids))
                .await?;
            let users = by_id(users, |u| u.id);
            for post in &mut posts {
                post.user = users.get(&post.user_id).cloned().map(Box::new);
            }
        }

        if fields.contains(keys::TOPIC) {
            let ids = unique_ids(posts.iter().map(|p| p.topic_id));
            let topics = self
                .topics
                .get()?
                .related(&sess.narrowed_to(keys::TOPIC), TopicFilters::by_ids(ids))
                .await?;
            let topics = by_id(topics, |t| t.id);
            for post in &mut posts {
                post.topic = topics.get(&post.topic_id).cloned().map(Box::new);
            }
        }

        Ok(posts)
    }
}

#[async_trait]
impl PostAdapter for PostService {
    async fn related(&self, sess: &Session, filters: PostFilters) -> ForumResult<Vec<Post>> {
        let sort = self.config.sort_or_default(None);
        self.select(sess, &filters, EVERYTHING, sort).await
    }

    async fn mass_delete(&self, sess: &Session, filter: &PostDelete) -> ForumResult<()> {
        PostService::mass_delete(self, sess, filter).await
    }
}

#[cfg(test)]
mod tests {
    use crate::testing;
    use crate::usecase::test_support::*;
    use forum_core::{ErrorKind, PostFilters, PostSort, PostSortBy, SortOrder, TopicAdd};
    use forum_core::{Pagination, Session};

    #[tokio::test]
    async fn test_listing_sort_pagination_and_nested_topic() {
        let forum = testing::forum().await;
        let admin = admin(&forum).await;
        let section_id = testing::section(&forum, &admin, "General").await;
        let topic = forum
            .topics()
            .add(
                &admin,
                TopicAdd {
                    section_id,
                    user_id: 0,
                    name: "Counting".to_string(),
                },
            )
            .await
            .unwrap();
        let mut ids = Vec::new();
        for text in ["one", "two", "three"] {
            ids.push(testing::post(&forum, &admin, topic.id, text).await);
        }

        let sess = with_fields(&Session::new(), &["topic.section"]);
        let oldest_first = forum
            .posts()
            .all(
                &sess,
                PostFilters::by_topic_ids(vec![topic.id]),
                Some(Pagination::new(2, 1)),
                Some(PostSort::new(PostSortBy::CreatedAt, SortOrder::Asc)),
            )
            .await
            .unwrap();
        assert_eq!(oldest_first.iter().map(|p| p.id).collect::<Vec<_>>(), ids[..2]);
        let embedded = oldest_first[0].topic.as_ref().unwrap();
        assert_eq!(embedded.name, "Counting");
        assert_eq!(embedded.section.as_ref().map(|s| s.name.as_str()), Some("General"));

        let newest = forum
            .posts()
            .all(&Session::new(), PostFilters::default(), Some(Pagination::new(1, 1)), None)
            .await
            .unwrap();
        assert_eq!(newest[0].id, ids[2]);

        let err = forum
            .posts()
            .all(&Session::new(), PostFilters::default(), Some(Pagination::new(2, 9)), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_listing_rejects_oversized_inputs() {
        let forum = testing::forum().await;
        let max = forum.config().max_page_limit;

        let err = forum
            .posts()
            .all(&Session::new(), PostFilters::default(), Some(Pagination::new(max + 1, 1)), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err = forum
            .posts()
            .all(&Session::new(), PostFilters::default(), Some(Pagination::new(20, i64::MAX / 2)), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        // The furthest reachable page is simply empty.
        let err = forum
            .posts()
            .all(&Session::new(), PostFilters::default(), Some(Pagination::new(1, i64::MAX)), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        let too_many = (1..=max + 1).collect();
        let err = forum
            .posts()
            .all(&Session::new(), PostFilters::by_topic_ids(too_many), None, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
