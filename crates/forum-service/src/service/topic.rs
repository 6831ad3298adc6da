//! # Topic Service
//!
//! Topics sit between sections and posts, so this service is the hub of the
//! delete cascade: sections and users reach posts through it.
//!
//! ```text
//! mass_delete { section_ids: [3] }
//!   ├── ids_to_delete ──► [10, 11]      (filters resolve to ids first)
//!   ├── topics: 10, 11
//!   └── PostAdapter::mass_delete { topic_ids: [10, 11] }
//! ```

use std::future::Future;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use forum_core::fields::keys;
use forum_core::ports::TopicStorage;
use forum_core::validation::{validate_id_list, validate_pagination, validate_topic_name};
use forum_core::{
    EntityId, ForumResult, Pagination, PlainTopicById, PostDelete, PostFilters, SectionFilters,
    Session, Topic, TopicAdd, TopicDelete, TopicEdit, TopicFilters, TopicSort, UserFilters,
    unique_ids,
};
use tracing::debug;

use super::{by_id, missing_reference, non_empty, positions};
use crate::adapters::{
    PostAdapter, SectionAdapter, Sibling, TopicAdapter, UserAdapter, EVERYTHING,
};
use crate::config::ForumConfig;
use crate::transaction;

pub struct TopicService {
    storage: Arc<dyn TopicStorage>,
    config: Arc<ForumConfig>,
    users: Sibling<dyn UserAdapter>,
    sections: Sibling<dyn SectionAdapter>,
    posts: Sibling<dyn PostAdapter>,
}

impl TopicService {
    pub fn new(storage: Arc<dyn TopicStorage>, config: Arc<ForumConfig>) -> Self {
        TopicService {
            storage,
            config,
            users: Sibling::new("User"),
            sections: Sibling::new("Section"),
            posts: Sibling::new("Post"),
        }
    }

    pub fn attach(
        &self,
        users: Weak<dyn UserAdapter>,
        sections: Weak<dyn SectionAdapter>,
        posts: Weak<dyn PostAdapter>,
    ) {
        self.users.attach(users);
        self.sections.attach(sections);
        self.posts.attach(posts);
    }

    pub async fn do_transaction<T, F, Fut>(&self, sess: &Session, body: F) -> ForumResult<T>
    where
        F: FnOnce(Session) -> Fut,
        Fut: Future<Output = ForumResult<T>>,
    {
        transaction::do_transaction(&*self.storage, sess, body).await
    }

    pub async fn add(&self, sess: &Session, mut topic: TopicAdd) -> ForumResult<EntityId> {
        topic.name = validate_topic_name(&topic.name)?;

        self.do_transaction(sess, |tx| {
            let topic = &topic;
            async move {
                self.sections.get()?.exists_by_id(&tx, topic.section_id).await?;
                self.users.get()?.exists_by_id(&tx, topic.user_id).await?;
                self.storage.insert(&tx, topic).await
            }
        })
        .await
    }

    pub async fn edit(&self, sess: &Session, mut edit: TopicEdit) -> ForumResult<()> {
        edit.name = edit.name.as_deref().map(validate_topic_name).transpose()?;

        self.do_transaction(sess, |tx| {
            let edit = &edit;
            async move {
                self.exists_by_id(&tx, edit.id).await?;
                if let Some(user_id) = edit.user_id {
                    self.users.get()?.exists_by_id(&tx, user_id).await?;
                }
                if let Some(section_id) = edit.section_id {
                    self.sections.get()?.exists_by_id(&tx, section_id).await?;
                }
                self.storage.update(&tx, edit).await
            }
        })
        .await
    }

    /// Deletes the topic and its posts.
    pub async fn delete(&self, sess: &Session, id: EntityId) -> ForumResult<()> {
        self.do_transaction(sess, |tx| async move {
            self.exists_by_id(&tx, id).await?;
            self.storage.delete(&tx, &[id]).await?;

            self.posts
                .get()?
                .mass_delete(&tx, &PostDelete::by_topic_ids(vec![id]))
                .await
        })
        .await
    }

    /// Deletes explicit ids, or every live topic matching owner filters, with their posts.
    pub async fn mass_delete(&self, sess: &Session, filter: &TopicDelete) -> ForumResult<()> {
        self.do_transaction(sess, |tx| async move {
            let ids = match filter.only_ids() {
                Some(ids) => ids.to_vec(),
                None => self.storage.ids_to_delete(&tx, filter).await?,
            };
            if ids.is_empty() {
                return Ok(());
            }

            debug!(session_id = %tx.id, ?ids, "Mass deleting topics");
            self.storage.delete(&tx, &ids).await?;
            self.posts
                .get()?
                .mass_delete(&tx, &PostDelete::by_topic_ids(ids))
                .await
        })
        .await
    }

    pub async fn all(
        &self,
        sess: &Session,
        filters: TopicFilters,
        pagination: Option<Pagination>,
        sort: Option<TopicSort>,
    ) -> ForumResult<Vec<Topic>> {
        let pagination = self.config.pagination_or_default(pagination);
        let sort = self.config.sort_or_default(sort);
        validate_pagination(&pagination, self.config.max_page_limit)?;
        let max = self.config.max_ids();
        validate_id_list("IDs", filters.ids.as_ref(), max)?;
        validate_id_list("SectionIDs", filters.section_ids.as_ref(), max)?;
        validate_id_list("UserIDs", filters.user_ids.as_ref(), max)?;

        self.do_transaction(sess, |tx| {
            let filters = &filters;
            async move {
                let topics = self.select(&tx, filters, pagination, sort).await?;
                non_empty(topics, "Topics not found")
            }
        })
        .await
    }

    /// Single topic with exactly the flagged relations, regardless of the field tree.
    pub async fn plain_by_id(&self, sess: &Session, query: PlainTopicById) -> ForumResult<Topic> {
        self.do_transaction(sess, |tx| async move {
            let mut topic = self.storage.select_by_id(&tx, query.id).await?;

            if query.fetch_section {
                let section = self.sections.get()?.plain_by_id(&tx, topic.section_id).await?;
                topic.section = Some(Box::new(section));
            }
            if query.fetch_user {
                let user = self.users.get()?.plain_by_id(&tx, topic.user_id).await?;
                topic.user = Some(Box::new(user));
            }
            Ok(topic)
        })
        .await
    }

    pub async fn exists_by_id(&self, sess: &Session, id: EntityId) -> ForumResult<()> {
        self.storage
            .select_by_id(sess, id)
            .await
            .map(|_| ())
            .map_err(|err| missing_reference(err, "Topic", id))
    }

    async fn select(
        &self,
        sess: &Session,
        filters: &TopicFilters,
        pagination: Pagination,
        sort: TopicSort,
    ) -> ForumResult<Vec<Topic>> {
        let mut topics = self.storage.select_all(sess, filters, pagination, sort).await?;
        if topics.is_empty() {
            return Ok(topics);
        }

        let fields = &sess.requested_fields;

        if fields.contains(keys::USER) {
            let ids = unique_ids(topics.iter().map(|t| t.user_id));
            let users = self
                .users
                .get()?
                .related(&sess.narrowed_to(keys::USER), UserFilters::by_ids(ids))
                .await?;
            let users = by_id(users, |u| u.id);
            for topic in &mut topics {
                topic.user = users.get(&topic.user_id).cloned().map(Box::new);
            }
        }

        if fields.contains(keys::SECTION) {
            let ids = unique_ids(topics.iter().map(|t| t.section_id));
            let sections = self
                .sections
                .get()?
                .related(&sess.narrowed_to(keys::SECTION), SectionFilters::by_ids(ids))
                .await?;
            let sections = by_id(sections, |s| s.id);
            for topic in &mut topics {
                topic.section = sections.get(&topic.section_id).cloned().map(Box::new);
            }
        }

        if fields.contains(keys::POSTS) {
            let ids: Vec<EntityId> = topics.iter().map(|t| t.id).collect();
            let index = positions(&topics, |t| t.id);
            let posts = self
                .posts
                .get()?
                .related(&sess.narrowed_to(keys::POSTS), PostFilters::by_topic_ids(ids))
                .await?;
            for post in posts {
                if let Some(&i) = index.get(&post.topic_id) {
                    topics[i].posts.push(post);
                }
            }
        }

        Ok(topics)
    }
}

#[async_trait]
impl TopicAdapter for TopicService {
    async fn related(&self, sess: &Session, filters: TopicFilters) -> ForumResult<Vec<Topic>> {
        let sort = self.config.sort_or_default(None);
        self.select(sess, &filters, EVERYTHING, sort).await
    }

    async fn plain_by_id(&self, sess: &Session, query: PlainTopicById) -> ForumResult<Topic> {
        TopicService::plain_by_id(self, sess, query).await
    }

    async fn exists_by_id(&self, sess: &Session, id: EntityId) -> ForumResult<()> {
        TopicService::exists_by_id(self, sess, id).await
    }

    async fn mass_delete(&self, sess: &Session, filter: &TopicDelete) -> ForumResult<()> {
        TopicService::mass_delete(self, sess, filter).await
    }
}

#[cfg(test)]
mod tests {
    use crate::testing;
    use crate::usecase::test_support::*;
    use forum_core::{Session, TopicAdd, TopicFilters};

    #[tokio::test]
    async fn test_embeds_requested_relations_in_batches() {
        let forum = testing::forum().await;
        let admin = admin(&forum).await;
        let section_id = testing::section(&forum, &admin, "General").await;
        let alice = member(&forum, "alice").await;
        let bob = member(&forum, "bob").await;

        let mut ids = Vec::new();
        for (author, name) in [(&alice, "One"), (&bob, "Two")] {
            let topic = forum
                .topics()
                .add(
                    author,
                    TopicAdd {
                        section_id,
                        user_id: 0,
                        name: name.to_string(),
                    },
                )
                .await
                .unwrap();
            ids.push(topic.id);
        }
        testing::post(&forum, &bob, ids[0], "reply from bob").await;
        testing::post(&forum, &alice, ids[0], "reply from alice").await;

        let sess = with_fields(&admin, &["section", "user", "posts.user"]);
        let topics = forum
            .topics()
            .all(&sess, TopicFilters::by_ids(ids.clone()), None, None)
            .await
            .unwrap();

        let one = topics.iter().find(|t| t.id == ids[0]).unwrap();
        assert_eq!(one.section.as_ref().map(|s| s.name.as_str()), Some("General"));
        assert_eq!(one.user.as_ref().map(|u| u.nickname.as_str()), Some("alice"));
        assert_eq!(one.count_posts, 2);
        assert_eq!(one.posts.len(), 2);
        assert!(one.posts.iter().all(|p| p.user.is_some() && p.topic.is_none()));

        let two = topics.iter().find(|t| t.id == ids[1]).unwrap();
        assert!(two.posts.is_empty());
        // `user` was requested without sub-fields.
        assert!(two.user.as_ref().unwrap().posts.is_empty());
    }

    #[tokio::test]
    async fn test_unrequested_relations_stay_empty() {
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
                    name: "Bare".to_string(),
                },
            )
            .await
            .unwrap();
        testing::post(&forum, &admin, topic.id, "text").await;

        let topic = forum.topics().by_id(&Session::new(), topic.id).await.unwrap();
        assert!(topic.section.is_none());
        assert!(topic.user.is_none());
        assert!(topic.posts.is_empty());
    }
}
