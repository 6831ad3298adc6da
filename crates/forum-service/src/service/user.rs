//! # User Service
//!
//! Registration, credential checks, sparse edits and the user delete cascade.
//!
//! ## Delete Cascade
//! ```text
//! delete(user 7)
//!   ├── users: 7
//!   ├── TopicAdapter::mass_delete { user_ids: [7] }
//!   │     └── PostAdapter::mass_delete { topic_ids: [...] }
//!   └── PostAdapter::mass_delete { user_ids: [7] }     (posts in other topics)
//! ```
//!
//! ## Secondary Info Visibility
//! Requested `user_info` is returned to admins for everyone, and to other
//! callers only for themselves and for users with `show_info` set.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use forum_core::fields::keys;
use forum_core::ports::{CredentialHasher, UserStorage};
use forum_core::validation::{
    validate_id_list, validate_nickname, validate_pagination, validate_password,
    validate_user_info,
};
use forum_core::{
    EntityId, ForumError, ForumResult, Pagination, PostDelete, PostFilters, Session, TopicDelete,
    TopicFilters, User, UserAdd, UserEdit, UserFilters, UserInfo, UserSort,
};
use tracing::{debug, info};

use super::{missing_reference, non_empty, positions};
use crate::adapters::{PostAdapter, Sibling, TopicAdapter, UserAdapter, EVERYTHING};
use crate::config::ForumConfig;
use crate::transaction;

pub struct UserService {
    storage: Arc<dyn UserStorage>,
    hasher: Arc<dyn CredentialHasher>,
    config: Arc<ForumConfig>,
    topics: Sibling<dyn TopicAdapter>,
    posts: Sibling<dyn PostAdapter>,
}

impl UserService {
    pub fn new(
        storage: Arc<dyn UserStorage>,
        hasher: Arc<dyn CredentialHasher>,
        config: Arc<ForumConfig>,
    ) -> Self {
        UserService {
            storage,
            hasher,
            config,
            topics: Sibling::new("Topic"),
            posts: Sibling::new("Post"),
        }
    }

    pub fn attach(&self, topics: Weak<dyn TopicAdapter>, posts: Weak<dyn PostAdapter>) {
        self.topics.attach(topics);
        self.posts.attach(posts);
    }

    /// Runs `body` in this service's transaction scope.
    pub async fn do_transaction<T, F, Fut>(&self, sess: &Session, body: F) -> ForumResult<T>
    where
        F: FnOnce(Session) -> Fut,
        Fut: Future<Output = ForumResult<T>>,
    {
        transaction::do_transaction(&*self.storage, sess, body).await
    }

    /// Registers a user. The password is hashed before the transaction opens.
    pub async fn add(&self, sess: &Session, mut user: UserAdd) -> ForumResult<EntityId> {
        user.nickname = validate_nickname(&user.nickname)?;
        validate_password(&user.password)?;
        user.info = validate_user_info(user.info)?;
        user.password = self.hasher.hash(&user.password)?;

        let id = self
            .do_transaction(sess, |tx| {
                let user = &user;
                async move {
                    self.ensure_nickname_free(&tx, &user.nickname, None).await?;
                    self.storage.insert(&tx, user).await
                }
            })
            .await?;

        info!(session_id = %sess.id, user_id = id, nickname = %user.nickname, "User registered");
        Ok(id)
    }

    /// Sparse edit. Renaming to one's own current nickname is accepted.
    pub async fn edit(&self, sess: &Session, mut edit: UserEdit) -> ForumResult<()> {
        edit.nickname = edit.nickname.as_deref().map(validate_nickname).transpose()?;
        if let Some(password) = edit.password.take() {
            validate_password(&password)?;
            edit.password = Some(self.hasher.hash(&password)?);
        }
        if let Some(info) = edit.info.take() {
            edit.info = Some(validate_user_info(info)?);
        }

        self.do_transaction(sess, |tx| {
            let edit = &edit;
            async move {
                self.exists_by_id(&tx, edit.id).await?;
                if let Some(nickname) = &edit.nickname {
                    self.ensure_nickname_free(&tx, nickname, Some(edit.id)).await?;
                }
                self.storage.update(&tx, edit).await
            }
        })
        .await
    }

    pub async fn delete(&self, sess: &Session, id: EntityId) -> ForumResult<()> {
        self.do_transaction(sess, |tx| async move {
            self.exists_by_id(&tx, id).await?;
            self.storage.delete(&tx, &[id]).await?;

            self.topics
                .get()?
                .mass_delete(&tx, &TopicDelete::by_user_ids(vec![id]))
                .await?;
            self.posts
                .get()?
                .mass_delete(&tx, &PostDelete::by_user_ids(vec![id]))
                .await?;

            debug!(session_id = %tx.id, user_id = id, "User deleted with cascade");
            Ok(())
        })
        .await
    }

    pub async fn all(
        &self,
        sess: &Session,
        filters: UserFilters,
        pagination: Option<Pagination>,
        sort: Option<UserSort>,
    ) -> ForumResult<Vec<User>> {
        let pagination = self.config.pagination_or_default(pagination);
        let sort = self.config.sort_or_default(sort);
        validate_pagination(&pagination, self.config.max_page_limit)?;
        validate_id_list("IDs", filters.ids.as_ref(), self.config.max_ids())?;

        self.do_transaction(sess, |tx| {
            let filters = &filters;
            async move {
                let users = self.select(&tx, filters, pagination, sort).await?;
                non_empty(users, "Users not found")
            }
        })
        .await
    }

    /// Checks a nickname/password pair.
    ///
    /// Unknown nickname and wrong password fail identically.
    pub async fn by_login_and_password(
        &self,
        sess: &Session,
        nickname: &str,
        password: &str,
    ) -> ForumResult<User> {
        let creds = self
            .storage
            .select_by_nickname(sess, nickname.trim())
            .await?
            .ok_or_else(ForumError::invalid_credentials)?;

        if !self.hasher.verify(&creds.password_hash, password) {
            return Err(ForumError::invalid_credentials());
        }
        Ok(creds.user)
    }

    /// The bare row, no relations.
    pub async fn plain_by_id(&self, sess: &Session, id: EntityId) -> ForumResult<User> {
        self.storage.select_by_id(sess, id).await
    }

    pub async fn exists_by_id(&self, sess: &Session, id: EntityId) -> ForumResult<()> {
        self.plain_by_id(sess, id)
            .await
            .map(|_| ())
            .map_err(|err| missing_reference(err, "User", id))
    }

    /// Returns true if at least one live user exists.
    pub async fn has_any(&self, sess: &Session) -> ForumResult<bool> {
        let sort = self.config.sort_or_default(None);
        let page = Pagination::new(1, 1);
        let users = self
            .storage
            .select_all(sess, &UserFilters::default(), page, sort)
            .await?;
        Ok(!users.is_empty())
    }

    async fn ensure_nickname_free(
        &self,
        sess: &Session,
        nickname: &str,
        owner: Option<EntityId>,
    ) -> ForumResult<()> {
        match self.storage.select_by_nickname(sess, nickname).await? {
            Some(existing) if Some(existing.user.id) != owner => Err(ForumError::already_exists(
                format!("Nickname {} is already registered", nickname),
            )),
            _ => Ok(()),
        }
    }

    /// Rows plus requested relations. Empty is fine here.
    async fn select(
        &self,
        sess: &Session,
        filters: &UserFilters,
        pagination: Pagination,
        sort: UserSort,
    ) -> ForumResult<Vec<User>> {
        let mut users = self.storage.select_all(sess, filters, pagination, sort).await?;
        if users.is_empty() {
            return Ok(users);
        }

        let fields = &sess.requested_fields;
        let ids: Vec<EntityId> = users.iter().map(|u| u.id).collect();
        let index = positions(&users, |u| u.id);

        if fields.contains(keys::USER_INFO) {
            let mut info: HashMap<EntityId, UserInfo> =
                self.storage.select_info(sess, &ids).await?.into_iter().collect();
            let sees_everything = sess.is_admin();

            for user in &mut users {
                if sees_everything || user.show_info || user.id == sess.user_id {
                    user.info = Some(info.remove(&user.id).unwrap_or_default());
                }
            }
        }

        if fields.contains(keys::TOPICS) {
            let topics = self
                .topics
                .get()?
                .related(&sess.narrowed_to(keys::TOPICS), TopicFilters::by_user_ids(ids.clone()))
                .await?;
            for topic in topics {
                if let Some(&i) = index.get(&topic.user_id) {
                    users[i].topics.push(topic);
                }
            }
        }

        if fields.contains(keys::POSTS) {
            let posts = self
                .posts
                .get()?
                .related(&sess.narrowed_to(keys::POSTS), PostFilters::by_user_ids(ids))
                .await?;
            for post in posts {
                if let Some(&i) = index.get(&post.user_id) {
                    users[i].posts.push(post);
                }
            }
        }

        Ok(users)
    }
}

#[async_trait]
impl UserAdapter for UserService {
    async fn related(&self, sess: &Session, filters: UserFilters) -> ForumResult<Vec<User>> {
        let sort = self.config.sort_or_default(None);
        self.select(sess, &filters, EVERYTHING, sort).await
    }

    async fn plain_by_id(&self, sess: &Session, id: EntityId) -> ForumResult<User> {
        UserService::plain_by_id(self, sess, id).await
    }

    async fn exists_by_id(&self, sess: &Session, id: EntityId) -> ForumResult<()> {
        UserService::exists_by_id(self, sess, id).await
    }
}
