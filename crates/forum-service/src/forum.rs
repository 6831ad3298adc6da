//! # Composition Root
//!
//! Builds every service, wires the sibling adapters and exposes the
//! use-cases.
//!
//! ```text
//! phase 1: construct           phase 2: wire (Weak, once)
//! ───────────────────          ──────────────────────────────
//! Arc<UserService>             users.attach(topics, posts)
//! Arc<SectionService>          sections.attach(topics)
//! Arc<TopicService>            topics.attach(users, sections, posts)
//! Arc<PostService>             posts.attach(users, topics)
//! Arc<NotificationService>
//! ```
//!
//! `Forum` holds the only strong references, so dropping it tears the
//! graph down even though the services point at each other.

use std::sync::{Arc, Weak};

use forum_core::ports::CredentialHasher;
use forum_core::{ForumError, ForumResult, Session, User, UserAdd, UserEdit, UserLevel};
use forum_db::{Database, DbConfig, DbResult};
use tracing::info;

use crate::adapters::{PostAdapter, SectionAdapter, TopicAdapter, UserAdapter};
use crate::config::ForumConfig;
use crate::credentials::Argon2Hasher;
use crate::service::{NotificationService, PostService, SectionService, TopicService, UserService};
use crate::usecase::{
    NotificationUseCase, Notifier, PostUseCase, SectionUseCase, TopicUseCase, UserUseCase,
};

pub struct Forum {
    pub(crate) user_service: Arc<UserService>,
    db: Database,
    config: Arc<ForumConfig>,
    users: UserUseCase,
    sections: SectionUseCase,
    topics: TopicUseCase,
    posts: PostUseCase,
    notifications: NotificationUseCase,
}

impl Forum {
    pub fn new(db: &Database, hasher: Arc<dyn CredentialHasher>, config: ForumConfig) -> Self {
        let config = Arc::new(config);

        let user_service = Arc::new(UserService::new(
            Arc::new(db.users()),
            hasher,
            Arc::clone(&config),
        ));
        let section_service = Arc::new(SectionService::new(
            Arc::new(db.sections()),
            Arc::clone(&config),
        ));
        let topic_service = Arc::new(TopicService::new(Arc::new(db.topics()), Arc::clone(&config)));
        let post_service = Arc::new(PostService::new(Arc::new(db.posts()), Arc::clone(&config)));
        let notification_service = Arc::new(NotificationService::new(
            Arc::new(db.notifications()),
            Arc::clone(&config),
        ));

        let users = Arc::downgrade(&user_service) as Weak<dyn UserAdapter>;
        let sections = Arc::downgrade(&section_service) as Weak<dyn SectionAdapter>;
        let topics = Arc::downgrade(&topic_service) as Weak<dyn TopicAdapter>;
        let posts = Arc::downgrade(&post_service) as Weak<dyn PostAdapter>;

        user_service.attach(topics.clone(), posts.clone());
        section_service.attach(topics.clone());
        topic_service.attach(users.clone(), sections, posts);
        post_service.attach(users, topics);

        let notifier = Notifier::new(Arc::clone(&notification_service));

        Forum {
            users: UserUseCase::new(Arc::clone(&user_service), notifier.clone()),
            sections: SectionUseCase::new(section_service),
            topics: TopicUseCase::new(topic_service, Arc::clone(&user_service), notifier.clone()),
            posts: PostUseCase::new(
                post_service,
                Arc::clone(&user_service),
                notifier,
                Arc::clone(&config),
            ),
            notifications: NotificationUseCase::new(notification_service),
            user_service,
            db: db.clone(),
            config,
        }
    }

    /// Opens the SQLite database named by `config` with argon2 credentials.
    pub async fn open(config: ForumConfig) -> DbResult<Self> {
        let db_config =
            DbConfig::new(&config.database_path).max_connections(config.max_connections);
        let db = Database::new(db_config).await?;

        Ok(Forum::new(&db, Arc::new(Argon2Hasher), config))
    }

    pub fn users(&self) -> &UserUseCase {
        &self.users
    }

    pub fn sections(&self) -> &SectionUseCase {
        &self.sections
    }

    pub fn topics(&self) -> &TopicUseCase {
        &self.topics
    }

    pub fn posts(&self) -> &PostUseCase {
        &self.posts
    }

    pub fn notifications(&self) -> &NotificationUseCase {
        &self.notifications
    }

    pub fn config(&self) -> &ForumConfig {
        &self.config
    }

    /// Returns true if the database answers.
    pub async fn health_check(&self) -> bool {
        self.db.health_check().await
    }

    /// Closes the connection pool. Every operation fails afterwards.
    pub async fn close(&self) {
        self.db.close().await;
    }

    /// First-run setup: registers an administrator without a privileged caller.
    ///
    /// Fails with AlreadyExists once any user exists.
    pub async fn bootstrap_admin(&self, sess: &Session, admin: UserAdd) -> ForumResult<User> {
        let service = &self.user_service;

        let id = service
            .do_transaction(sess, |tx| async move {
                if service.has_any(&tx).await? {
                    return Err(ForumError::already_exists("The forum already has users"));
                }

                let id = service.add(&tx, admin).await?;
                let promote = UserEdit {
                    level: Some(UserLevel::Admin),
                    ..UserEdit::new(id)
                };
                service.edit(&tx, promote).await?;
                Ok(id)
            })
            .await
            .map_err(|err| sess.enrich(err))?;

        info!(session_id = %sess.id, user_id = id, "Administrator bootstrapped");
        self.users.by_id(sess, id).await
    }
}
