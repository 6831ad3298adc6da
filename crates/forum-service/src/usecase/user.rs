//! User use-case: registration, login, profile edits and account removal.

use std::sync::Arc;

use forum_core::policy::{check_user_edit, require_admin};
use forum_core::{
    EntityId, ErrorKind, ForumError, ForumResult, Pagination, Session, User, UserAdd, UserEdit,
    UserFilters, UserRestriction, UserSort,
};
use tracing::info;

use super::{enriched, single, Notifier};
use crate::service::UserService;

pub const WELCOME_TEXT: &str = "Welcome to the forum!";

pub struct UserUseCase {
    users: Arc<UserService>,
    notifier: Notifier,
}

impl UserUseCase {
    pub(crate) fn new(users: Arc<UserService>, notifier: Notifier) -> Self {
        UserUseCase { users, notifier }
    }

    /// Registration. Open to anonymous callers.
    pub async fn add(&self, sess: &Session, user: UserAdd) -> ForumResult<User> {
        let user = enriched(sess, async {
            self.users
                .do_transaction(sess, |tx| async move {
                    let id = self.users.add(&tx, user).await?;
                    self.fetch(&tx, id).await
                })
                .await
        })
        .await?;

        self.notifier.send(sess, user.id, WELCOME_TEXT.to_string()).await;
        Ok(user)
    }

    /// Returns `sess` acting as the user behind the credentials.
    pub async fn authenticate(
        &self,
        sess: &Session,
        nickname: &str,
        password: &str,
    ) -> ForumResult<Session> {
        enriched(sess, async {
            if sess.is_authorized() {
                return Err(ForumError::of(ErrorKind::AlreadyAuthorized));
            }

            let user = self.users.by_login_and_password(sess, nickname, password).await?;
            if user.restriction.at_least(UserRestriction::Banned) {
                return Err(ForumError::banned());
            }

            info!(session_id = %sess.id, user_id = user.id, "User authenticated");
            Ok(sess.authenticated_as(&user))
        })
        .await
    }

    pub async fn edit(&self, sess: &Session, edit: UserEdit) -> ForumResult<User> {
        let (before, after) = enriched(sess, async {
            check_user_edit(sess, &edit)?;

            self.users
                .do_transaction(sess, |tx| async move {
                    let before = self.users.plain_by_id(&tx, edit.id).await?;
                    self.users.edit(&tx, edit).await?;
                    let after = self.fetch(&tx, before.id).await?;
                    Ok((before, after))
                })
                .await
        })
        .await?;

        if before.level != after.level {
            let text = format!("Your privilege level has been changed to {}", after.level);
            self.notifier.send(sess, after.id, text).await;
        }
        if before.restriction != after.restriction {
            let text = format!("Your restriction level has been changed to {}", after.restriction);
            self.notifier.send(sess, after.id, text).await;
        }

        Ok(after)
    }

    /// Removes the user with every topic and post they authored.
    pub async fn delete(&self, sess: &Session, id: EntityId) -> ForumResult<()> {
        enriched(sess, async {
            require_admin(sess)?;
            self.users.delete(sess, id).await
        })
        .await?;

        info!(session_id = %sess.id, user_id = id, "User removed");
        Ok(())
    }

    pub async fn by_id(&self, sess: &Session, id: EntityId) -> ForumResult<User> {
        enriched(sess, self.fetch(sess, id)).await
    }

    pub async fn all(
        &self,
        sess: &Session,
        filters: UserFilters,
        pagination: Option<Pagination>,
        sort: Option<UserSort>,
    ) -> ForumResult<Vec<User>> {
        enriched(sess, self.users.all(sess, filters, pagination, sort)).await
    }

    async fn fetch(&self, sess: &Session, id: EntityId) -> ForumResult<User> {
        let users = self.users.all(sess, UserFilters::by_ids(vec![id]), None, None).await?;
        single(users, "User", id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use crate::usecase::test_support::*;
    use forum_core::{PostFilters, TopicAdd, TopicFilters, UserInfo, UserLevel};

    #[tokio::test]
    async fn test_add_returns_user_and_sends_welcome() {
        let forum = testing::forum().await;

        let user = forum
            .users()
            .add(
                &Session::new(),
                UserAdd {
                    nickname: "  alice ".to_string(),
                    password: testing::PASSWORD.to_string(),
                    show_info: true,
                    info: UserInfo {
                        email: Some("alice@example.com".to_string()),
                        ..Default::default()
                    },
                },
            )
            .await
            .unwrap();

        assert!(user.id > 0);
        assert_eq!(user.nickname, "alice");
        assert!(user.show_info);
        assert_eq!(user.rank, 1);
        assert_eq!(user.level, UserLevel::None);
        assert_eq!(notification_texts(&forum, user.id).await, vec![WELCOME_TEXT]);
    }

    #[tokio::test]
    async fn test_add_duplicate_nickname() {
        let forum = testing::forum().await;
        register(&forum, "alice").await;

        let err = forum
            .users()
            .add(
                &Session::new(),
                UserAdd {
                    nickname: "alice".to_string(),
                    password: testing::PASSWORD.to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::AlreadyExists);
        assert!(err.session_id.is_some());
    }

    #[tokio::test]
    async fn test_authenticate() {
        let forum = testing::forum().await;
        let id = register(&forum, "alice").await;

        let anonymous = Session::new();
        let sess = forum
            .users()
            .authenticate(&anonymous, "alice", testing::PASSWORD)
            .await
            .unwrap();
        assert_eq!(sess.user_id, id);
        assert_eq!(sess.id, anonymous.id);

        let err = forum
            .users()
            .authenticate(&sess, "alice", testing::PASSWORD)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyAuthorized);

        let wrong_password = forum
            .users()
            .authenticate(&Session::new(), "alice", "not-the-password")
            .await
            .unwrap_err();
        let unknown = forum
            .users()
            .authenticate(&Session::new(), "nobody", testing::PASSWORD)
            .await
            .unwrap_err();
        assert_eq!(wrong_password.kind, ErrorKind::InvalidCredentials);
        assert_eq!(wrong_password.message, unknown.message);
    }

    #[tokio::test]
    async fn test_banned_user_cannot_log_in() {
        let forum = testing::forum().await;
        let id = register(&forum, "mallory").await;
        forum
            .user_service
            .edit(
                &Session::new(),
                UserEdit {
                    restriction: Some(UserRestriction::Banned),
                    ..UserEdit::new(id)
                },
            )
            .await
            .unwrap();

        let err = forum
            .users()
            .authenticate(&Session::new(), "mallory", testing::PASSWORD)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Restricted);
        assert_eq!(err.message, "You are banned");
    }

    #[tokio::test]
    async fn test_member_cannot_touch_protected_fields() {
        let forum = testing::forum().await;
        let sess = member(&forum, "alice").await;

        let err = forum
            .users()
            .edit(
                &sess,
                UserEdit {
                    rank: Some(10),
                    ..UserEdit::new(sess.user_id)
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
        assert_eq!(err.user_id, Some(sess.user_id));

        let other = register(&forum, "bob").await;
        let err = forum
            .users()
            .edit(
                &sess,
                UserEdit {
                    show_info: Some(true),
                    ..UserEdit::new(other)
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_duplicate_nickname_edit_leaves_no_partial_write() {
        let forum = testing::forum().await;
        let admin = admin(&forum).await;
        let alice = register(&forum, "alice").await;
        register(&forum, "bob").await;

        let err = forum
            .users()
            .edit(
                &admin,
                UserEdit {
                    nickname: Some("bob".to_string()),
                    show_info: Some(true),
                    ..UserEdit::new(alice)
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyExists);

        let alice = forum.users().by_id(&admin, alice).await.unwrap();
        assert_eq!(alice.nickname, "alice");
        assert!(!alice.show_info);
    }

    #[tokio::test]
    async fn test_own_nickname_is_accepted() {
        let forum = testing::forum().await;
        let sess = member(&forum, "alice").await;

        let user = forum
            .users()
            .edit(
                &sess,
                UserEdit {
                    nickname: Some("alice".to_string()),
                    ..UserEdit::new(sess.user_id)
                },
            )
            .await
            .unwrap();
        assert_eq!(user.nickname, "alice");
    }

    #[tokio::test]
    async fn test_level_change_notifies_only_on_change() {
        let forum = testing::forum().await;
        let admin = admin(&forum).await;
        let bob = register(&forum, "bob").await;

        let promote = UserEdit {
            level: Some(UserLevel::Mod),
            ..UserEdit::new(bob)
        };
        let user = forum.users().edit(&admin, promote.clone()).await.unwrap();
        assert_eq!(user.level, UserLevel::Mod);
        forum.users().edit(&admin, promote).await.unwrap();

        let texts = notification_texts(&forum, bob).await;
        let changes: Vec<_> = texts.iter().filter(|t| t.contains("privilege level")).collect();
        assert_eq!(changes, vec!["Your privilege level has been changed to MOD"]);
    }

    #[tokio::test]
    async fn test_delete_requires_admin() {
        let forum = testing::forum().await;
        let sess = member(&forum, "alice").await;

        let err = forum.users().delete(&sess, sess.user_id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);

        let err = forum.users().delete(&Session::new(), sess.user_id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotAuthorized);
    }

    #[tokio::test]
    async fn test_delete_removes_authored_topics_and_posts() {
        let forum = testing::forum().await;
        let admin = admin(&forum).await;
        let section_id = testing::section(&forum, &admin, "General").await;
        let alice = member(&forum, "alice").await;
        let bob = member(&forum, "bob").await;

        let own_topic = forum
            .topics()
            .add(
                &alice,
                TopicAdd {
                    section_id,
                    user_id: 0,
                    name: "Alice's corner".to_string(),
                },
            )
            .await
            .unwrap();
        testing::post(&forum, &bob, own_topic.id, "bob in alice's topic").await;
        let bobs_topic = forum
            .topics()
            .add(
                &bob,
                TopicAdd {
                    section_id,
                    user_id: 0,
                    name: "Bob's corner".to_string(),
                },
            )
            .await
            .unwrap();
        testing::post(&forum, &alice, bobs_topic.id, "alice in bob's topic").await;
        let bobs_post = testing::post(&forum, &bob, bobs_topic.id, "bob at home").await;

        forum.users().delete(&admin, alice.user_id).await.unwrap();

        let err = forum.users().by_id(&admin, alice.user_id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        let err = forum
            .topics()
            .all(&admin, TopicFilters::by_user_ids(vec![alice.user_id]), None, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        let err = forum
            .posts()
            .all(&admin, PostFilters::by_user_ids(vec![alice.user_id]), None, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        let err = forum
            .posts()
            .all(&admin, PostFilters::by_topic_ids(vec![own_topic.id]), None, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        let remaining = forum
            .posts()
            .all(&admin, PostFilters::by_topic_ids(vec![bobs_topic.id]), None, None)
            .await
            .unwrap();
        assert_eq!(remaining.iter().map(|p| p.id).collect::<Vec<_>>(), vec![bobs_post]);

        let err = forum.users().delete(&admin, alice.user_id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.message, format!("User with ID {} not found", alice.user_id));
    }

    #[tokio::test]
    async fn test_info_is_redacted_for_other_members() {
        let forum = testing::forum().await;
        let admin = admin(&forum).await;
        let alice = member(&forum, "alice").await;
        forum
            .users()
            .edit(
                &alice,
                UserEdit {
                    info: Some(UserInfo {
                        phone: Some("555-0100".to_string()),
                        ..Default::default()
                    }),
                    ..UserEdit::new(alice.user_id)
                },
            )
            .await
            .unwrap();
        let bob = member(&forum, "bob").await;

        let seen_by_bob = forum
            .users()
            .by_id(&with_fields(&bob, &["user_info"]), alice.user_id)
            .await
            .unwrap();
        assert!(seen_by_bob.info.is_none());

        let seen_by_self = forum
            .users()
            .by_id(&with_fields(&alice, &["user_info"]), alice.user_id)
            .await
            .unwrap();
        assert_eq!(seen_by_self.info.unwrap().phone.as_deref(), Some("555-0100"));

        let seen_by_admin = forum
            .users()
            .by_id(&with_fields(&admin, &["user_info"]), alice.user_id)
            .await
            .unwrap();
        assert!(seen_by_admin.info.is_some());
    }

    #[tokio::test]
    async fn test_all_empty_is_not_found() {
        let forum = testing::forum().await;

        let err = forum
            .users()
            .all(&Session::new(), UserFilters::default(), None, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
