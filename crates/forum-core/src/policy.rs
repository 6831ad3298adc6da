//! # Authorization Policy
//!
//! Pure checks evaluated by the use-cases before any storage call.
//!
//! ```text
//! ┌───────────────────────────┬─────────────────────────────────────────────┐
//! │ Operation                 │ Rule                                        │
//! ├───────────────────────────┼─────────────────────────────────────────────┤
//! │ Add Post / Topic          │ authenticated, not banned, not read-only    │
//! │ Edit Post / Topic         │ + moderator, or owner not moving/reassigning│
//! │ Delete Post / Topic       │ moderator or admin                          │
//! │ Add/Edit/Delete Section   │ admin                                       │
//! │ Edit User                 │ own non-protected fields, else admin        │
//! │ Delete User               │ admin                                       │
//! └───────────────────────────┴─────────────────────────────────────────────┘
//! ```

use crate::error::{ForumError, ForumResult};
use crate::session::Session;
use crate::types::{EntityId, UserEdit, UserRestriction};

/// The caller must be authenticated.
pub fn require_authorized(sess: &Session) -> ForumResult<()> {
    if sess.is_authorized() {
        Ok(())
    } else {
        Err(ForumError::not_authorized())
    }
}

/// The caller must be authenticated and not banned.
pub fn require_active(sess: &Session) -> ForumResult<()> {
    require_authorized(sess)?;
    if sess.restriction.at_least(UserRestriction::Banned) {
        return Err(ForumError::banned());
    }
    Ok(())
}

/// The caller may create content.
pub fn require_can_write(sess: &Session) -> ForumResult<()> {
    require_active(sess)?;
    if sess.restriction.at_least(UserRestriction::ReadOnly) {
        return Err(ForumError::restricted());
    }
    Ok(())
}

pub fn require_moderator(sess: &Session) -> ForumResult<()> {
    require_active(sess)?;
    if !sess.is_moderator() {
        return Err(ForumError::forbidden());
    }
    Ok(())
}

pub fn require_admin(sess: &Session) -> ForumResult<()> {
    require_active(sess)?;
    if !sess.is_admin() {
        return Err(ForumError::forbidden());
    }
    Ok(())
}

/// Non-admins may only edit their own record and only its open fields.
pub fn check_user_edit(sess: &Session, edit: &UserEdit) -> ForumResult<()> {
    require_active(sess)?;
    if (edit.id != sess.user_id || edit.touches_protected()) && !sess.is_admin() {
        return Err(ForumError::forbidden());
    }
    Ok(())
}

/// Ownership rule for posts and topics once the owner is known.
pub fn check_content_owner(sess: &Session, owner_id: EntityId) -> ForumResult<()> {
    if sess.is_moderator() || owner_id == sess.user_id {
        Ok(())
    } else {
        Err(ForumError::forbidden())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::UserLevel;

    fn session(user_id: EntityId, level: UserLevel, restriction: UserRestriction) -> Session {
        let mut sess = Session::new();
        sess.user_id = user_id;
        sess.level = level;
        sess.restriction = restriction;
        sess
    }

    #[test]
    fn test_anonymous_is_not_authorized() {
        let err = require_can_write(&Session::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotAuthorized);
    }

    #[test]
    fn test_read_only_cannot_write() {
        let sess = session(1, UserLevel::Admin, UserRestriction::ReadOnly);

        assert_eq!(require_can_write(&sess).unwrap_err().kind, ErrorKind::Restricted);
        assert!(require_admin(&sess).is_ok());
    }

    #[test]
    fn test_banned_is_rejected_everywhere() {
        let sess = session(1, UserLevel::Admin, UserRestriction::Banned);

        for result in [require_active(&sess), require_admin(&sess), require_moderator(&sess)] {
            let err = result.unwrap_err();
            assert_eq!(err.kind, ErrorKind::Restricted);
            assert_eq!(err.message, "You are banned");
        }
    }

    #[test]
    fn test_levels() {
        let member = session(1, UserLevel::None, UserRestriction::None);
        let moderator = session(2, UserLevel::Mod, UserRestriction::None);

        assert_eq!(require_moderator(&member).unwrap_err().kind, ErrorKind::Forbidden);
        assert!(require_moderator(&moderator).is_ok());
        assert_eq!(require_admin(&moderator).unwrap_err().kind, ErrorKind::Forbidden);
    }

    #[test]
    fn test_user_edit_rules() {
        let member = session(5, UserLevel::None, UserRestriction::None);
        let admin = session(1, UserLevel::Admin, UserRestriction::None);

        let mut own = UserEdit::new(5);
        own.nickname = Some("renamed".into());
        assert!(check_user_edit(&member, &own).is_ok());

        let other = UserEdit::new(6);
        assert_eq!(check_user_edit(&member, &other).unwrap_err().kind, ErrorKind::Forbidden);
        assert!(check_user_edit(&admin, &other).is_ok());

        let mut promote_self = UserEdit::new(5);
        promote_self.level = Some(UserLevel::Admin);
        assert_eq!(
            check_user_edit(&member, &promote_self).unwrap_err().kind,
            ErrorKind::Forbidden
        );
    }

    #[test]
    fn test_content_owner() {
        let member = session(5, UserLevel::None, UserRestriction::None);
        let moderator = session(2, UserLevel::Mod, UserRestriction::None);

        assert!(check_content_owner(&member, 5).is_ok());
        assert!(check_content_owner(&member, 6).is_err());
        assert!(check_content_owner(&moderator, 6).is_ok());
    }
}
