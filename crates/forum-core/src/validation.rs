//! # Validation Module
//!
//! Input validation for forum operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Transport (query schema)                                     │
//! │  └── Types, required fields                                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Use-case (Rust)                                              │
//! │  └── THIS MODULE: trimming, lengths, pagination bounds                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Services + Database                                          │
//! │  ├── Referenced entities exist (inside the transaction)                │
//! │  └── UNIQUE nickname index                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! String validators return the trimmed value so callers store exactly
//! what was checked. Lengths count characters, not bytes.

use crate::error::ValidationError;
use crate::types::{EntityId, Pagination, UserInfo};
use crate::{
    MAX_DESCRIPTION_LENGTH, MAX_INFO_FIELD_LENGTH, MAX_NICKNAME_LENGTH, MAX_PASSWORD_LENGTH,
    MAX_POST_LENGTH, MAX_SECTION_NAME_LENGTH, MAX_TOPIC_NAME_LENGTH, MIN_NICKNAME_LENGTH,
    MIN_PASSWORD_LENGTH,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn trimmed_in_range(field: &str, value: &str, min: usize, max: usize) -> ValidationResult<String> {
    let value = value.trim();
    let len = value.chars().count();

    if len == 0 && min > 0 {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if len < min || len > max {
        return Err(ValidationError::Length {
            field: field.to_string(),
            min,
            max,
        });
    }
    Ok(value.to_string())
}

pub fn validate_nickname(nickname: &str) -> ValidationResult<String> {
    trimmed_in_range("Nickname", nickname, MIN_NICKNAME_LENGTH, MAX_NICKNAME_LENGTH)
}

/// Passwords are checked as given; whitespace is significant.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH || len > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::Length {
            field: "Password".to_string(),
            min: MIN_PASSWORD_LENGTH,
            max: MAX_PASSWORD_LENGTH,
        });
    }
    Ok(())
}

pub fn validate_section_name(name: &str) -> ValidationResult<String> {
    trimmed_in_range("Section name", name, 1, MAX_SECTION_NAME_LENGTH)
}

/// Blank descriptions are stored as absent.
pub fn validate_description(description: Option<&str>) -> ValidationResult<Option<String>> {
    match description {
        None => Ok(None),
        Some(text) => {
            let text = trimmed_in_range("Description", text, 0, MAX_DESCRIPTION_LENGTH)?;
            Ok(if text.is_empty() { None } else { Some(text) })
        }
    }
}

/// Like [`validate_description`], but keeps a blank value as `Some("")`,
/// which a sparse edit reads as "clear".
pub fn validate_description_edit(description: Option<&str>) -> ValidationResult<Option<String>> {
    description
        .map(|text| trimmed_in_range("Description", text, 0, MAX_DESCRIPTION_LENGTH))
        .transpose()
}

pub fn validate_topic_name(name: &str) -> ValidationResult<String> {
    trimmed_in_range("Topic name", name, 1, MAX_TOPIC_NAME_LENGTH)
}

pub fn validate_post_text(text: &str) -> ValidationResult<String> {
    trimmed_in_range("Post text", text, 1, MAX_POST_LENGTH)
}

/// Trims every present field of the secondary info.
pub fn validate_user_info(info: UserInfo) -> ValidationResult<UserInfo> {
    let field = |name: &str, value: Option<String>| -> ValidationResult<Option<String>> {
        value
            .map(|v| trimmed_in_range(name, &v, 0, MAX_INFO_FIELD_LENGTH))
            .transpose()
    };

    Ok(UserInfo {
        phone: field("Phone", info.phone)?,
        email: field("Email", info.email)?,
        first_name: field("First name", info.first_name)?,
        last_name: field("Last name", info.last_name)?,
    })
}

// =============================================================================
// Listing Validators
// =============================================================================

pub fn validate_pagination(pagination: &Pagination, max_limit: i64) -> ValidationResult<()> {
    if pagination.limit < 1 || pagination.limit > max_limit {
        return Err(ValidationError::OutOfRange {
            field: "Limit".to_string(),
            min: 1,
            max: max_limit,
        });
    }
    // The row offset (page - 1) * limit must fit in an i64.
    let max_skipped = i64::MAX / pagination.limit;
    if pagination.page < 1 || pagination.page - 1 > max_skipped {
        return Err(ValidationError::OutOfRange {
            field: "Page".to_string(),
            min: 1,
            max: max_skipped.saturating_add(1),
        });
    }
    Ok(())
}

/// Bounds the size of an id list filter.
pub fn validate_id_list(
    field: &str,
    ids: Option<&Vec<EntityId>>,
    max: usize,
) -> ValidationResult<()> {
    match ids {
        Some(ids) if ids.len() > max => Err(ValidationError::TooMany {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_nickname() {
        assert_eq!(validate_nickname("  alice ").unwrap(), "alice");
        assert!(matches!(validate_nickname("   "), Err(ValidationError::Required { .. })));
        assert!(matches!(validate_nickname("ab"), Err(ValidationError::Length { .. })));
        assert!(validate_nickname(&"x".repeat(33)).is_err());
        assert!(validate_nickname("ñandú").is_ok());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret").is_ok());
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn test_validate_description() {
        assert_eq!(validate_description(None).unwrap(), None);
        assert_eq!(validate_description(Some("   ")).unwrap(), None);
        assert_eq!(
            validate_description(Some(" News ")).unwrap(),
            Some("News".to_string())
        );

        assert_eq!(validate_description_edit(None).unwrap(), None);
        assert_eq!(
            validate_description_edit(Some("  ")).unwrap(),
            Some(String::new())
        );
    }

    #[test]
    fn test_validate_post_text() {
        assert!(validate_post_text("").is_err());
        assert_eq!(validate_post_text(" hi ").unwrap(), "hi");
    }

    #[test]
    fn test_validate_user_info() {
        let info = validate_user_info(UserInfo {
            email: Some(" a@b.c ".into()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(info.email.as_deref(), Some("a@b.c"));
        assert!(info.phone.is_none());
    }

    #[test]
    fn test_validate_pagination() {
        assert!(validate_pagination(&Pagination::new(20, 1), 100).is_ok());
        assert!(validate_pagination(&Pagination::new(0, 1), 100).is_err());
        assert!(validate_pagination(&Pagination::new(101, 1), 100).is_err());
        assert!(validate_pagination(&Pagination::new(20, 0), 100).is_err());

        let last = i64::MAX / 20 + 1;
        assert!(validate_pagination(&Pagination::new(20, last), 100).is_ok());
        assert!(validate_pagination(&Pagination::new(20, last + 1), 100).is_err());
        assert!(validate_pagination(&Pagination::new(20, i64::MAX), 100).is_err());
        assert!(validate_pagination(&Pagination::new(1, i64::MAX), 100).is_ok());
    }

    #[test]
    fn test_validate_id_list() {
        let ids = vec![1, 2, 3];
        assert!(validate_id_list("ids", Some(&ids), 3).is_ok());
        assert!(validate_id_list("ids", Some(&ids), 2).is_err());
        assert!(validate_id_list("ids", None, 2).is_ok());
    }
}
