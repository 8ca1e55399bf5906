//! Filename and object-key composition helpers.
//!
//! Staged captures and stored visit images share the same naming scheme:
//! a sortable `yyyyMMdd_HHmmss` timestamp plus a short random token so that
//! concurrent captures never collide without any locking.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Timestamp format used in staged filenames and object keys.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Format an instant as the filename timestamp slug.
pub fn timestamp_slug(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Generate an 8-character random token for filename uniqueness.
pub fn short_token() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}

/// Generate an opaque external id for a face with no prior enrollment.
pub fn unknown_external_id() -> String {
    format!("Unknown-{}", Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_slug_is_sortable() {
        let earlier = Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        assert!(timestamp_slug(earlier) < timestamp_slug(later));
        assert_eq!(timestamp_slug(earlier), "20240101_093000");
    }

    #[test]
    fn short_token_is_eight_chars() {
        let token = short_token();
        assert_eq!(token.len(), 8);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn short_tokens_differ() {
        assert_ne!(short_token(), short_token());
    }

    #[test]
    fn unknown_external_id_has_prefix() {
        let ext = unknown_external_id();
        assert!(ext.starts_with("Unknown-"));
        assert!(ext.len() > "Unknown-".len());
    }
}
