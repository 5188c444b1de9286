//! UUID v7 utilities for time-ordered identifiers.
//!
//! Users and API tokens are keyed by UUIDv7 so that primary keys sort by
//! creation time.

use uuid::Uuid;

/// Generate a new UUIDv7 identifier.
///
/// # Example
///
/// ```
/// use moonbrain_core::uuid_utils::new_v7;
///
/// let id = new_v7();
/// assert_eq!(id.get_version_num(), 7);
/// ```
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}
