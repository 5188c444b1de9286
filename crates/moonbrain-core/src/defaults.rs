//! Centralized default constants for moonbrain.
//!
//! All crates reference these constants instead of defining their own
//! magic numbers.

// =============================================================================
// PAGINATION
// =============================================================================

/// Page size used when a list request leaves `limit` unset.
pub const PAGE_LIMIT: i64 = 10;

/// Page offset used when a list request leaves `offset` unset.
pub const PAGE_OFFSET: i64 = 0;

// =============================================================================
// NOTE GRAPH
// =============================================================================

/// Prefix marking a linked article URL as a reference to another note.
pub const LINK_ID_PREFIX: &str = "id:";

// =============================================================================
// AUTH
// =============================================================================

/// Permission string granted to newly issued API tokens.
pub const API_TOKEN_PERMISSIONS: &str = "w";

/// Length of the `"Bearer "` scheme prefix in the Authorization header.
pub const BEARER_PREFIX_LEN: usize = 7;

/// OAuth provider identifier stored on users created through GitHub login.
pub const GITHUB_PROVIDER: &str = "github";

// =============================================================================
// STORAGE
// =============================================================================

/// Directory that receives uploaded note images.
pub const MEDIA_PATH: &str = "./media";

/// Maximum length of a stored file name.
pub const MAX_FILENAME_LEN: usize = 255;
