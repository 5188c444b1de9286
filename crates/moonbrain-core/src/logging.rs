//! Structured logging field name constants for moonbrain.
//!
//! `tracing` macros take field keys as identifiers, so call sites spell
//! these names out (`subsystem = "db", op = "bulk_upsert", ...`). The
//! constants are the registry those spellings must match; a test over the
//! workspace sources keeps them in sync.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, request failed or item skipped |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration (individual notes, tags, links) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Layer originating the log event. Values are listed in [`SUBSYSTEMS`].
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "note_service", "note_repository", "pool", "github"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "bulk_upsert", "get_notes", "upsert_graph_node"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Note identifier being operated on.
pub const NOTE_ID: &str = "note_id";

/// User UUID being operated on.
pub const USER_ID: &str = "user_id";

/// Search text supplied to a list query.
pub const QUERY: &str = "query";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of rows returned by a query.
pub const RESULT_COUNT: &str = "result_count";

/// Number of items submitted to a batch write.
pub const BATCH_SIZE: &str = "batch_size";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Every registered field name.
pub const FIELDS: &[&str] = &[
    SUBSYSTEM,
    COMPONENT,
    OPERATION,
    NOTE_ID,
    USER_ID,
    QUERY,
    DURATION_MS,
    RESULT_COUNT,
    BATCH_SIZE,
    POOL_SIZE,
    POOL_IDLE,
    ERROR_MSG,
];

/// Allowed values of the [`SUBSYSTEM`] field.
pub const SUBSYSTEMS: &[&str] = &["api", "service", "db", "auth"];
