//! Service layer for business logic.

pub mod notes;
pub mod tags;
pub mod users;

pub use notes::{BulkUpsertOutcome, NoteService, UploadedFile};
pub use tags::TagService;
pub use users::UserService;
