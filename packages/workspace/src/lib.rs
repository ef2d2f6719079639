pub mod events;
pub mod server;
pub mod sessions;

pub use events::{DocumentUpdated, Indexer, LogIndexer, SaveHooks};
pub use server::{build_router, ApiError, AppState, SessionId, SESSION_COOKIE};
pub use sessions::{SessionData, SessionStore};
