mod memory;
mod source;
mod sqlite;
pub mod types;

pub use memory::InMemoryGameStore;
pub use source::GameStore;
pub use sqlite::SqliteGameStore;
pub use types::{Sample, TrackedGame};
