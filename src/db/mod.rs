pub mod connection;
pub mod properties;
pub mod scrapes;
pub mod stats;
pub mod store;
pub mod verification_runs;

pub use connection::{init_db, Database};
pub use properties::SqliteStore;
pub use store::{PropertyStore, SelectedProperty, SelectionCursor, SelectionQuery, StatusUpdateReport};
