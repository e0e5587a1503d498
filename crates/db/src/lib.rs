pub mod connection;
pub mod memory;
pub mod migrations;
pub mod revisions;

pub use connection::{connect, connect_with_settings, DbPool};
pub use memory::InMemoryQuoteRevisionStore;
pub use revisions::SqlQuoteRevisionStore;
