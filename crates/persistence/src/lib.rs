pub mod records;
pub mod store;

pub use records::{current_version, ProcessingResult, Store, Versioned};
pub use store::Database;
