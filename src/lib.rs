//! Pipeline step that downloads a listings table from an artifact store,
//! drops duplicate and out-of-range rows, normalises review dates, and logs
//! the result as a new artifact version.

pub mod cleaner;
pub mod data;
pub mod error;
pub mod logging;
pub mod store;

pub use cleaner::{clean, CleaningConfig, CleaningReport};
pub use error::CleanError;
pub use store::{ArtifactStore, LocalArtifactStore};
