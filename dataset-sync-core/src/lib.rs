//! dataset-sync core library: domain types, filesystem layout, errors.
//!
//! - [`types`]: object keys, dataset stems and specification entries
//! - [`layout`]: [`SyncLayout`], the single source of every synced path
//! - [`error`]: [`CoreError`]

pub mod error;
pub mod layout;
pub mod types;

pub use error::CoreError;
pub use layout::SyncLayout;
pub use types::{
    DatasetStem, ObjectKey, SpecificationEntry, BUILDER_KEYS, DIGITAL_LAND_BUILDER_KEY,
    ENTITY_BUILDER_KEY,
};
