//! # Table Store
//!
//! A process-local, file-backed table store persisted as a single JSON
//! document.
//!
//! ## Core Concepts
//!
//! - **Records**: typed entities with a store-assigned identity
//! - **Tables**: all persisted records of one type, keyed by identity
//! - **Predicates**: composable filters built from field accessors
//! - **Codecs**: the registry that turns typed values into tagged JSON
//!
//! ## Example
//!
//! ```ignore
//! use warehub_store::{model::Project, Store, StoreConfig};
//!
//! let store = Store::new(StoreConfig::in_dir("./index", "data.json"));
//! warehub_store::model::register_all(&store);
//!
//! // Stage a record; it gets the first free identity in its table.
//! let id = store.put_one(&mut Project::new("warehub"))?;
//!
//! // Query by field.
//! let found = store.get(Some(&Project::name().eq("^ware")))?;
//!
//! // Persist everything.
//! assert!(store.commit());
//! ```

pub mod codec;
pub mod dataset;
pub mod error;
pub mod model;
pub mod predicate;
pub mod record;
pub mod store;
pub mod types;

// Re-exports
pub use codec::{CodecRegistry, Decoded, Decoder, Encoder};
pub use dataset::{Dataset, LAST_COMMIT_KEY};
pub use error::{Result, StoreError};
pub use predicate::{CompareOp, Comparison, Field, FieldValue, Predicate};
pub use record::{AnyRecord, Identity, IdentityKey, Record};
pub use store::{Store, StoreConfig};
pub use types::*;
