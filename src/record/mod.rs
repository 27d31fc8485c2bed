//! Record base abstraction.
//!
//! Every storable entity embeds an [`Identity`] and implements [`Record`].
//! Identity starts transient and is assigned by the store on first `put`;
//! once assigned it becomes the equality key for the record.

mod identity;
mod macros;
mod traits;

pub use identity::{Identity, IdentityKey};
pub use traits::{AnyRecord, Record};
