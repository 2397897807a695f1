//! # Policies
//!
//! [`RecipientPolicy`] is the stock handler: per-recipient sender allow-lists
//! backed by an immutable [`RecipientMap`].

pub mod recipient_map;
pub mod recipient_policy;

pub use recipient_map::{anglize, RecipientMap};
pub use recipient_policy::RecipientPolicy;
