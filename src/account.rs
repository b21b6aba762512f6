//! Account, page, and identifier models persisted by the account store.

pub mod id;
pub mod page;
pub mod record;
pub mod secret;

pub use id::*;
pub use page::*;
pub use record::*;
pub use secret::*;
