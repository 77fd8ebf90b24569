//! Domain types.

mod entry;
mod scope;

pub use entry::Entry;
pub use scope::{Scope, ScopeHandle};
