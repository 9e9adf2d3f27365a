//! The permission resolver: the algorithmically non-trivial core. Wraps the
//! store's flag-scope query with the owner short-circuit and exposes the
//! two entry points handlers actually call.

mod resolver;

pub use resolver::{PermError, PermResolver};
