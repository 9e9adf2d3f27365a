//! Connection session: per-connection state and the split receiver/sender
//! task pair that owns it.

mod conn_info;
mod connection;

pub use conn_info::ConnInfo;
pub use connection::{Connection, run};
