//! Test server and client helpers: spins up a real `melodious` server
//! in-process (an ephemeral SQLite database, a real `TcpListener`, the
//! crate's own accept loop) and drives it with a real WebSocket client,
//! so these tests exercise the same code paths a live client would.

mod client;
mod server;

pub use client::TestClient;
pub use server::TestServer;
