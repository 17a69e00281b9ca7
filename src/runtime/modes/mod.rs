//! Mode routing
//!
//! Only the HTTP server is a long-running mode; the one-shot CLI commands
//! live in `crate::cli`.

pub mod server;

pub use server::run_server;
