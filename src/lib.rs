//! Agora - a small social network backend
//!
//! Accounts, posts, comments, likes, follows, groups and media uploads
//! served over a JSON API.
//!
//! # Architecture
//! - `storage`: SeaORM storage and data access
//! - `services`: business logic shared by HTTP handlers and the CLI
//! - `api`: HTTP services, JWT and middleware
//! - `cli`: command-line interface
//! - `config`: configuration management
//! - `runtime`: application lifecycle and server mode
//! - `system`: logging setup

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
