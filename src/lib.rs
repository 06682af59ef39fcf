// Library root — exposes internals for integration tests and the binary.
// The binary entry point is src/main.rs.

pub mod assistant;
pub mod briefing;
pub mod chain;
pub mod config;
pub mod console;
pub mod error;
pub mod image;
pub mod intent;
pub mod llm;
pub mod logger;
pub mod media;
pub mod prefs;
pub mod provider;
pub mod runtime;
pub mod search;
pub mod server;
pub mod services;
pub mod social;
