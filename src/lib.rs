// src/lib.rs

pub mod agent;
pub mod config;
pub mod error;
pub mod http;
pub mod llm;
pub mod logging;
pub mod session;
pub mod store;
pub mod tools;

pub use agent::AgentLoop;
pub use config::Settings;
pub use error::GhostPathError;
pub use session::SessionRegistry;
pub use store::{Store, StorePort};
