pub mod agent;
pub mod config;
pub mod error;
pub mod http;
pub mod llm;
