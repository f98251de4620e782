//! Macroeconomics research chat backend
//! Streams answers combining Valyu DeepResearch findings with an LLM completion

pub mod chat;
pub mod config;
pub mod error;
pub mod providers;
pub mod server;
