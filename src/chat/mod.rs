//! Chat pipeline
//! Question extraction, prompt composition, and the streaming envelope

pub mod events;
pub mod extract;
pub mod handler;
pub mod mock;
pub mod prompt;
pub mod stream;
