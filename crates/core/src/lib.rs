//! Core of a streaming AI character: input arbitration, conversation
//! memory, mood tracking and the consumer loop that ties them together.

pub mod arbiter;
pub mod cognition;
pub mod config;
pub mod identity;
pub mod io;
pub mod memory;
pub mod prompts;
pub mod runtime;
pub mod types;
