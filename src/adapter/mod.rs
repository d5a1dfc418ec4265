//! Concrete implementations of the outbound ports.

pub mod broker;
pub mod channel;
pub mod directory;
pub mod llm;
