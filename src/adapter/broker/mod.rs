//! Broker adapters.

mod memory;

pub use memory::MemoryBroker;
