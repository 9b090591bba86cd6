//! Infrastructure adapters for the ready queue.

pub mod queue;

pub use queue::InMemoryQueue;
