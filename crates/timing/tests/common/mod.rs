/// Micro-op stream and configuration builders.
pub mod builder;

/// Engine harness and log setup.
pub mod harness;

/// Mock collaborators.
pub mod mocks;
