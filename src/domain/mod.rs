// Domain-specific error types
pub mod errors;

// Price series value types
pub mod market;

// Port interfaces
pub mod ports;

// Trade signal decision rule
pub mod signal;
