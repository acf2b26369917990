// Dense and dropout layers
pub mod layers;

// Gated recurrent layer with backpropagation through time
pub mod lstm;

// The per-request sequence model
pub mod network;

// Adam optimizer
pub mod optimizer;

pub use network::SequenceModel;
