// =============================================================================
// Signals Module
// =============================================================================
//
// Maps rolling statistics onto the discrete LONG / SHORT / NEUTRAL signal.

pub mod classifier;

pub use classifier::SignalClassifier;
