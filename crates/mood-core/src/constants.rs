/// Score every item gets from an untrained model (uniform prior).
pub const UNTRAINED_SCORE: f64 = 0.5;

/// Reactions required before training is attempted.
pub const MIN_TRAINING_REACTIONS: usize = 10;

/// Inverse L2 regularization strength `C`.
pub const DEFAULT_REGULARIZATION: f64 = 1.0;

/// Newton iteration cap for fitting.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Largest parameter step at which fitting counts as converged.
pub const DEFAULT_TOLERANCE: f64 = 1e-8;
