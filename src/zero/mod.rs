//! Zero handling for compositions entering log-ratio transforms.

pub mod replace;

pub use replace::{adaptive_delta, additive_replacement, multiplicative_replacement};
