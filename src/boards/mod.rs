//! Contains concrete implementations of the `Rules` trait.

/// Hexagonal Havannah geometry and win detection.
pub mod havannah;
