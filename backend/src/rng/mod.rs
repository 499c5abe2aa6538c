//! Deterministic random number generation
//!
//! All randomness in the simulation flows through [`RngManager`].
//! Same seed → same world, same mail, same day-by-day results.

pub mod xorshift;

pub use xorshift::RngManager;
