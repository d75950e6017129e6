//! Protocol module for decoding sensor payloads.

pub mod measurement;

pub use measurement::Measurement;
