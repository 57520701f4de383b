//! Pairing generation for singles and doubles sessions

pub mod generator;

pub use generator::PairingGenerator;
