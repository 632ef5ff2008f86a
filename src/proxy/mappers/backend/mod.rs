// Backend mapper module
// Responsible for envelope parsing/unwrapping

pub mod envelope;

pub use envelope::*;
