//! Generate, validate and parse the inputs and outputs of CIPHER phase-field simulations.
//!
//! Input definitions live in [`cipher_core`] and are re-exported at the crate root.
//! Parsing of completed simulations lives in [`output`].

pub use cipher_core::*;
pub use cipher_output as output;
