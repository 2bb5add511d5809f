//! Encoding layer (spec §4.1-4.2, components C1-C2).

pub mod key;
pub mod value;
