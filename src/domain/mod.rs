//! Domain layer types and pure derivations.

pub mod entities;
pub mod listing;
pub mod pricing;
pub mod status;
