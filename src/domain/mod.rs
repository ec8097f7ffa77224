//! Domain layer types and invariants.

pub mod drug;
pub mod error;
pub mod users;
