//! Kursbot Common Types
//!
//! This crate contains shared types used across kursbot, including
//! identifiers, currency rates, users and the error types of the
//! persistence collaborators.

pub mod identifiers;
pub mod monetary;
pub mod user;
pub mod error;

pub use identifiers::*;
pub use monetary::*;
pub use user::*;
pub use error::*;
