//! Request and response models for the directory API.
//!
//! Field names follow the admin frontend's snake_case JSON.

mod announcement;
mod college;
mod exam;
mod generation;

pub use announcement::*;
pub use college::*;
pub use exam::*;
pub use generation::*;
