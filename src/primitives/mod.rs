//! Core compute primitives (Vector, Matrix).
//!
//! Row-major containers shared by the data layer, the resampling code and
//! every learner backend.

mod matrix;
mod vector;

pub use matrix::Matrix;
pub use vector::Vector;
