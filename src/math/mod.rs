//! Numeric helpers shared by the fitting code.

pub mod ols;

pub use ols::solve_least_squares;
