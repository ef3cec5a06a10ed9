//! Numeric fitting: candidate families, per-family calibration, and
//! best-fit selection.

pub mod family;
pub mod fitter;
pub mod selection;

pub use family::predict;
pub use selection::{fit_and_select, FitSelection};
