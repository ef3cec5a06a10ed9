pub mod format;

pub use format::{describe_model, format_formula, format_preview, PreviewRow};
