pub mod export;
pub mod ingest;

pub use export::write_predictions;
pub use ingest::{read_example_set, read_test_table, IngestedExamples, TestTable};
