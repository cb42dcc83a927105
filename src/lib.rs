pub mod aggregation;
pub mod analysis;
pub mod chart;
pub mod cli;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod sample_data;
pub mod summary;
pub mod utils;
