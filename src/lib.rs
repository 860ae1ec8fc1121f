//! FDV dashboard: values a token allocation program at reference-token FDVs
//! and at a TVL-scaled FDV, serves the figures over HTTP and writes a CSV report.

pub mod config;
pub mod market;
pub mod program;
pub mod report;
pub mod server;
pub mod valuation;
