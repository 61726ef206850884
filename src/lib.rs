//! Download HEIS and LFS survey microdata and store it as Parquet, one file
//! per table per year.

pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod output;
pub mod provider;
pub mod request;
pub mod table;
pub mod write;
