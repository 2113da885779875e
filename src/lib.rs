pub mod app;
pub mod checkm;
pub mod config;
pub mod domain;
pub mod download;
pub mod error;
pub mod fasta;
pub mod naming;
pub mod ncbi;
pub mod output;
pub mod report;
pub mod store;
