pub mod aggregation;
pub mod bisect;
pub mod classify;
pub mod cli;
pub mod config;
pub mod data;
pub mod dates;
pub mod defaults;
pub mod ingest;
pub mod merge;
pub mod parsers;
pub mod publisher;
pub mod record_store;
pub mod reporting;
pub mod server;
pub mod storage;
