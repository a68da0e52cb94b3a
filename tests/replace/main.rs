//! Integration tests for record replacement across storage layouts.


mod concurrency;
mod config;
mod lifecycle;
mod properties;
mod replication;
mod scenarios;
mod truncation;
