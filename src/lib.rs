pub mod config;
pub mod domain;
pub mod error;
pub mod filters;
pub mod graphql;
pub mod logging;
pub mod metrics;
pub mod report;
pub mod server;
pub mod storage;
pub mod tasks;
pub mod validation;
