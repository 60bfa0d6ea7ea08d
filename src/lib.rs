pub mod auth;
pub mod config;
pub mod constants;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod server;
pub mod service;
pub mod storage;
pub mod types;
pub mod view;
