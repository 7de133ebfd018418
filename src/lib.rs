pub mod config;
pub mod entity;
pub mod logging;
pub mod output;
pub mod ranking;
pub mod scoring;
pub mod store;
