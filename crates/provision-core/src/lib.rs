pub mod catalog;
pub mod config;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod persistence;
pub mod pinning;
pub mod resolver;
pub mod selection;
pub mod sqlite;
