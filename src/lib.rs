pub mod api;
pub mod commands;
pub mod config;
pub mod models;
pub mod stats;
pub mod storage;
