pub mod api;
pub mod app;
pub mod auth;
pub mod catalog_seed;
pub mod config;
pub mod logging;
pub mod state;
