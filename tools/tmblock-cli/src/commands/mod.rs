pub mod composite;
pub mod config;
