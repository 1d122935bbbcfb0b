pub mod assistant;
pub mod auth;
pub mod chat;
pub mod commands;
pub mod config;
pub mod shared;
pub mod store;
