pub mod android;
pub mod classify;
pub mod config;
pub mod error;
pub mod executor;
pub mod host;
pub mod ios;
pub mod logging;
pub mod manager;
pub mod models;
pub mod poller;
pub mod unify;
