pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod database;
pub mod paging;
pub mod presentation;
pub mod remote;
pub mod telemetry;
pub mod users;
pub mod utils;
