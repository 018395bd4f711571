pub mod app;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod output;
pub mod planner;
pub mod progress;
pub mod scheduler;
pub mod store;
pub mod tui;
