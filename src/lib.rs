pub mod config;
pub mod content;
pub mod db;
pub mod utils;
pub mod app;
