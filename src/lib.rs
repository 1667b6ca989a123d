pub mod api;
pub mod config;
pub mod db;
pub mod devices;
pub mod readings;
pub mod retention;
