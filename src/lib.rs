pub mod app;
pub mod config;
pub mod correction;
pub mod error;
pub mod opendata;
pub mod output;
pub mod record;
pub mod render;
pub mod resolver;
pub mod selection;
pub mod store;
