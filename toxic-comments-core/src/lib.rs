pub mod config;
pub mod dataset;
pub mod entity;
pub mod error;
pub mod table;
