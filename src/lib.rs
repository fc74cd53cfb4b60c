pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod observability;
pub mod pricing;
pub mod settlement;
pub mod state;
pub mod stations;
pub mod validation;
