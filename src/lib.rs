pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod docs;
pub mod documents;
pub mod error;
pub mod ledger;
pub mod model;
pub mod models;
pub mod payroll;
pub mod routes;
pub mod state;
pub mod store;
pub mod utils;
pub mod wizard;
