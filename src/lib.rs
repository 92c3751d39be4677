//! Warehouse gateway - a minimal HTTP gateway in front of a Snowflake warehouse.
//!
//! This library exposes the core modules for use by the binary and in
//! integration tests.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod logging;
pub mod middleware;
pub mod routes;
pub mod state;
