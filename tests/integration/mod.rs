//! Integration tests for the gateway.

pub mod cedula_test;
pub mod common;
pub mod snowflake_test;
