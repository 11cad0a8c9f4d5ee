// lib.rs - Library exports for the service binary and integration tests

pub mod config;
pub mod bootstrap;
pub mod chain;
pub mod math;
pub mod engine;
pub mod web;
