pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod models;
pub mod notification;
pub mod repository;
pub mod routes;
pub mod service;
pub mod storage;
pub mod telemetry;
pub mod validation;

#[cfg(test)]
mod testing;
