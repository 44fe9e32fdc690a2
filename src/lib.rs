// Library exports for wit
// This allows integration tests and external code to use wit modules

pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod media;
pub mod repository;
pub mod routes;
pub mod state;
