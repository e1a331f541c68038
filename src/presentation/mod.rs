//! HTTP surface: middleware, routes, and response models

pub mod middleware;
pub mod models;
pub mod routes;
