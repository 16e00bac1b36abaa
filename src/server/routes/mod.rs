//! HTTP route handlers

pub mod tabular;
pub mod vision;
