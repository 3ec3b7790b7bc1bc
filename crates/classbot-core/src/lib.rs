//! Core classbot library (config, credentials, Classroom client).

pub mod auth;
pub mod classroom;
pub mod config;
pub mod error;
