pub mod app;
pub mod completeness;
pub mod config;
pub mod credentials;
pub mod domain;
pub mod error;
pub mod output;
pub mod record;
pub mod registry;
pub mod roster;
pub mod store;
pub mod submit;
pub mod transform;
