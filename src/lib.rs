pub mod config;
pub mod extractors;
pub mod logging;
pub mod response;
pub mod routes;
pub mod source;
pub mod state;
pub mod store;
pub mod tracking;
pub mod validation;
pub mod workers;
