pub mod config;
pub mod routes;
pub mod startup;
pub mod store;
pub mod sweep;
pub mod termination;
