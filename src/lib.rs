// Library for tests to access modules

pub mod aggregator;
pub mod calculator;
pub mod collectors;
pub mod config;
pub mod docker_repo;
pub mod error;
pub mod models;
pub mod reader;
pub mod routes;
pub mod scheduler;
pub mod sysinfo_repo;
