pub mod audit;
pub mod auth;
pub mod configuration;
pub mod email_client;
pub mod error;
pub mod logger;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod routes;
pub mod scheduler;
pub mod security;
pub mod startup;
pub mod telemetry;
pub mod validators;
pub mod verification_token;
