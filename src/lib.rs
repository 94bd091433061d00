// User and database administration rules
pub mod admin;

// HTTP API: login, token guard, admin endpoints
pub mod api;

// Bearer token extraction and request authentication
pub mod auth;

// Per-request database connections
pub mod broker;

// Server configuration and process secrets
pub mod config;

// Credential records and token sealing
pub mod credentials;
