//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Performs business logic (database queries, validation)
//! 3. Returns HTTP response (JSON, status code)

/// Company management endpoints
pub mod companies;
/// Device management endpoints
pub mod devices;
/// Health check endpoint
pub mod health;
/// Telemetry ingest and query endpoints
pub mod telemetry;
/// User-company association endpoints
pub mod user_companies;
