//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables.

/// Company registry model
pub mod company;
/// Device registry model
pub mod device;
/// Telemetry reading model
pub mod telemetry;
/// User-company association model
pub mod user_company;
