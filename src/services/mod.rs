//! Business logic services used by the HTTP handlers.

/// Company-scoped authorization checks
pub mod authz;
/// Company lifecycle, including the cascading delete
pub mod company_service;
/// Device lifecycle and telemetry joins
pub mod device_service;
