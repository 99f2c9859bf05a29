// ============================================================================
// Actors Module
// ============================================================================
//
// Actor-based infrastructure for background concerns.
//
// Structure:
// - core/           - Shared types (HealthStatus, ComponentHealth)
// - health_monitor  - Periodic store probe and system health aggregation
//
// Note: Order logic uses the command handler and query service, NOT actors.
//       Actors are reserved for infrastructure concerns only.
//
// ============================================================================

// Private module declarations
mod core;
mod health_monitor;

pub use self::core::{ComponentHealth, HealthStatus};
pub use health_monitor::{GetSystemHealth, HealthMonitorActor, SystemHealth, UpdateHealth};
