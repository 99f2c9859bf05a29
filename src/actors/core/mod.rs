// ============================================================================
// Core Actor Abstractions
// ============================================================================
//
// Types shared between infrastructure actors and the HTTP layer.
//
// ============================================================================

pub mod health;

// Re-export core types
pub use health::*;
