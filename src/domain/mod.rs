// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Order placement and fulfillment rules. Storage is reached only through
// the traits in `crate::store`, so this layer never sees SQL.
//
// ============================================================================

pub mod order;
