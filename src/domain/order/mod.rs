// ============================================================================
// Order Domain - Placement, Inventory and Fulfillment Records
// ============================================================================
//
// This module contains ALL order-specific code:
// - Value objects (OrderStatus, DeliveryStatus, Coordinates)
// - Commands (PlaceOrder, OrderHeaderUpdate)
// - Errors (OrderError enum) and the per-operation deadline
// - Aggregate (Order, OrderItem, totals and validation rules)
// - Inventory ledger and pricing resolver
// - Command Handler (place / update / delete, one transaction each)
// - Query Service (get / list)
//
// Storage lives behind `crate::store`; nothing here knows about SQL.
//
// ============================================================================

pub mod value_objects;
pub mod commands;
pub mod errors;
pub mod deadline;
pub mod aggregate;
pub mod inventory;
pub mod pricing;
pub mod command_handler;
pub mod query;

// Re-export for convenience
pub use value_objects::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
pub use inventory::*;
pub use pricing::*;
pub use command_handler::*;
pub use query::*;
