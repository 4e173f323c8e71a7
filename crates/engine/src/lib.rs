//! Dispatch engine: template rendering, recipient resolution, credit
//! accounting, batched fan-out and delivery tracking.

pub mod batcher;
pub mod delivery;
pub mod ledger;
pub mod resolver;
pub mod template;
