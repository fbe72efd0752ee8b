//! Deferred operation pipeline: chain recording, classification,
//! in-memory evaluation, and transactional execution.

pub mod eval;
pub mod handle;
pub mod ops;

pub use handle::TableHandle;
pub use ops::{Direction, FilterCondition, FilterOp, Operation};
