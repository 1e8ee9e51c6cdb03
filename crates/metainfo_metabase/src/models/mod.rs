//! Database models.
//!
//! These structs map directly to the `objects` and `segments` tables via sqlx.

mod object;
mod segment;

pub use object::{ObjectRow, ObjectStatus};
pub use segment::{NodeAliases, SegmentPosition, SegmentRow};
