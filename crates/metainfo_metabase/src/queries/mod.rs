//! Database query functions.
//!
//! Read-side helpers used for verifying and reporting on migrated data:
//! - `object`: objects of a bucket
//! - `segment`: segments of a stream

mod object;
mod segment;

pub use object::*;
pub use segment::*;
