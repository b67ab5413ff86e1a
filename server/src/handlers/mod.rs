//! Response builders for the schedule views.

mod schedule;

pub use schedule::*;
