//! Placeholder-based expressions.
//!
//! Conditions are kept as a typed tree so they can be rendered into the
//! database syntax (`#n0 = :c0 AND ...`) or evaluated directly against an
//! item. Update expressions are built from an ordered field mapping.

mod condition;
mod placeholders;
mod update;

pub use condition::{attr, key, Comparator, Condition, Path};
pub use placeholders::{Placeholders, RenderedCondition};
pub use update::{build_update, UpdateAction, UpdatePlan};
