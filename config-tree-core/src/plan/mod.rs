//! Minimal-diff statement planning.
//!
//! Two shapes of desired state are supported: flat sections (scalars, lists of
//! scalars, and one level of sub-mapping) and record lists correlated by an
//! identity field. Neither walks deeper than that.

pub mod error;
pub mod guard;
pub mod record;
pub mod section;

pub use error::DiffError;
pub use guard::{guard_tree, AcceptAll, ValueGuard};
pub use record::{plan_record, Compare, FieldRule, Presence, RecordPlan, RecordSchema};
pub use section::{plan_section, CreatePolicy, KeyHint};
