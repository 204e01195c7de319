//! Generic configuration-tree primitives used by higher-level reconcilers.
//!
//! A [`ConfigTree`] models a remote configuration as JSON-like data. The
//! [`plan`] module turns a desired state plus the live tree into an ordered
//! list of [`Statement`]s; [`apply`] replays those statements in memory.

pub mod apply;
pub mod locate;
pub mod parser;
pub mod path;
pub mod plan;
pub mod statement;
pub mod tree;

pub use apply::{apply_all, ApplyError};
pub use locate::{locate, locate_all, record_at, record_entries, MatchIndex};
pub use parser::{parse_file, parse_json, parse_xml, ParseError};
pub use path::{PathError, Segment, TreePath};
pub use plan::{
    plan_record, plan_section, AcceptAll, Compare, CreatePolicy, DiffError, FieldRule, KeyHint,
    Presence, RecordPlan, RecordSchema, ValueGuard,
};
pub use statement::Statement;
pub use tree::{ConfigTree, Shape};
