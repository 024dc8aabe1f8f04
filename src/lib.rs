//! atlas: review-comment anchoring for unified diffs, plus the state and
//! collaborator plumbing around it.

pub mod app;
pub mod config;
pub mod diff;
pub mod filter;
pub mod fixtures;
pub mod github;
pub mod loader;
pub mod store;
pub mod sync;

pub use diff::{
    anchor_for_index, classify_line, map_line_to_index, parse_hunk_header, parse_patch,
    split_unified_diff, DiffLine, LineKind, LineType, Side,
};
