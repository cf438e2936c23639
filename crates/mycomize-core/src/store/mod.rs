// ── Link store ──
//
// The join relation between gateway entities and (grow, stage) contexts.

mod link_table;

pub use link_table::{LinkRecord, LinkState, LinkTable};
