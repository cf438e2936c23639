// ── Entity linking ──
//
// `EntityLinkManager` applies link/unlink decisions optimistically to the
// `LinkTable` and confirms them through a `LinkSink`. `BackendLinkSink`
// is the production sink; tests plug in their own.

mod backend;
mod manager;

pub use backend::BackendLinkSink;
pub use manager::{BulkOutcome, EntityLinkManager, ItemFailure, LinkSink};
