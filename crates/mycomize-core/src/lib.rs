// mycomize-core: Gateway integration layer for Mycomize
//
// Connection health, entity catalog caching, grow/stage linking, filter
// preferences, live state polling and credential handoff for
// Home-Assistant-compatible gateways.

pub mod catalog;
pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod filter;
pub mod fingerprint;
pub mod handoff;
pub mod hub;
pub mod link;
pub mod model;
pub mod refresher;
pub mod selection;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────
pub use catalog::{CacheEntry, EntityCatalogCache};
pub use config::{HubConfig, TlsVerification};
pub use connection::{ConnectionProbe, ProbeFailure, ProbeReport, StatusBoard};
pub use error::{AuthScope, CoreError};
pub use events::{EventBus, HubEvent};
pub use filter::{FilterPreferenceStore, FilterPreferences, MemoryPreferences, PreferenceBackend};
pub use fingerprint::CredentialFingerprint;
pub use handoff::{CredentialHandoff, CredentialSlot, MemorySlot};
pub use hub::GatewayHub;
pub use link::{BackendLinkSink, BulkOutcome, EntityLinkManager, ItemFailure, LinkSink};
pub use model::{
    ConnectionStatus, DisconnectReason, Entity, EntityRef, Gateway, GatewayForm, GatewayId,
    GatewayKind, GrowId, LiveState, LiveValue, Stage,
};
pub use refresher::{LiveSnapshot, RefresherHandle, StateRefresher};
pub use selection::SelectionController;
pub use store::{LinkRecord, LinkState, LinkTable};
