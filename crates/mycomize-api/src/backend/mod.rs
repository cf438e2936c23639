// Mycomize backend IoT surface
//
// CRUD for gateways and their entity rows, plus the per-entity link and
// unlink endpoints scoped to a grow and stage.

pub mod client;
pub mod models;

pub use client::BackendClient;
pub use models::{
    BulkEntityCreate, BulkEntityIds, EntityCreate, EntityRecord, EntityUpdate, GatewayRecord,
    GatewayWrite, LinkRequest,
};
