// ── Domain model ──
//
// Types shared by every subsystem. Wire shapes live in mycomize-api;
// these are the shapes the rest of the crate reasons about.

mod entity;
mod gateway;
mod ids;
mod live;
mod status;

pub use entity::{Entity, domain_of};
pub use gateway::{Gateway, GatewayForm};
pub use ids::{EntityRef, GatewayId, GrowId, Stage};
pub use live::{LiveState, LiveValue};
pub use status::{ConnectionStatus, DisconnectReason};

pub use mycomize_api::GatewayKind;
