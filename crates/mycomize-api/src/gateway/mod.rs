// Gateway REST surface (Home-Assistant compatible)
//
// `GET /api/`, `GET /api/states`, `GET /api/states/{entity_id}` and
// `POST /api/services/{domain}/{service}`.

pub mod client;
pub mod models;

pub use client::GatewayClient;
pub use models::{ApiStatus, RawState};
