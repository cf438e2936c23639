// mycomize-api: Async Rust clients for Home-Assistant gateways and the Mycomize backend

pub mod auth;
pub mod backend;
pub mod error;
pub mod gateway;
mod response;
pub mod transport;

pub use auth::GatewayKind;
pub use backend::BackendClient;
pub use error::Error;
pub use gateway::GatewayClient;
pub use transport::{TlsMode, TransportConfig};
