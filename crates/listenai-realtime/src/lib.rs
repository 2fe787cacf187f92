//! Client library for the ListenAI real-time voice interaction service.
//!
//! The flow is: sign the device credentials and exchange them for a
//! short-lived access token ([`auth`]), open the persistent interaction
//! socket ([`transport`]), then frame outbound turns and classify inbound
//! events ([`protocol`]). Terminal concerns live in the console service, not
//! here.

pub mod auth;
pub mod error;
pub mod protocol;
pub mod transport;

pub use auth::{AccessToken, Authenticator, DeviceIdentity};
pub use error::{AuthError, ProtocolError, TransportError};
pub use protocol::{InboundEvent, TurnConfig};
pub use transport::{Session, TransportEvent};
