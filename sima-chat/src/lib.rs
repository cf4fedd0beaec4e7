//! sima-chat: Talking to the persona backend
//!
//! Transports for the socket channel and the HTTP API, and the
//! `SessionController` that ties a conversation to speech and the avatar.

pub mod error;
pub mod transport;
pub mod session;

pub use error::{SessionError, TransportError};
pub use transport::{ChatTransport, Route, TransportStatus};
pub use transport::http::HttpTransport;
pub use transport::socket::SocketTransport;
pub use session::{SessionController, SessionOptions};
