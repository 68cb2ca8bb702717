//! WebSocket Quiz Sessions
//!
//! Each connection owns one quiz engine. The submodules are:
//!
//! - `protocol`: the JSON message format between browser and server.
//! - `session`: the connection lifecycle and the engine event loop.

pub mod protocol;
pub mod session;

pub use session::ws_handler;
