//! Networking between the host and connected peers
//!
//! - [`dispatch`] - routes incoming frames to per-side packet handlers
//! - [`packets`] - built-in packet ids and payloads
//! - [`tick_sync`] - lockstep barrier gating host tick advancement
//! - [`transport`] - outbound delivery and the in-process transport
//!
//! # Architecture
//!
//! ```text
//!   network threads               host thread
//!  ┌────────────────┐         ┌──────────────────┐
//!  │ PacketDispatch │──ack───▶│  TickSyncServer  │
//!  └────────────────┘         └────────┬─────────┘
//!          ▲                           │ advance
//!          │ frames           ┌────────▼─────────┐
//!  ┌───────┴────────┐◀────────│   PacketSink     │
//!  │     peers      │         └──────────────────┘
//!  └────────────────┘
//! ```

pub mod dispatch;
pub mod packets;
pub mod tick_sync;
pub mod transport;

pub use dispatch::{DispatchError, PacketDispatcher, PacketHandler, RoutingError};
pub use tick_sync::{BarrierError, TickSyncClient, TickSyncServer};
pub use transport::{LocalHub, LocalPeer, PacketSink, TransportError};
