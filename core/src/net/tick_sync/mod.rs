//! Lockstep tick synchronization
//!
//! ```text
//! Peer                              Host
//!   |  run tick T                     |
//!   |--- TICK_ACK { T } ------------->|  on_ack_for(peer, T)
//!   |                                 |  should_advance()?
//!   |<-- TICK_ADVANCE { T+1 } --------|  advance()
//!   |  run tick T+1                   |
//! ```

mod client;
mod server;

pub use client::TickSyncClient;
pub use server::{BarrierError, TickSyncServer};

#[cfg(test)]
mod tests;
