//! Subscriber push surface (C8, `spec.md` §4.8): connection registry plus
//! the flat envelope/inbound-frame wire shapes it publishes and accepts.
//! Grounded on `weavegraph::event_bus`'s broadcast-channel `EventHub` and
//! per-sink worker design, extended here with the routing tables a single
//! global broadcast channel doesn't give you for free.

mod bus;
mod event;

pub use bus::{ConnectionId, EventBus, Target};
pub use event::{families, Envelope, InboundFrame};
