/// Real-time transport: wire protocol and the client-side adapter
pub mod adapter;
pub mod wire;

pub use adapter::{TransportAdapter, TransportEvent};
pub use wire::{Frame, WireEvent};
