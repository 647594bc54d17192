//! # Wire Protocol
//!
//! Packet taxonomy, payload codec and the forward-compatible snapshot
//! framing. Scalars travel in native byte order: the protocol is
//! same-architecture-only by design, documented as a portability
//! constraint.

pub mod codec;
pub mod packets;

pub use codec::{
    read_snapshot, write_snapshot, PayloadReader, PayloadWriter, SnapshotEntity, WireComponent,
};
pub use packets::{InputState, Packet, PacketHeader, PacketKind, HEADER_SIZE};
