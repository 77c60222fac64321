//! Feed Client Module
//!
//! Turning an unreliable, partially delivered record stream into a complete,
//! gap-free record set:
//! - Wire protocol: fixed 17-byte record frames, 2-byte request frames
//! - Frame reassembly over an arbitrarily chunked byte stream
//! - Record store with gap detection over observed sequence numbers
//! - Session controller with strictly sequential gap recovery

pub mod assembler;
pub mod session;
pub mod store;
pub mod wire;

pub use assembler::FrameAssembler;
pub use session::{FeedClientConfig, FeedSession, RecoveryState, SessionOutcome};
pub use store::RecordStore;
pub use wire::{Record, RequestFrame, Side, WireError, RECORD_FRAME_SIZE};
