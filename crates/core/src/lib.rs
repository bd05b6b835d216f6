pub mod bot_kind;
pub mod error;
pub mod signal;

pub use bot_kind::BotKind;
pub use error::EngineError;
pub use signal::{Signal, SignalState, Snapshot, SnapshotBuilder};
