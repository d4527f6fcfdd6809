pub mod gate;
pub mod store;

pub use gate::{GateDecision, TakeGate, FREE_TAKE_LIMIT};
pub use store::{take_key, LocalTakeStore, MemoryTakeStore, SessionStore};
