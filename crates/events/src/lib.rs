//! Advisory events and the pub/sub mechanics that deliver them.
//!
//! Advisories are **non-fatal** signals about the health of the decision
//! pipeline. Nothing in the engine blocks on them; subscribers decide what
//! to do (page a human, pin traffic to another model, ...).

pub mod advisory;
pub mod bus;
pub mod in_memory_bus;

pub use advisory::{Advisory, AdvisoryEnvelope};
pub use bus::{EventBus, Subscription};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
