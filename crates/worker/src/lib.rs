//! Single-slot worker primitives.
//!
//! One dedicated worker thread, one pending slot, latest submission wins:
//! * a submission arriving while the worker is busy replaces the pending
//!   task, which is dropped without ever running
//! * the submitting side never blocks (constant-time slot swap)
//! * in-flight tasks can poll for supersession at their own pace

mod clock;
mod processor;
mod slot;

pub use clock::GenerationClock;
pub use processor::{SingleSlotProcessor, Task, WorkerContext};
pub use slot::{SingleSlot, SlotClosed, SlotPush, SlotReceiver, SlotSender};
