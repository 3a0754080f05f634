//! Jobhub Queue – the asynchronous email dispatch engine.
//!
//! A `QueueRouter` polls every registered channel on a fixed interval,
//! resolves a handler for each message by event name, and invokes it with
//! per-item failure isolation. The email controller drives each work item
//! through a `pending -> processing -> processed | failed` state machine,
//! sending through a bounded exponential-backoff `RetryPolicy`.
//!
//! Shutdown: [`QueueRouter::stop`] signals the loop; the current cycle
//! finishes its batch before the task exits. Await the handle returned by
//! [`QueueRouter::start`] to observe the drain.

mod channel;
mod email;
mod registry;
mod retry;
mod router;

pub use channel::{QueueChannel, QueueMessage};
pub use email::{EmailQueueController, PendingEmailChannel};
pub use registry::{HandlerRegistry, QueueController, QueueHandler};
pub use retry::{ListenerGuard, RetryEvents, RetryPolicy};
pub use router::{ChannelFailureMode, QueueRouter, QueueRouterConfig};
