//! Notification fan-out for task lifecycle events.
//!
//! This crate provides:
//! - [`Channel`]: the closed set of delivery channels (log, chat webhook, mail)
//! - Minijinja rendering of the plain-text mail body
//! - [`Dispatcher`]: filters events by configuration and delivers to every
//!   channel, isolating per-channel failures

pub mod channel;
pub mod dispatcher;
pub mod email;
pub mod log;
pub mod templating;
pub mod traits;
pub mod webhook;

pub use channel::Channel;
pub use dispatcher::Dispatcher;
pub use traits::{Delivery, DispatchResult, EventContext, NotifyError, TaskNotification};
