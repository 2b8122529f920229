//! The task scheduling engine.
//!
//! Split into focused submodules:
//! - `core`: engine struct, construction and accessors
//! - `evaluation`: the per-pass loop and the due/quota/lock gate
//! - `execution`: running a locked task and recording success
//! - `retry`: failure handling and the retry sub-protocol

mod core;
mod evaluation;
mod execution;
mod retry;
#[cfg(test)]
mod tests;

pub use self::core::{TriggerEngine, DEFAULT_RETRY_DELAY};
