//! Promptline event plumbing.
//!
//! Async building blocks around the synchronous `promptline-core` engine:
//!
//! - [`PromptEventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`, carrying commits and dirty-state changes.
//! - [`BusOwner`]: a [`PromptOwner`](promptline_core::PromptOwner) that
//!   forwards a reconciler's notifications onto the bus.
//! - [`ImportValidator`]: background task that validates pasted import text
//!   once the input has been quiet for the configured debounce window.

pub mod bus;
pub mod config;
pub mod error;
pub mod validator;

pub use bus::{BusOwner, PromptEvent, PromptEventBus};
pub use config::ImportValidatorConfig;
pub use error::EventsError;
pub use validator::{ImportValidator, ValidatedImport};
