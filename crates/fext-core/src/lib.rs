//! # fext-core - Core Types
//!
//! Foundation crate for the fext extension host. Provides error handling,
//! logging setup, event primitives and the listener bus shared by the
//! service and widget controls.
//!
//! This crate has **zero internal dependencies**.
//!
//! ## Public API
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Error enum with a `recoverable` classification
//!   and a numeric [`Error::code`] for the event feed
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ### Events (`events`)
//! - [`ControlEvent`] - Name + flat payload view of an event
//! - [`Severity`] - Severity bucket derived from an error code
//! - [`now_timestamp()`] - Epoch seconds used in every payload
//!
//! ### Observer (`observer`)
//! - [`EventBus`] - Synchronous listeners plus broadcast subscribers
//! - [`Listener`] - Callback trait, implemented for closures
//!
//! ### Protocol (`protocol`)
//! - [`Message`] - Request, response or event line
//! - [`Control`] - Which control a line belongs to
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use fext_core::prelude::*;
//! ```

pub mod error;
pub mod events;
pub mod logging;
pub mod observer;
pub mod prelude;
pub mod protocol;

pub use error::{Error, Result, ResultExt};
pub use events::{now_timestamp, to_params, ControlEvent, EventParams, Severity};
pub use observer::{EventBus, Listener, ListenerId};
pub use protocol::{Control, ErrorBody, EventMessage, Message, Request, Response};
