//! Client side of the drawing application's web interface.
//!
//! User interactions become `GET /?action=...` requests sent through an
//! injected asynchronous-HTTP capability. When a request finishes, the page's
//! drawing is reloaded and its SMILES label is replaced with what the server
//! reported.

pub mod action;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod page;
pub mod response;

#[cfg(feature = "native")]
pub mod logging;
#[cfg(feature = "native")]
pub mod native;
#[cfg(feature = "native")]
pub mod terminal;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use action::{encode_uri, Action, PointerEvent};
pub use dispatch::{complete, Clock, Dispatcher, ErrorHook, SystemClock};
pub use error::{CompletionError, DispatchError, ParseError, TransportError};
pub use http::{HttpCapability, HttpRequest, Method, ReadyState, StateChange, StateHandler};
pub use page::{MemoryPage, Page, PageSettings};
pub use response::{Response, SmilesPayload};
