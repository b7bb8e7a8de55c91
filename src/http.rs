//! The asynchronous-HTTP capability the dispatcher is built on.
//!
//! A capability hands out fresh request objects. A request is opened,
//! optionally given headers, then sent; it reports its progress by calling
//! the registered handler once per ready-state transition. Handlers always
//! run on the host's event loop, never concurrently with each other.

use crate::error::TransportError;
use crate::response::Response;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// Lifecycle of a single request, numbered the way `XMLHttpRequest` numbers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    Opened = 1,
    HeadersReceived = 2,
    Loading = 3,
    Done = 4,
}

impl ReadyState {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(ReadyState::Opened),
            2 => Some(ReadyState::HeadersReceived),
            3 => Some(ReadyState::Loading),
            4 => Some(ReadyState::Done),
            _ => None,
        }
    }

    pub fn code(self) -> u16 {
        self as u16
    }
}

/// One notification delivered to a request's handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    Opened,
    HeadersReceived,
    Loading,
    Done(Result<Response, TransportError>),
}

impl StateChange {
    pub fn ready_state(&self) -> ReadyState {
        match self {
            StateChange::Opened => ReadyState::Opened,
            StateChange::HeadersReceived => ReadyState::HeadersReceived,
            StateChange::Loading => ReadyState::Loading,
            StateChange::Done(_) => ReadyState::Done,
        }
    }
}

pub type StateHandler = Box<dyn FnMut(StateChange)>;

pub trait HttpRequest {
    fn open(&mut self, method: Method, url: &str) -> Result<(), TransportError>;

    /// Replaces any previously registered handler.
    fn on_state_change(&mut self, handler: StateHandler);

    fn set_header(&mut self, name: &str, value: &str) -> Result<(), TransportError>;

    /// Schedules the request and returns without waiting for it.
    fn send(self: Box<Self>, body: Option<String>) -> Result<(), TransportError>;
}

/// Source of request objects, chosen once when the host starts.
pub trait HttpCapability {
    fn new_request(&self) -> Box<dyn HttpRequest>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_state_codes_round_trip() {
        for code in 1..=4 {
            let state = ReadyState::from_code(code).unwrap();
            assert_eq!(state.code(), code);
        }
        assert_eq!(ReadyState::from_code(0), None);
        assert_eq!(ReadyState::from_code(5), None);
    }

    #[test]
    fn done_carries_terminal_state() {
        let change = StateChange::Done(Err(TransportError::Network("reset".into())));
        assert_eq!(change.ready_state(), ReadyState::Done);
        assert!(StateChange::Loading.ready_state() < ReadyState::Done);
    }
}
