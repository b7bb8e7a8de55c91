use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Url};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace};

use crate::error::TransportError;
use crate::http::{HttpCapability, HttpRequest, Method, StateChange, StateHandler};
use crate::response::Response;

struct Notification {
    id: u64,
    change: StateChange,
}

#[derive(Default)]
struct Registry {
    handlers: RefCell<HashMap<u64, StateHandler>>,
    next_id: Cell<u64>,
    in_flight: Cell<usize>,
}

impl Registry {
    fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }
}

pub struct ReqwestCapability {
    client: Client,
    base: Url,
    runtime: Handle,
    tx: UnboundedSender<Notification>,
    registry: Rc<Registry>,
}

/// Delivers request progress to handlers on the thread that owns it.
pub struct EventLoop {
    rx: UnboundedReceiver<Notification>,
    registry: Rc<Registry>,
}

impl ReqwestCapability {
    /// Relative request URLs are resolved against `base`; network work is
    /// spawned onto `runtime`.
    pub fn new(client: Client, base: Url, runtime: Handle) -> (Self, EventLoop) {
        let (tx, rx) = mpsc::unbounded_channel();
        let registry = Rc::new(Registry::default());
        let capability = Self {
            client,
            base,
            runtime,
            tx,
            registry: Rc::clone(&registry),
        };
        (capability, EventLoop { rx, registry })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn request(&self) -> ReqwestRequest {
        ReqwestRequest {
            client: self.client.clone(),
            base: self.base.clone(),
            runtime: self.runtime.clone(),
            tx: self.tx.clone(),
            registry: Rc::clone(&self.registry),
            target: None,
            headers: HeaderMap::new(),
            handler: None,
        }
    }
}

impl HttpCapability for ReqwestCapability {
    fn new_request(&self) -> Box<dyn HttpRequest> {
        Box::new(self.request())
    }
}

struct ReqwestRequest {
    client: Client,
    base: Url,
    runtime: Handle,
    tx: UnboundedSender<Notification>,
    registry: Rc<Registry>,
    target: Option<(reqwest::Method, Url)>,
    headers: HeaderMap,
    handler: Option<StateHandler>,
}

impl HttpRequest for ReqwestRequest {
    fn open(&mut self, method: Method, url: &str) -> Result<(), TransportError> {
        let resolved = self.base.join(url).map_err(|e| TransportError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let method = match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };
        self.target = Some((method, resolved));
        Ok(())
    }

    fn on_state_change(&mut self, handler: StateHandler) {
        self.handler = Some(handler);
    }

    fn set_header(&mut self, name: &str, value: &str) -> Result<(), TransportError> {
        if self.target.is_none() {
            return Err(TransportError::NotOpened);
        }
        let invalid = |reason: String| TransportError::InvalidHeader {
            name: name.to_string(),
            reason,
        };
        let header = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
        let value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
        self.headers.append(header, value);
        Ok(())
    }

    fn send(self: Box<Self>, body: Option<String>) -> Result<(), TransportError> {
        let this = *self;
        let (method, url) = this.target.ok_or(TransportError::NotOpened)?;

        let id = this.registry.next_id();
        if let Some(handler) = this.handler {
            this.registry.handlers.borrow_mut().insert(id, handler);
        }
        this.registry.in_flight.set(this.registry.in_flight.get() + 1);
        debug!(id, %url, "request sent");

        // Queued before the task starts so it is always the first notification.
        let _ = this.tx.send(Notification {
            id,
            change: StateChange::Opened,
        });

        let mut builder = this.client.request(method, url).headers(this.headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        let tx = this.tx;
        this.runtime.spawn(async move {
            let notify = |change| {
                let _ = tx.send(Notification { id, change });
            };
            let response = match builder.send().await {
                Ok(response) => response,
                Err(e) => {
                    notify(StateChange::Done(Err(TransportError::Network(e.to_string()))));
                    return;
                }
            };
            notify(StateChange::HeadersReceived);
            let status = response.status().as_u16();
            notify(StateChange::Loading);
            let outcome = response
                .text()
                .await
                .map(|body| Response::new(status, body))
                .map_err(|e| TransportError::Network(e.to_string()));
            notify(StateChange::Done(outcome));
        });
        Ok(())
    }
}

impl EventLoop {
    /// Requests sent but not yet done.
    pub fn pending(&self) -> usize {
        self.registry.in_flight.get()
    }

    /// Deliver notifications until every sent request has reached done.
    pub async fn run_until_idle(&mut self) {
        while self.pending() > 0 {
            let Some(notification) = self.rx.recv().await else {
                break;
            };
            self.deliver(notification);
        }
    }

    fn deliver(&mut self, Notification { id, change }: Notification) {
        let done = matches!(change, StateChange::Done(_));
        trace!(id, state = change.ready_state().code(), "state change");

        // Taken out of the map so the handler may itself dispatch new requests.
        let handler = self.registry.handlers.borrow_mut().remove(&id);
        if let Some(mut handler) = handler {
            handler(change);
            if !done {
                self.registry.handlers.borrow_mut().insert(id, handler);
            }
        }
        if done {
            let in_flight = self.registry.in_flight.get();
            self.registry.in_flight.set(in_flight.saturating_sub(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capability() -> (ReqwestCapability, EventLoop) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let base = Url::parse("http://127.0.0.1:9/").unwrap();
        ReqwestCapability::new(Client::new(), base, runtime.handle().clone())
    }

    #[test]
    fn open_resolves_relative_action_url() {
        let (http, _loop) = capability();
        let mut request = http.request();
        request.open(Method::Get, "/?action=click&x=10&y=20").unwrap();
        let (method, url) = request.target.unwrap();
        assert_eq!(method, reqwest::Method::GET);
        assert_eq!(url.as_str(), "http://127.0.0.1:9/?action=click&x=10&y=20");
    }

    #[test]
    fn header_before_open_is_rejected() {
        let (http, _loop) = capability();
        let mut request = http.new_request();
        assert_eq!(
            request.set_header("X-Test", "1"),
            Err(TransportError::NotOpened)
        );
        request.open(Method::Get, "/").unwrap();
        assert!(matches!(
            request.set_header("bad header", "1"),
            Err(TransportError::InvalidHeader { .. })
        ));
        assert_eq!(request.set_header("X-Test", "1"), Ok(()));
    }

    #[test]
    fn send_without_open_is_rejected() {
        let (http, event_loop) = capability();
        let request = http.new_request();
        assert_eq!(request.send(None), Err(TransportError::NotOpened));
        assert_eq!(event_loop.pending(), 0);
    }
}
