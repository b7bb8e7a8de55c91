use std::cell::RefCell;

use js_sys::Reflect;
use tracing::{debug, warn};
use wasm_bindgen::closure::WasmClosure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{console, Document, HtmlInputElement, MouseEvent, Window, XmlHttpRequest};

use crate::action::PointerEvent;
use crate::dispatch::Dispatcher;
use crate::error::TransportError;
use crate::http::{HttpCapability, HttpRequest, Method, ReadyState, StateChange, StateHandler};
use crate::page::{Page, PageSettings};
use crate::response::Response;

fn js_reason(value: &JsValue) -> String {
    value
        .as_string()
        .unwrap_or_else(|| format!("{value:?}"))
}

pub struct XhrCapability;

impl XhrCapability {
    /// `None` when the environment cannot construct an `XMLHttpRequest`.
    pub fn detect() -> Option<Self> {
        XmlHttpRequest::new().ok().map(|_| XhrCapability)
    }
}

impl HttpCapability for XhrCapability {
    fn new_request(&self) -> Box<dyn HttpRequest> {
        Box::new(XhrRequest {
            xhr: XmlHttpRequest::new().ok(),
            opened: false,
        })
    }
}

struct XhrRequest {
    xhr: Option<XmlHttpRequest>,
    opened: bool,
}

impl XhrRequest {
    fn xhr(&self) -> Result<&XmlHttpRequest, TransportError> {
        self.xhr
            .as_ref()
            .ok_or_else(|| TransportError::Network("XMLHttpRequest unavailable".into()))
    }
}

impl HttpRequest for XhrRequest {
    fn open(&mut self, method: Method, url: &str) -> Result<(), TransportError> {
        self.xhr()?
            .open(method.as_str(), url)
            .map_err(|e| TransportError::InvalidUrl {
                url: url.to_string(),
                reason: js_reason(&e),
            })?;
        self.opened = true;
        Ok(())
    }

    fn on_state_change(&mut self, mut handler: StateHandler) {
        let Some(xhr) = self.xhr.clone() else {
            return;
        };
        let target = xhr.clone();
        let callback = Closure::wrap(Box::new(move || {
            if let Some(change) = state_change(&target) {
                handler(change);
            }
        }) as Box<dyn FnMut()>);
        xhr.set_onreadystatechange(Some(callback.as_ref().unchecked_ref()));
        callback.forget();
    }

    fn set_header(&mut self, name: &str, value: &str) -> Result<(), TransportError> {
        if !self.opened {
            return Err(TransportError::NotOpened);
        }
        self.xhr()?
            .set_request_header(name, value)
            .map_err(|e| TransportError::InvalidHeader {
                name: name.to_string(),
                reason: js_reason(&e),
            })
    }

    fn send(self: Box<Self>, body: Option<String>) -> Result<(), TransportError> {
        if !self.opened {
            return Err(TransportError::NotOpened);
        }
        self.xhr()?
            .send_with_opt_str(body.as_deref())
            .map_err(|e| TransportError::Network(js_reason(&e)))
    }
}

/// `None` while the request is still unsent.
fn state_change(xhr: &XmlHttpRequest) -> Option<StateChange> {
    let change = match ReadyState::from_code(xhr.ready_state())? {
        ReadyState::Opened => StateChange::Opened,
        ReadyState::HeadersReceived => StateChange::HeadersReceived,
        ReadyState::Loading => StateChange::Loading,
        ReadyState::Done => StateChange::Done(finished(xhr)),
    };
    Some(change)
}

/// Status 0 at done means the browser gave up before any response arrived.
fn finished(xhr: &XmlHttpRequest) -> Result<Response, TransportError> {
    let status = xhr
        .status()
        .map_err(|e| TransportError::Network(js_reason(&e)))?;
    if status == 0 {
        return Err(TransportError::Network("request failed before a response".into()));
    }
    let body = xhr
        .response_text()
        .map_err(|e| TransportError::Network(js_reason(&e)))?
        .unwrap_or_default();
    Ok(Response::new(status, body))
}

pub struct DomPage {
    document: Document,
    settings: PageSettings,
}

impl DomPage {
    pub fn new(document: Document, settings: PageSettings) -> Self {
        Self { document, settings }
    }
}

impl Page for DomPage {
    fn set_image_source(&mut self, src: &str) {
        let id = &self.settings.image_id;
        let Some(img) = self.document.get_element_by_id(id) else {
            warn!(id, "image element not found");
            return;
        };
        if let Err(e) = img.set_attribute("src", src) {
            warn!(id, src, error = %js_reason(&e), "image source not updated");
        }
    }

    /// The payload is written as text, never parsed as markup.
    fn set_display_text(&mut self, text: &str) {
        match self.document.get_element_by_id(&self.settings.display_id) {
            Some(display) => display.set_text_content(Some(text)),
            None => warn!(id = %self.settings.display_id, "display element not found"),
        }
    }

    /// Looks only inside the page's first form.
    fn form_value(&self, field: &str) -> Option<String> {
        let form = self.document.forms().item(0)?;
        form.query_selector(&format!("[name=\"{field}\"]"))
            .ok()
            .flatten()
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
            .map(|input| input.value())
    }
}

thread_local! {
    static DISPATCHER: RefCell<Option<Dispatcher<DomPage>>> = const { RefCell::new(None) };
}

fn with_dispatcher<T>(fallback: T, f: impl FnOnce(&Dispatcher<DomPage>) -> T) -> T {
    DISPATCHER.with(|slot| slot.borrow().as_ref().map(f).unwrap_or(fallback))
}

fn bind<T: ?Sized + WasmClosure>(
    window: &Window,
    name: &str,
    closure: Closure<T>,
) -> Result<(), JsValue> {
    Reflect::set(window, &JsValue::from_str(name), closure.as_ref())?;
    closure.forget();
    Ok(())
}

/// The page calls these from `onclick` attributes as plain globals.
fn expose_globals(window: &Window) -> Result<(), JsValue> {
    bind(window, "click", Closure::<dyn Fn(MouseEvent) -> bool>::new(click))?;
    bind(
        window,
        "send_action",
        Closure::<dyn Fn(String) -> bool>::new(|action: String| send_action(&action)),
    )?;
    bind(
        window,
        "set_symbol",
        Closure::<dyn Fn(String) -> bool>::new(|symbol: String| set_symbol(&symbol)),
    )?;
    bind(
        window,
        "set_symbol_from_entry",
        Closure::<dyn Fn() -> Result<bool, JsValue>>::new(set_symbol_from_entry),
    )?;
    bind(
        window,
        "set_template",
        Closure::<dyn Fn(String) -> bool>::new(|temp: String| set_template(&temp)),
    )?;
    bind(
        window,
        "set_mode",
        Closure::<dyn Fn(String) -> bool>::new(|mode: String| set_mode(&mode)),
    )
}

/// Wire a dispatcher to the current document and publish the page globals.
/// Completion failures are reported on the browser console.
pub fn install(http: Option<Box<dyn HttpCapability>>) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window available"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document available"))?;
    let settings = PageSettings::default();
    let dispatcher = Dispatcher::new(http, DomPage::new(document, settings.clone()), settings);
    dispatcher.set_error_hook(Box::new(|err| {
        console::error_1(&JsValue::from_str(&format!("bkdraw: {err}")));
    }));
    DISPATCHER.with(|slot| *slot.borrow_mut() = Some(dispatcher));
    expose_globals(&window)
}

#[wasm_bindgen]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    if tracing_wasm::try_set_as_global_default().is_err() {
        debug!("tracing subscriber already installed");
    }
    let http = XhrCapability::detect().map(|xhr| Box::new(xhr) as Box<dyn HttpCapability>);
    install(http)
}

#[wasm_bindgen]
pub fn click(event: MouseEvent) -> bool {
    let event = PointerEvent::new(event.client_x(), event.client_y());
    with_dispatcher(false, |d| d.click(event))
}

#[wasm_bindgen]
pub fn send_action(action: &str) -> bool {
    with_dispatcher(false, |d| d.send_action(action))
}

#[wasm_bindgen]
pub fn set_symbol(symbol: &str) -> bool {
    with_dispatcher(false, |d| d.set_symbol(symbol))
}

#[wasm_bindgen]
pub fn set_symbol_from_entry() -> Result<bool, JsValue> {
    with_dispatcher(Ok(false), |d| d.set_symbol_from_entry())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub fn set_template(temp: &str) -> bool {
    with_dispatcher(false, |d| d.set_template(temp))
}

#[wasm_bindgen]
pub fn set_mode(mode: &str) -> bool {
    with_dispatcher(false, |d| d.set_mode(mode))
}

/// Most recent failure as text, cleared on read.
#[wasm_bindgen]
pub fn last_error() -> Option<String> {
    with_dispatcher(None, |d| d.take_last_error().map(|e| e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn unsent_request_reports_nothing() {
        let xhr = XmlHttpRequest::new().unwrap();
        assert_eq!(state_change(&xhr), None);
    }

    #[wasm_bindgen_test]
    fn opened_request_maps_to_opened() {
        let xhr = XmlHttpRequest::new().unwrap();
        xhr.open("GET", "/?action=undo").unwrap();
        assert_eq!(state_change(&xhr), Some(StateChange::Opened));
    }

    #[wasm_bindgen_test]
    fn status_zero_is_a_network_error() {
        let xhr = XmlHttpRequest::new().unwrap();
        assert!(matches!(finished(&xhr), Err(TransportError::Network(_))));
    }

    #[wasm_bindgen_test]
    fn header_before_open_is_rejected() {
        let mut request = XhrCapability.new_request();
        assert_eq!(request.set_header("X-Test", "1"), Err(TransportError::NotOpened));
    }
}
