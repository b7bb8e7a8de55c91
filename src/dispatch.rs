use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::action::{encode_uri, Action, PointerEvent};
use crate::error::{CompletionError, DispatchError, TransportError};
use crate::http::{HttpCapability, Method, StateChange};
use crate::page::{Page, PageSettings};
use crate::response::SmilesPayload;

/// Millisecond wall clock used for cache-busting image URLs.
pub trait Clock {
    fn now_millis(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[cfg(not(target_arch = "wasm32"))]
    fn now_millis(&self) -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    #[cfg(target_arch = "wasm32")]
    fn now_millis(&self) -> u64 {
        js_sys::Date::now() as u64
    }
}

/// Apply one state change to the page.
///
/// Only `Done` does anything: the image is pointed at a fresh
/// `<endpoint>?<timestamp>` first, then the response is checked and the
/// first `<smiles>` text replaces the display text. A failure after the
/// image refresh leaves the display text as it was.
pub fn complete<P: Page + ?Sized>(
    page: &mut P,
    settings: &PageSettings,
    clock: &dyn Clock,
    change: StateChange,
) -> Result<Option<SmilesPayload>, CompletionError> {
    let outcome = match change {
        StateChange::Opened | StateChange::HeadersReceived | StateChange::Loading => {
            return Ok(None)
        }
        StateChange::Done(outcome) => outcome,
    };

    page.set_image_source(&settings.image_source(clock.now_millis()));

    let response = outcome?;
    if !response.is_success() {
        return Err(CompletionError::Status(response.status));
    }
    let payload = response.parse()?;
    if payload.occurrences > 1 {
        debug!(
            occurrences = payload.occurrences,
            "response carries several <smiles> elements, showing the first"
        );
    }
    page.set_display_text(&payload.smiles);
    Ok(Some(payload))
}

pub type ErrorHook = Box<dyn Fn(&CompletionError)>;

/// Where completion failures end up: the optional hook sees each one as it
/// happens, `last` keeps the most recent for polling.
#[derive(Default)]
struct ErrorSlot {
    last: RefCell<Option<CompletionError>>,
    hook: RefCell<Option<ErrorHook>>,
}

impl ErrorSlot {
    fn record(&self, err: CompletionError) {
        if let Some(hook) = self.hook.borrow().as_ref() {
            hook(&err);
        }
        *self.last.borrow_mut() = Some(err);
    }
}

/// Request dispatcher: builds action URLs, fires them through the injected
/// capability and refreshes the page when each request finishes.
pub struct Dispatcher<P: Page + 'static> {
    http: Option<Box<dyn HttpCapability>>,
    page: Rc<RefCell<P>>,
    settings: Rc<PageSettings>,
    clock: Rc<dyn Clock>,
    errors: Rc<ErrorSlot>,
}

impl<P: Page + 'static> Dispatcher<P> {
    /// `http` is `None` when the host has no asynchronous-HTTP support; every
    /// dispatch then reports `false`.
    pub fn new(http: Option<Box<dyn HttpCapability>>, page: P, settings: PageSettings) -> Self {
        Self::with_clock(http, page, settings, Rc::new(SystemClock))
    }

    pub fn with_clock(
        http: Option<Box<dyn HttpCapability>>,
        page: P,
        settings: PageSettings,
        clock: Rc<dyn Clock>,
    ) -> Self {
        Self {
            http,
            page: Rc::new(RefCell::new(page)),
            settings: Rc::new(settings),
            clock,
            errors: Rc::default(),
        }
    }

    pub fn page(&self) -> &Rc<RefCell<P>> {
        &self.page
    }

    pub fn settings(&self) -> &PageSettings {
        &self.settings
    }

    /// Most recent failure from a completion or a rejected request, cleared on read.
    pub fn take_last_error(&self) -> Option<CompletionError> {
        self.errors.last.borrow_mut().take()
    }

    /// Called with every completion or send failure, before it is stored.
    pub fn set_error_hook(&self, hook: ErrorHook) {
        *self.errors.hook.borrow_mut() = Some(hook);
    }

    pub fn dispatch(
        &self,
        method: Method,
        url: &str,
        body: Option<&str>,
        headers: &[(&str, &str)],
    ) -> bool {
        let Some(http) = self.http.as_ref() else {
            debug!(url, "no asynchronous HTTP capability, request dropped");
            return false;
        };

        debug!(method = method.as_str(), url, "dispatching request");
        match self.send_request(http.as_ref(), method, url, body, headers) {
            Ok(()) => true,
            Err(err) => {
                warn!(url, error = %err, "request rejected by capability");
                self.errors.record(err.into());
                false
            }
        }
    }

    fn send_request(
        &self,
        http: &dyn HttpCapability,
        method: Method,
        url: &str,
        body: Option<&str>,
        headers: &[(&str, &str)],
    ) -> Result<(), TransportError> {
        let mut request = http.new_request();
        request.open(method, url)?;
        request.on_state_change(self.completion_handler());
        for (name, value) in headers {
            request.set_header(name, value)?;
        }
        request.send(body.map(str::to_string))
    }

    fn completion_handler(&self) -> Box<dyn FnMut(StateChange)> {
        let page = Rc::clone(&self.page);
        let settings = Rc::clone(&self.settings);
        let clock = Rc::clone(&self.clock);
        let errors = Rc::clone(&self.errors);
        Box::new(move |change| {
            let state = change.ready_state();
            let result = complete(&mut *page.borrow_mut(), &settings, clock.as_ref(), change);
            match result {
                Ok(Some(payload)) => debug!(smiles = %payload.smiles, "page refreshed"),
                Ok(None) => debug!(state = state.code(), "request progressed"),
                Err(err) => {
                    warn!(error = %err, "request completed with an error");
                    errors.record(err);
                }
            }
        })
    }

    pub fn dispatch_action(&self, action: &Action) -> bool {
        self.dispatch(Method::Get, &action.to_url(), None, &[])
    }

    pub fn click(&self, event: PointerEvent) -> bool {
        self.dispatch_action(&Action::click(event))
    }

    pub fn send_action(&self, action: &str) -> bool {
        self.dispatch(Method::Get, &encode_uri(&format!("/?action={action}")), None, &[])
    }

    pub fn set_symbol(&self, symbol: &str) -> bool {
        self.dispatch_action(&Action::SetSymbol(symbol.to_string()))
    }

    /// Sends whatever the symbol field holds right now.
    pub fn set_symbol_from_entry(&self) -> Result<bool, DispatchError> {
        let field = &self.settings.symbol_field;
        let symbol = self
            .page
            .borrow()
            .form_value(field)
            .ok_or_else(|| DispatchError::MissingField(field.clone()))?;
        Ok(self.set_symbol(&symbol))
    }

    pub fn set_template(&self, temp: &str) -> bool {
        self.dispatch_action(&Action::SetTemplate(temp.to_string()))
    }

    pub fn set_mode(&self, mode: &str) -> bool {
        self.dispatch_action(&Action::SetMode(mode.to_string()))
    }
}
