use thiserror::Error;

/// Failure to read the payload out of a completed response body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("response has no <smiles> element")]
    MissingSmiles,
}

/// Failure raised by an HTTP capability while opening, sending or receiving.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("invalid request URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request was not opened")]
    NotOpened,

    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("network error: {0}")]
    Network(String),
}

/// Anything that can go wrong between "done" and the page update.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("server answered with HTTP status {0}")]
    Status(u16),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Failure to build a request before it reaches the capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("form field {0} is not present on the page")]
    MissingField(String),
}
