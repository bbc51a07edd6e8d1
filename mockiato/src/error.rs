use hyper::http;
use std::{fmt::Display, io, time::Duration};

#[derive(Debug)]
pub enum Error {
    IoError(io::Error),
    InvalidStatusCode(u16),
    NotConfigured,
    InvalidHeaderName,
    InvalidHeaderValue,
    HyperError(hyper::Error),
    ParseUriError,
    HttpError(http::Error),
    SerializationError(serde_json::Error),
    TransportClosed,
    DecisionAbandoned,
    DecisionTimedOut(Duration),
    TunnelNotSupported,
}

impl std::error::Error for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "IoError: {}", e),
            Error::InvalidStatusCode(code) => write!(f, "The status code {} is invalid", code),
            Error::NotConfigured => write!(
                f,
                "The request has a relative URI and no upstream is configured"
            ),
            Error::InvalidHeaderName => write!(f, "Invalid header name"),
            Error::InvalidHeaderValue => write!(f, "Invalid header value"),
            Error::HyperError(e) => write!(f, "Hyper error: {}", e),
            Error::ParseUriError => write!(f, "Parse URI Error"),
            Error::HttpError(e) => write!(f, "Http Error: {}", e),
            Error::SerializationError(e) => write!(f, "Serialization error: {}", e),
            Error::TransportClosed => write!(f, "The message transport is closed"),
            Error::DecisionAbandoned => {
                write!(f, "The pending decision was dropped before it arrived")
            }
            Error::DecisionTimedOut(timeout) => {
                write!(f, "No decision arrived within {} ms", timeout.as_millis())
            }
            Error::TunnelNotSupported => write!(f, "CONNECT tunnels are not intercepted"),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::IoError(e)
    }
}

impl From<hyper::header::InvalidHeaderName> for Error {
    fn from(_: hyper::header::InvalidHeaderName) -> Self {
        Error::InvalidHeaderName
    }
}

impl From<hyper::header::InvalidHeaderValue> for Error {
    fn from(_: hyper::header::InvalidHeaderValue) -> Self {
        Error::InvalidHeaderValue
    }
}

impl From<http::uri::InvalidUri> for Error {
    fn from(_: http::uri::InvalidUri) -> Self {
        Error::ParseUriError
    }
}

impl From<hyper::Error> for Error {
    fn from(e: hyper::Error) -> Self {
        Error::HyperError(e)
    }
}

impl From<http::Error> for Error {
    fn from(e: http::Error) -> Self {
        Error::HttpError(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::SerializationError(e)
    }
}
