use reqwest::header::InvalidHeaderValue;

use thiserror::Error;

/// Result type for `courtside`, using [`courtside::error::Error`].
///
/// [`courtside::error::Error`]: enum.Error.html
pub type Result<T> = ::std::result::Result<T, Error>;

/// Enum for `courtside` errors.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum Error {
    /// An HTTP error has occurred. The first value is the error code, the second is the reason of
    /// the failure given by the API, if available.
    #[error("HTTP error {0}{}", http_reason(.0, .1))]
    Http(u16, Option<String>),

    /// Serialization error. Contains a description of the error.
    #[error("Serialization error: {0}")]
    Serial(String),

    /// The request couldn't be send. Contains a description of the error.
    #[error("Couldn't send request: {0}")]
    CannotSendRequest(String),

    /// The client couldn't be created. Contains a description of the error.
    #[error("Couldn't create client: {0}")]
    CannotCreateClient(String),

    /// The request target couldn't be built from the base endpoint and the path segments.
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    /// The response body isn't a `callback(payload)` script.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The request finished but its response never invoked the callback it was registered under.
    /// Contains the callback reference.
    #[error("Response never invoked callback {0}")]
    UnmatchedCallback(String),

    /// The call quota is exhausted and the pending queue already holds the maximum number of
    /// requests allowed. Contains that maximum.
    #[error("Request queue is full ({0} pending requests)")]
    QueueFull(usize),
}

fn http_reason(code: &u16, reason: &Option<String>) -> String {
    match reason {
        Some(reason) => format!(": {}", reason),
        // Give em a generic reason
        None => match *code {
            200 => String::from(" OK: Request was successful"),
            403 => String::from(" Forbidden: Access denied. May indicate that the API rate limit was exceeded."),
            404 => String::from(" Not Found"),
            429 => String::from(" Too Many Requests: The API rate limit was exceeded, try again later"),
            500 => String::from(" Internal Server Error: Some unknown error occurred on the server"),
            502 => String::from(" Bad Gateway: A gateway server received an invalid response from the API servers"),
            503 => String::from(" Service Unavailable: Server cannot currently handle the request. Try again later."),
            _ => String::new(),
        },
    }
}

impl From<InvalidHeaderValue> for Error {
    fn from(e: InvalidHeaderValue) -> Error {
        Error::CannotCreateClient(format!("Invalid header value: {}", e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error {
        Error::Serial(e.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Error {
        Error::InvalidUrl(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Error {
        match e.status() {
            Some(status) => Error::Http(status.as_u16(), None),
            None => Error::CannotSendRequest(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_uses_api_reason() {
        assert_eq!(
            Error::Http(404, Some(String::from("Not found."))).to_string(),
            "HTTP error 404: Not found."
        );
    }

    #[test]
    fn http_error_falls_back_to_generic_reason() {
        assert_eq!(Error::Http(404, None).to_string(), "HTTP error 404 Not Found");
        assert_eq!(Error::Http(418, None).to_string(), "HTTP error 418");
    }

    #[test]
    fn serde_errors_convert() {
        let e = serde_json::from_str::<u64>("\"nope\"").unwrap_err();

        assert!(matches!(Error::from(e), Error::Serial(_)));
    }
}
