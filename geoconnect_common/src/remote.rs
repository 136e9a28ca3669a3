//! Failures talking to WorldMap or Dataverse.
//!
//! These are the only errors whose text we show to people using the web
//! pages, so every message here is written for them.

use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Something went wrong while calling a remote API.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemoteError {
    /// The remote server did not answer in time.
    #[error("This request timed out.  (Time limit: {} seconds(s))", limit.as_secs())]
    Timeout {
        /// The time limit we applied.
        limit: Duration,
    },

    /// We could not reach the remote server at all.
    #[error("Could not contact the {service} server: {url}")]
    Connection {
        /// `"WorldMap"` or `"Dataverse"`.
        service: &'static str,
        /// The URL we tried.
        url: String,
        /// What went wrong underneath.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with `success: false`.
    #[error("{message}")]
    Rejected {
        /// The HTTP status of the response.
        status: u16,
        /// The server's explanation.
        message: String,
        /// Any extra data which came with the rejection.
        data: Option<serde_json::Value>,
    },

    /// Dataverse refused a metadata update.
    #[error("Sorry! The update failed.")]
    UpdateFailed {
        /// The HTTP status of the response.
        status: u16,
        /// The response body, for the logs.
        body: String,
    },

    /// The Dataverse delete API answered 404.
    #[error("The Dataverse delete API was not available")]
    DeleteApiUnavailable,

    /// The server claimed failure without saying why.
    #[error("The import failed for an unknown reason")]
    Unknown,

    /// The server answered, but the response body broke off or could not
    /// be decoded.
    #[error("Sorry! The {service} server sent a response we could not read.")]
    UnreadableResponse {
        /// `"WorldMap"` or `"Dataverse"`.
        service: &'static str,
        /// What went wrong underneath.
        #[source]
        source: reqwest::Error,
    },

    /// We couldn't understand the response.
    #[error("Sorry! The {service} server sent a response we could not understand (HTTP {status}).")]
    InvalidResponse {
        /// `"WorldMap"` or `"Dataverse"`.
        service: &'static str,
        /// The HTTP status of the response.
        status: u16,
        /// The response body, for the logs.
        body: String,
    },
}

impl RemoteError {
    /// Classify a `reqwest` transport error.
    pub fn from_transport(
        err: reqwest::Error,
        service: &'static str,
        url: &str,
        limit: Duration,
    ) -> RemoteError {
        if err.is_timeout() {
            RemoteError::Timeout { limit }
        } else if err.is_body() || err.is_decode() {
            RemoteError::UnreadableResponse {
                service,
                source: err,
            }
        } else {
            RemoteError::Connection {
                service,
                url: url.to_owned(),
                source: err,
            }
        }
    }

    /// Build an `InvalidResponse` error.
    pub fn invalid_response(
        service: &'static str,
        status: StatusCode,
        body: impl Into<String>,
    ) -> RemoteError {
        RemoteError::InvalidResponse {
            service,
            status: status.as_u16(),
            body: body.into(),
        }
    }

    /// The raw response body, if we have one. We keep this alongside failed
    /// import attempts.
    pub fn original_response(&self) -> String {
        match self {
            RemoteError::Rejected { data: Some(data), .. } => data.to_string(),
            RemoteError::UpdateFailed { body, .. }
            | RemoteError::InvalidResponse { body, .. } => body.clone(),
            _ => String::new(),
        }
    }
}

/// Find a `RemoteError` anywhere in an error's chain of causes.
pub fn find_remote_error(err: &anyhow::Error) -> Option<&RemoteError> {
    err.chain().find_map(|cause| cause.downcast_ref::<RemoteError>())
}

#[test]
fn messages_match_what_users_expect() {
    assert_eq!(
        RemoteError::Timeout {
            limit: Duration::from_secs(240)
        }
        .to_string(),
        "This request timed out.  (Time limit: 240 seconds(s))"
    );
    assert_eq!(
        RemoteError::UpdateFailed {
            status: 500,
            body: "oops".to_owned()
        }
        .to_string(),
        "Sorry! The update failed."
    );
    assert_eq!(
        RemoteError::Rejected {
            status: 200,
            message: "Layer not found".to_owned(),
            data: None,
        }
        .to_string(),
        "Layer not found"
    );
}
