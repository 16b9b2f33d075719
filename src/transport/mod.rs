//! Request/response access to the agent backend.
//!
//! Every backend operation is a GET with percent-encoded query parameters that
//! answers with a JSON body. `HttpTransport` is the real implementation; the
//! workflow only sees the `Transport` trait.

mod error;
mod http;
#[cfg(test)]
pub(crate) mod testing;

pub use error::{ErrorKind, TransportError};
pub use http::HttpTransport;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use std::fmt;

/// Canonical query key for the start-run operation.
pub const QUERY_PARAM: &str = "query_reported";
pub const THREAD_ID_PARAM: &str = "thread_id";

/// Characters `encodeURIComponent` leaves untouched.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operation {
    StartRun,
    ResumeRun,
    ListSessions,
    GetRunDocuments,
}

impl Operation {
    /// Path segment appended to the base URL.
    pub fn path(self) -> &'static str {
        match self {
            Operation::StartRun => "run-agent",
            Operation::ResumeRun => "resume-agent",
            Operation::ListSessions => "get-sessions",
            Operation::GetRunDocuments => "get-run-documents",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

pub type Params = Vec<(&'static str, String)>;

#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(
        &self,
        operation: Operation,
        params: &[(&'static str, String)],
    ) -> Result<serde_json::Value, TransportError>;
}

/// Render `params` as a query string (without the leading `?`).
pub fn encode_query(params: &[(&'static str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                utf8_percent_encode(k, COMPONENT),
                utf8_percent_encode(v, COMPONENT)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Join base URL, operation path and encoded parameters.
pub fn build_url(base_url: &str, operation: Operation, params: &[(&'static str, String)]) -> String {
    let mut url = format!("{}/{}", base_url.trim_end_matches('/'), operation.path());
    if !params.is_empty() {
        url.push('?');
        url.push_str(&encode_query(params));
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_like_encode_uri_component() {
        let q = encode_query(&[(QUERY_PARAM, "knocking sound & 50% (loud)".into())]);
        assert_eq!(q, "query_reported=knocking%20sound%20%26%2050%25%20(loud)");
    }

    #[test]
    fn encodes_non_ascii() {
        let q = encode_query(&[(THREAD_ID_PARAM, "é/?#".into())]);
        assert_eq!(q, "thread_id=%C3%A9%2F%3F%23");
    }

    #[test]
    fn builds_urls_with_and_without_params() {
        assert_eq!(
            build_url("http://localhost:8000/api/", Operation::ListSessions, &[]),
            "http://localhost:8000/api/get-sessions"
        );
        assert_eq!(
            build_url(
                "http://localhost:8000/api",
                Operation::GetRunDocuments,
                &[(THREAD_ID_PARAM, "t-1".into())]
            ),
            "http://localhost:8000/api/get-run-documents?thread_id=t-1"
        );
    }
}
