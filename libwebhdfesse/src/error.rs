/*
   Copyright 2021 Ivan Boldyrev

   Licensed under the Apache License, Version 2.0 (the "License");
   you may not use this file except in compliance with the License.
   You may obtain a copy of the License at

       http://www.apache.org/licenses/LICENSE-2.0

   Unless required by applicable law or agreed to in writing, software
   distributed under the License is distributed on an "AS IS" BASIS,
   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
   See the License for the specific language governing permissions and
   limitations under the License.
*/
use std::fmt;

use http::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/**
 * Server-side exception, as WebHDFS reports it in an error body:
 * `{"RemoteException": {"exception": ..., "javaClassName": ..., "message": ...}}`.
 */
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteException {
    pub exception: String,
    #[serde(default)]
    pub java_class_name: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Deserialize)]
struct RemoteExceptionBody {
    #[serde(rename = "RemoteException")]
    remote_exception: RemoteException,
}

impl RemoteException {
    /// Decode the exception from a response body; `None` if the body
    /// is not a RemoteException envelope.
    pub fn from_body(body: &[u8]) -> Option<Self> {
        serde_json::from_slice::<RemoteExceptionBody>(body)
            .ok()
            .map(|body| body.remote_exception)
    }

    /// Match either the short exception name ("StandbyException") or
    /// the fully qualified Java class name.
    pub fn is(&self, name: &str) -> bool {
        fn matches(candidate: &str, name: &str) -> bool {
            candidate == name || candidate.rsplit('.').next() == Some(name)
        }
        matches(&self.exception, name)
            || self
                .java_class_name
                .as_deref()
                .map(|class| matches(class, name))
                .unwrap_or(false)
    }
}

/**
 * Details of a failed exchange: the HTTP status (absent for transport
 * and protocol failures), the message and the decoded RemoteException.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub status: Option<StatusCode>,
    pub message: String,
    pub remote: Option<RemoteException>,
}

impl Failure {
    pub fn new(status: Option<StatusCode>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            remote: None,
        }
    }

    pub(crate) fn local(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }

    pub(crate) fn with_remote(mut self, remote: Option<RemoteException>) -> Self {
        self.remote = remote;
        self
    }

    /// The server's own message if there is one, the whole message
    /// otherwise.
    pub fn remote_message(&self) -> &str {
        self.remote
            .as_ref()
            .map(|remote| remote.message.as_str())
            .unwrap_or(&self.message)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no such option for {op}: {keys}")]
    UnknownOption { op: &'static str, keys: String },
    #[error("option key {0:?} is not lowercase")]
    NonCanonicalKey(String),
    #[error("{op} requires at least one of: {}", .keys.join(", "))]
    MissingOneOf {
        op: &'static str,
        keys: &'static [&'static str],
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Client,
    Security,
    Io,
    NotFound,
    Server,
    RequestFailed,
    InvalidOp,
    Kerberos,
    JmxUnavailable,
    Validation,
}

#[derive(Debug, Error)]
pub enum WebHdfsError {
    /// 400 Bad Request.
    #[error("client error: {0}")]
    Client(Failure),
    /// 401 Unauthorized.
    #[error("security error: {0}")]
    Security(Failure),
    /// 403 Forbidden; server-side filesystem exceptions land here.
    #[error("I/O error: {0}")]
    Io(Failure),
    /// 404 Not Found.
    #[error("not found: {0}")]
    NotFound(Failure),
    /// 500 or a transport-level failure.
    #[error("server error: {0}")]
    Server(Failure),
    /// Any other status, or a protocol violation.
    #[error("request failed: {0}")]
    RequestFailed(Failure),
    #[error("invalid operation: {0}")]
    InvalidOp(Failure),
    #[error("kerberos error: {0}")]
    Kerberos(String),
    #[error("JMX discovery unavailable: {0}")]
    JmxUnavailable(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl WebHdfsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WebHdfsError::Client(_) => ErrorKind::Client,
            WebHdfsError::Security(_) => ErrorKind::Security,
            WebHdfsError::Io(_) => ErrorKind::Io,
            WebHdfsError::NotFound(_) => ErrorKind::NotFound,
            WebHdfsError::Server(_) => ErrorKind::Server,
            WebHdfsError::RequestFailed(_) => ErrorKind::RequestFailed,
            WebHdfsError::InvalidOp(_) => ErrorKind::InvalidOp,
            WebHdfsError::Kerberos(_) => ErrorKind::Kerberos,
            WebHdfsError::JmxUnavailable(_) => ErrorKind::JmxUnavailable,
            WebHdfsError::Validation(_) => ErrorKind::Validation,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            WebHdfsError::Client(failure)
            | WebHdfsError::Security(failure)
            | WebHdfsError::Io(failure)
            | WebHdfsError::NotFound(failure)
            | WebHdfsError::Server(failure)
            | WebHdfsError::RequestFailed(failure)
            | WebHdfsError::InvalidOp(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.failure().and_then(|failure| failure.status)
    }

    pub fn remote_exception(&self) -> Option<&RemoteException> {
        self.failure().and_then(|failure| failure.remote.as_ref())
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}
