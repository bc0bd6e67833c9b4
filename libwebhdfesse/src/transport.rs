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
/*!
 * The HTTP exchange itself.  The rest of the crate only needs
 * [`Transport::send`]; [`HttpTransport`] implements it with a blocking
 * reqwest client configured from [`ClientConfig`].
 */
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderValue, AUTHORIZATION};
use http::{HeaderMap, Method, StatusCode};
use reqwest::blocking;
use thiserror::Error;
use tracing::{instrument, trace};

use crate::config::{ClientConfig, VerifyMode};
use crate::error::{Failure, WebHdfsError};

/// Request body.  A reader is streamed with a known length and can be
/// sent only once.
pub enum Payload {
    Empty,
    Bytes(Bytes),
    Reader {
        reader: Box<dyn Read + Send>,
        len: u64,
    },
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Empty => true,
            Payload::Bytes(data) => data.is_empty(),
            Payload::Reader { len, .. } => *len == 0,
        }
    }
}

impl Default for Payload {
    fn default() -> Self {
        Payload::Empty
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Empty => f.write_str("Empty"),
            Payload::Bytes(data) => write!(f, "Bytes({} bytes)", data.len()),
            Payload::Reader { len, .. } => write!(f, "Reader({} bytes)", len),
        }
    }
}

impl From<Bytes> for Payload {
    fn from(data: Bytes) -> Self {
        Payload::Bytes(data)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(data: Vec<u8>) -> Self {
        Payload::Bytes(data.into())
    }
}

impl From<&'static [u8]> for Payload {
    fn from(data: &'static [u8]) -> Self {
        Payload::Bytes(Bytes::from_static(data))
    }
}

impl From<String> for Payload {
    fn from(data: String) -> Self {
        Payload::Bytes(data.into())
    }
}

impl From<&'static str> for Payload {
    fn from(data: &'static str) -> Self {
        Payload::Bytes(Bytes::from_static(data.as_bytes()))
    }
}

#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub secure: bool,
    pub host: String,
    pub port: u16,
    /// Encoded path with query.
    pub path: String,
    pub headers: HeaderMap,
    pub payload: Payload,
}

impl Request {
    pub fn url(&self) -> String {
        format!(
            "{}://{}:{}{}",
            if self.secure { "https" } else { "http" },
            self.host,
            self.port,
            self.path
        )
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("negotiation failed: {0}")]
    Kerberos(String),
    #[error("body transfer failed: {0}")]
    Body(String),
    #[error("cannot build request: {0}")]
    Build(String),
}

impl From<TransportError> for WebHdfsError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Kerberos(msg) => WebHdfsError::Kerberos(msg),
            TransportError::Build(_) => WebHdfsError::RequestFailed(Failure::local(err.to_string())),
            // Network failures are treated as server failures, which makes
            // them eligible for failover.
            _ => WebHdfsError::Server(Failure::local(err.to_string())),
        }
    }
}

pub trait Transport {
    fn send(&self, request: Request) -> Result<Response, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: Request) -> Result<Response, TransportError> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, request: Request) -> Result<Response, TransportError> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: Request) -> Result<Response, TransportError> {
        (**self).send(request)
    }
}

/**
 * Source of SPNEGO tokens.  The token exchange with a KDC lives
 * outside this crate; the transport only attaches the token as an
 * `Authorization: Negotiate` header.  `keytab` holds the client
 * principal's credentials.
 */
pub trait NegotiateProvider: Send + Sync {
    fn token(&self, host: &str, keytab: &Path) -> Result<String, String>;
}

/// [`Transport`] over a blocking reqwest client.  Redirects are never
/// followed automatically.
pub struct HttpTransport {
    client: blocking::Client,
    negotiate: Option<Arc<dyn NegotiateProvider>>,
    /// Set iff Kerberos is enabled.
    keytab: Option<PathBuf>,
    read_timeout: Option<Duration>,
    basic_auth: Option<(String, Option<String>)>,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("keytab", &self.keytab)
            .field("read_timeout", &self.read_timeout)
            .field("negotiate", &self.negotiate.is_some())
            .field("basic_auth", &self.basic_auth.as_ref().map(|(user, _)| user))
            .finish()
    }
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let keytab = if config.kerberos.enabled {
            let keytab = config.kerberos.keytab.clone().ok_or_else(|| {
                TransportError::Kerberos(
                    "kerberos is enabled, but the keytab path is not set".to_owned(),
                )
            })?;
            Some(keytab)
        } else {
            None
        };

        // The read timeout is applied per request in `send`.
        let mut builder = blocking::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(None);
        if let Some(open) = config.timeouts.open {
            builder = builder.connect_timeout(open);
        }

        if let Some(proxy) = &config.proxy {
            let mut reqwest_proxy =
                reqwest::Proxy::all(format!("http://{}:{}", proxy.address, proxy.port))
                    .map_err(|e| TransportError::Build(e.to_string()))?;
            if let Some(user) = &proxy.user {
                reqwest_proxy =
                    reqwest_proxy.basic_auth(user, proxy.password.as_deref().unwrap_or(""));
            }
            builder = builder.proxy(reqwest_proxy);
        }

        if config.tls.enabled {
            if let Some(ca_file) = &config.tls.ca_file {
                let pem = read_file(ca_file)?;
                let cert = reqwest::Certificate::from_pem(&pem)
                    .map_err(|e| TransportError::Build(e.to_string()))?;
                builder = builder.add_root_certificate(cert);
            }
            if let Some((cert, key)) = config.tls.client_cert.as_ref().zip(config.tls.client_key.as_ref())
            {
                let identity = reqwest::Identity::from_pkcs8_pem(&read_file(cert)?, &read_file(key)?)
                    .map_err(|e| TransportError::Build(e.to_string()))?;
                builder = builder.identity(identity);
            }
            if config.tls.verify == VerifyMode::None {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        Ok(Self {
            client,
            negotiate: None,
            keytab,
            read_timeout: config.timeouts.read,
            basic_auth: config
                .basic_auth
                .as_ref()
                .map(|auth| (auth.user.clone(), auth.password.clone())),
        })
    }

    pub fn with_negotiate(mut self, provider: Arc<dyn NegotiateProvider>) -> Self {
        self.negotiate = Some(provider);
        self
    }

    /// Whole-request limit.  Uploads stream for as long as they take.
    fn request_timeout(&self, payload: &Payload) -> Option<Duration> {
        match payload {
            Payload::Empty => self.read_timeout,
            Payload::Bytes(_) | Payload::Reader { .. } => None,
        }
    }

    fn negotiate_header(&self, host: &str) -> Result<Option<HeaderValue>, TransportError> {
        let keytab = match &self.keytab {
            Some(keytab) => keytab,
            None => return Ok(None),
        };
        let provider = self.negotiate.as_ref().ok_or_else(|| {
            TransportError::Kerberos("kerberos is enabled, but no token provider is set".to_owned())
        })?;
        let token = provider.token(host, keytab).map_err(TransportError::Kerberos)?;
        HeaderValue::from_str(&format!("Negotiate {}", token))
            .map(Some)
            .map_err(|e| TransportError::Kerberos(e.to_string()))
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, TransportError> {
    std::fs::read(path).map_err(|e| TransportError::Build(format!("{}: {}", path.display(), e)))
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_builder() {
        TransportError::Build(err.to_string())
    } else if err.is_body() || err.is_decode() {
        TransportError::Body(err.to_string())
    } else {
        TransportError::Connect(err.to_string())
    }
}

impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(method = %request.method, host = %request.host))]
    fn send(&self, request: Request) -> Result<Response, TransportError> {
        let url = request.url();
        trace!(url = %url, payload = ?request.payload, "sending");

        let mut builder = self
            .client
            .request(request.method, &url)
            .headers(request.headers);
        if let Some(value) = self.negotiate_header(&request.host)? {
            builder = builder.header(AUTHORIZATION, value);
        }
        if let Some((user, password)) = &self.basic_auth {
            builder = builder.basic_auth(user, password.as_ref());
        }
        if let Some(timeout) = self.request_timeout(&request.payload) {
            builder = builder.timeout(timeout);
        }
        builder = match request.payload {
            Payload::Empty => builder,
            Payload::Bytes(data) => builder.body(data),
            Payload::Reader { reader, len } => builder.body(blocking::Body::sized(reader, len)),
        };

        let response = builder.send().map_err(map_reqwest_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().map_err(map_reqwest_error)?;
        trace!(%status, len = body.len(), "received");

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}
