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
 * The WebHDFS two-step protocol.  Data operations are first sent to
 * the NameNode without a body; the NameNode answers with a redirect to
 * a DataNode, and the real request goes there verbatim.
 */
use http::header::{HeaderValue, CONTENT_TYPE};
use http::HeaderMap;
use tracing::{debug, instrument, trace};

use crate::classify::{classify, classify_terminal, non_redirection, Outcome, Success};
use crate::config::ClientConfig;
use crate::error::{Failure, WebHdfsError};
use crate::op::{Operation, Options};
use crate::path::{Target, UrlBuilder};
use crate::transport::{Payload, Request, Transport};

const OCTET_STREAM: &str = "application/octet-stream";

/**
 * Request body shared by the attempts of one logical call.  In-memory
 * data is cloned for every attempt; a reader is handed out once.
 */
#[derive(Debug, Default)]
pub struct PayloadSlot {
    payload: Payload,
    consumed: bool,
}

impl PayloadSlot {
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            consumed: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn take(&mut self) -> Result<Payload, WebHdfsError> {
        if self.consumed {
            return Err(WebHdfsError::RequestFailed(Failure::local(
                "streamed payload was already sent and cannot be replayed",
            )));
        }
        match &self.payload {
            Payload::Empty => Ok(Payload::Empty),
            Payload::Bytes(data) => Ok(Payload::Bytes(data.clone())),
            Payload::Reader { .. } => {
                self.consumed = true;
                Ok(std::mem::take(&mut self.payload))
            }
        }
    }
}

fn octet_stream(mut headers: HeaderMap) -> HeaderMap {
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(OCTET_STREAM));
    headers
}

/**
 * Execute one attempt of `op` on `path`.  Returns the final response
 * or the classified failure.
 */
#[instrument(skip(transport, config, params, payload), fields(host = %config.host))]
pub fn dispatch<T: Transport + ?Sized>(
    transport: &T,
    config: &ClientConfig,
    op: Operation,
    path: &str,
    params: &Options,
    payload: &mut PayloadSlot,
) -> Result<Success, WebHdfsError> {
    let urls = UrlBuilder::from_config(config);

    if config.httpfs_mode && op.carries_payload() {
        // HttpFS proxies the data itself; it is never redirected.
        let mut params = params.clone();
        params.set("data", true);
        let request = Request {
            method: op.method(),
            secure: config.tls.enabled,
            host: config.host.clone(),
            port: config.port,
            path: urls.build(path, op, &params),
            headers: octet_stream(config.headers.clone()),
            payload: payload.take()?,
        };
        trace!(path = %request.path, "httpfs request");
        return classify_terminal(transport.send(request)?);
    }

    let initiate = Request {
        method: op.method(),
        secure: config.tls.enabled,
        host: config.host.clone(),
        port: config.port,
        path: urls.build(path, op, params),
        headers: config.headers.clone(),
        payload: Payload::Empty,
    };
    trace!(path = %initiate.path, "initiate");
    let response = transport.send(initiate)?;

    if !op.is_redirected() || config.httpfs_mode {
        return classify_terminal(response);
    }

    match classify(response) {
        Outcome::Redirect { location, .. } => follow(transport, config, op, location, payload),
        Outcome::Success(success) => Err(non_redirection(success.status, &success.raw)),
        Outcome::Failure(err) => Err(err),
    }
}

fn follow<T: Transport + ?Sized>(
    transport: &T,
    config: &ClientConfig,
    op: Operation,
    location: Target,
    payload: &mut PayloadSlot,
) -> Result<Success, WebHdfsError> {
    debug!(host = %location.host, port = location.port, "following redirect");

    let (headers, payload) = if op.carries_payload() {
        (octet_stream(config.headers.clone()), payload.take()?)
    } else {
        (config.headers.clone(), Payload::Empty)
    };
    let request = Request {
        method: op.method(),
        secure: location.secure,
        host: location.host,
        port: location.port,
        path: location.path,
        headers,
        payload,
    };

    // The DataNode response is final even if it redirects again.
    classify(transport.send(request)?).into_terminal()
}
