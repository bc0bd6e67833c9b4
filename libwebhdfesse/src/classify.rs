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
 * Turning a raw HTTP response into a success, a redirect or a typed
 * error.
 */
use bytes::Bytes;
use http::header::LOCATION;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Failure, RemoteException, WebHdfsError};
use crate::path::Target;
use crate::transport::Response;

pub const EMPTY_BODY_MESSAGE: &str = "Response body is empty...";

/// A 2xx response, or a 3xx one treated as final.
#[derive(Debug, Clone)]
pub struct Success {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub raw: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Text(Bytes),
}

impl Success {
    /// JSON if the body parses, whatever the declared content type;
    /// raw bytes otherwise.
    pub fn body(&self) -> Body {
        match serde_json::from_slice(&self.raw) {
            Ok(value) => Body::Json(value),
            Err(_) => Body::Text(self.raw.clone()),
        }
    }

    /**
     * Result of a boolean operation: 200, a JSON body and a truthy
     * `boolean` field.  Anything else is `false`, not an error.
     */
    pub fn boolean(&self) -> bool {
        if self.status != StatusCode::OK {
            return false;
        }
        match self.body() {
            Body::Json(value) => match value.get("boolean") {
                None | Some(Value::Null) | Some(Value::Bool(false)) => false,
                Some(_) => true,
            },
            Body::Text(_) => false,
        }
    }

    pub fn decode<D: DeserializeOwned>(&self) -> Result<D, WebHdfsError> {
        serde_json::from_slice(&self.raw).map_err(|e| {
            WebHdfsError::RequestFailed(Failure::new(
                Some(self.status),
                format!("malformed response body: {}", e),
            ))
        })
    }
}

impl From<Response> for Success {
    fn from(response: Response) -> Self {
        Self {
            status: response.status,
            headers: response.headers,
            raw: response.body,
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    Success(Success),
    Redirect { location: Target, response: Success },
    Failure(WebHdfsError),
}

impl Outcome {
    /// A redirect is not followed and is returned as a plain success.
    pub fn into_terminal(self) -> Result<Success, WebHdfsError> {
        match self {
            Outcome::Success(success) => Ok(success),
            Outcome::Redirect { response, .. } => Ok(response),
            Outcome::Failure(err) => Err(err),
        }
    }
}

fn body_message(body: &[u8]) -> String {
    if body.is_empty() {
        EMPTY_BODY_MESSAGE.to_owned()
    } else {
        String::from_utf8_lossy(body)
            .chars()
            .filter(|c| *c != '\n' && *c != '\r')
            .collect()
    }
}

/// Error for a response with a non-success status.
pub fn error_for(status: StatusCode, body: &[u8]) -> WebHdfsError {
    let message = body_message(body);
    let remote = RemoteException::from_body(body);
    let failure = |message: String| Failure::new(Some(status), message).with_remote(remote);

    match status.as_u16() {
        400 => WebHdfsError::Client(failure(message)),
        401 => WebHdfsError::Security(failure(message)),
        403 => WebHdfsError::Io(failure(message)),
        404 => WebHdfsError::NotFound(failure(message)),
        500 => WebHdfsError::Server(failure(message)),
        code => WebHdfsError::RequestFailed(failure(format!(
            "response code:{}, message:{}",
            code, message
        ))),
    }
}

pub(crate) fn non_redirection(status: StatusCode, body: &[u8]) -> WebHdfsError {
    WebHdfsError::RequestFailed(Failure::new(
        Some(status),
        format!(
            "NameNode returns non-redirection (or without location header), code:{}, body:{}.",
            status.as_u16(),
            String::from_utf8_lossy(body)
        ),
    ))
}

pub fn classify(response: Response) -> Outcome {
    let status = response.status;
    if status.is_success() {
        Outcome::Success(response.into())
    } else if status.is_redirection() {
        let location = response
            .headers
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .and_then(Target::from_location);
        match location {
            Some(location) => Outcome::Redirect {
                location,
                response: response.into(),
            },
            None => Outcome::Failure(non_redirection(status, &response.body)),
        }
    } else {
        Outcome::Failure(error_for(status, &response.body))
    }
}

/// Classification of a response that is final whatever its status.
pub fn classify_terminal(response: Response) -> Result<Success, WebHdfsError> {
    let status = response.status;
    if status.is_success() || status.is_redirection() {
        Ok(response.into())
    } else {
        Err(error_for(status, &response.body))
    }
}
