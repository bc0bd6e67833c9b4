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
//! Scripted in-memory transport shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::Read;
use std::time::Duration;

use http::header::{HeaderName, HeaderValue, CONTENT_TYPE, LOCATION};
use http::{HeaderMap, Method, StatusCode};
use libwebhdfesse::config::RetryPolicy;
use libwebhdfesse::{ClientConfig, Payload, Request, Response, Transport, TransportError};
use parking_lot::Mutex;

pub const NAMENODE: &str = "nn1";
pub const NAMENODE_PORT: u16 = 50070;
pub const STANDBY: &str = r#"{"RemoteException":{"exception":"StandbyException","javaClassName":"org.apache.hadoop.ipc.StandbyException","message":"Operation category READ is not supported in state standby"}}"#;
pub const ROOT_STATUS: &str = r#"{"FileStatus":{"pathSuffix":"","type":"DIRECTORY","length":0,"owner":"hdfs","group":"supergroup","permission":"755","modificationTime":1600000000000}}"#;

/// A request as the transport saw it, with the body read out.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Recorded {
    /// Raw `key=value` pairs of the query string, still encoded.
    pub fn query(&self) -> Vec<(String, String)> {
        self.path
            .split_once('?')
            .map(|(_, query)| query)
            .unwrap_or("")
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => (key.to_owned(), value.to_owned()),
                None => (pair.to_owned(), String::new()),
            })
            .collect()
    }

    pub fn param(&self, key: &str) -> Option<String> {
        self.query()
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }
}

/// Replays queued responses per host; an unscripted host refuses
/// the connection.
#[derive(Default)]
pub struct MockTransport {
    scripts: Mutex<HashMap<String, VecDeque<Response>>>,
    log: Mutex<Vec<Recorded>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, host: &str, status: u16, headers: &[(&str, &str)], body: &str) -> &Self {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.append(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        let response = Response::new(
            StatusCode::from_u16(status).unwrap(),
            map,
            body.as_bytes().to_vec(),
        );
        self.scripts
            .lock()
            .entry(host.to_owned())
            .or_default()
            .push_back(response);
        self
    }

    pub fn json(&self, host: &str, status: u16, body: &str) -> &Self {
        self.reply(host, status, &[(CONTENT_TYPE.as_str(), "application/json")], body)
    }

    pub fn redirect(&self, host: &str, location: &str) -> &Self {
        self.reply(host, 307, &[(LOCATION.as_str(), location)], "")
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.log.lock().clone()
    }

    pub fn hosts(&self) -> Vec<String> {
        self.log.lock().iter().map(|req| req.host.clone()).collect()
    }

    pub fn remaining(&self, host: &str) -> usize {
        self.scripts.lock().get(host).map_or(0, VecDeque::len)
    }
}

impl Transport for MockTransport {
    fn send(&self, request: Request) -> Result<Response, TransportError> {
        let body = match request.payload {
            Payload::Empty => vec![],
            Payload::Bytes(data) => data.to_vec(),
            Payload::Reader { mut reader, .. } => {
                let mut buf = vec![];
                reader
                    .read_to_end(&mut buf)
                    .map_err(|e| TransportError::Body(e.to_string()))?;
                buf
            }
        };
        self.log.lock().push(Recorded {
            method: request.method,
            host: request.host.clone(),
            port: request.port,
            path: request.path,
            headers: request.headers,
            body,
        });

        self.scripts
            .lock()
            .get_mut(&request.host)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| TransportError::Connect(format!("{}: connection refused", request.host)))
    }
}

/// Fast retries for tests.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::default().with_interval(Duration::ZERO)
}

pub fn config() -> ClientConfig {
    ClientConfig::new(NAMENODE, NAMENODE_PORT).with_retry(fast_retry())
}
