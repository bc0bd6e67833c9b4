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
 * Active NameNode lookup through the JMX servlet of a NameNode.
 */
use http::{HeaderMap, Method};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::{ClientConfig, DEFAULT_PORT};
use crate::error::WebHdfsError;
use crate::path::Target;
use crate::transport::{Payload, Request, Transport};

pub const JMX_QUERY: &str = "jmx?qry=Hadoop:service=NameNode,name=NameNodeStatus";

#[derive(Debug, Deserialize)]
struct JmxResponse {
    #[serde(default)]
    beans: Vec<NameNodeStatusBean>,
}

#[derive(Debug, Deserialize)]
struct NameNodeStatusBean {
    #[serde(rename = "State")]
    state: Option<String>,
    #[serde(rename = "HostAndPort")]
    host_and_port: Option<String>,
}

/// What a NameNode's JMX servlet says about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameNodeStatus {
    /// HA state, e.g. "active" or "standby".
    pub state: Option<String>,
    /// Host part of `HostAndPort`.
    pub host: String,
}

impl NameNodeStatus {
    pub fn is_active(&self) -> bool {
        self.state.as_deref() == Some("active")
    }
}

fn unavailable(message: impl Into<String>) -> WebHdfsError {
    WebHdfsError::JmxUnavailable(message.into())
}

/// Decode the first `NameNodeStatus` bean.
pub fn parse_status(body: &[u8]) -> Result<NameNodeStatus, WebHdfsError> {
    let response: JmxResponse = serde_json::from_slice(body)
        .map_err(|e| unavailable(format!("malformed JMX response: {}", e)))?;
    let bean = response
        .beans
        .into_iter()
        .next()
        .ok_or_else(|| unavailable("no beans in JMX response"))?;
    let host_and_port = bean
        .host_and_port
        .ok_or_else(|| unavailable("no HostAndPort in JMX response"))?;

    match host_and_port.split(':').next() {
        Some(host) if !host.is_empty() => Ok(NameNodeStatus {
            state: bean.state,
            host: host.to_owned(),
        }),
        _ => Err(unavailable(format!(
            "invalid HostAndPort {:?} in JMX response",
            host_and_port
        ))),
    }
}

/// Host part of the first bean's `HostAndPort`.
pub fn parse_active_host(body: &[u8]) -> Result<String, WebHdfsError> {
    parse_status(body).map(|status| status.host)
}

/// Query the `NameNodeStatus` bean of one endpoint.
pub fn fetch_status<T: Transport + ?Sized>(
    transport: &T,
    endpoint: &str,
) -> Result<NameNodeStatus, WebHdfsError> {
    let target = Target::from_endpoint(endpoint, DEFAULT_PORT)
        .ok_or_else(|| unavailable(format!("invalid JMX host {:?}", endpoint)))?;

    let base = target.path.split('?').next().unwrap_or("").trim_end_matches('/');
    let request = Request {
        method: Method::GET,
        secure: target.secure,
        host: target.host,
        port: target.port,
        path: format!("{}/{}", base, JMX_QUERY),
        headers: HeaderMap::new(),
        payload: Payload::Empty,
    };

    let response = transport
        .send(request)
        .map_err(|e| unavailable(e.to_string()))?;
    if !response.status.is_success() {
        return Err(unavailable(format!(
            "JMX endpoint returned {}",
            response.status
        )));
    }
    parse_status(&response.body)
}

/**
 * Find the active NameNode.  A configured JMX host is trusted to name
 * it; otherwise every HA namenode is asked for its own state and the
 * first active one wins.  Every failure, including a client with
 * neither, is `JmxUnavailable`.
 */
#[instrument(skip(transport, config), fields(jmx = ?config.jmx_host))]
pub fn discover_active_namenode<T: Transport + ?Sized>(
    transport: &T,
    config: &ClientConfig,
) -> Result<String, WebHdfsError> {
    if let Some(jmx_host) = config.jmx_host.as_deref().filter(|host| !host.is_empty()) {
        let host = fetch_status(transport, jmx_host)?.host;
        debug!(%host, "active namenode");
        return Ok(host);
    }

    if config.namenodes.is_empty() {
        return Err(unavailable("JMX host is not set"));
    }
    for candidate in &config.namenodes {
        match fetch_status(transport, candidate) {
            Ok(status) if status.is_active() => {
                debug!(%candidate, host = %status.host, "active namenode");
                return Ok(status.host);
            }
            Ok(status) => debug!(%candidate, state = ?status.state, "not active"),
            Err(e) => debug!(%candidate, "{}", e),
        }
    }
    Err(unavailable(format!(
        "no active namenode among {}",
        config.namenodes.join(", ")
    )))
}
