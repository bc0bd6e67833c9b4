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
 * WebHDFS request URLs: the API path, the query string and parsing of
 * redirect locations.
 */

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS, NON_ALPHANUMERIC};
use uriparse::URI;

use crate::config::ClientConfig;
use crate::op::{Operation, Options};

pub const API_ROOT: &str = "/webhdfs/v1";

// https://url.spec.whatwg.org/#path-percent-encode-set
// HDFS paths are never percent-encoded, so '%' is escaped too.
const PATH_PERCENT_ENCODE_SET: &AsciiSet = &CONTROLS
    // query percent-encode set
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    // path per se
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'%');

// application/x-www-form-urlencoded byte serializer set.
const FORM_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'*')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_');

/// Percent-encode a path for the HTTP request line.
pub fn encode_path(path: &str) -> String {
    utf8_percent_encode(path, PATH_PERCENT_ENCODE_SET).to_string()
}

/// Form-encode a query key or value; space becomes '+'.
pub fn form_encode(value: &str) -> String {
    utf8_percent_encode(value, FORM_ENCODE_SET)
        .to_string()
        .replace("%20", "+")
}

/**
 * Builds the request path and query of a NameNode request.
 */
#[derive(Debug, Clone, Default)]
pub struct UrlBuilder<'a> {
    gateway_prefix: Option<&'a str>,
    username: Option<&'a str>,
    doas: Option<&'a str>,
}

impl<'a> UrlBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &'a ClientConfig) -> Self {
        Self {
            gateway_prefix: config.gateway_prefix.as_deref(),
            username: config.username.as_deref(),
            doas: config.doas.as_deref(),
        }
    }

    pub fn with_gateway_prefix(mut self, prefix: &'a str) -> Self {
        self.gateway_prefix = Some(prefix);
        self
    }

    pub fn with_username(mut self, username: &'a str) -> Self {
        self.username = Some(username);
        self
    }

    pub fn with_doas(mut self, doas: &'a str) -> Self {
        self.doas = Some(doas);
        self
    }

    fn prefix(&self) -> Option<String> {
        let prefix = self.gateway_prefix?.trim_end_matches('/');
        if prefix.is_empty() {
            None
        } else if prefix.starts_with('/') {
            Some(prefix.to_owned())
        } else {
            Some(format!("/{}", prefix))
        }
    }

    /// The gateway prefix (if any) followed by the API root.
    pub fn api_root(&self) -> String {
        match self.prefix() {
            Some(prefix) => format!("{}{}", prefix, API_ROOT),
            None => API_ROOT.to_owned(),
        }
    }

    /**
     * Prefix a filesystem path with the API root.  With a gateway
     * prefix configured, a path that already carries the full root is
     * returned as is.
     */
    pub fn api_path(&self, path: &str) -> String {
        let root = self.api_root();
        if self.prefix().is_some() && is_under(path, &root) {
            return path.to_owned();
        }
        if path.starts_with('/') {
            format!("{}{}", root, path)
        } else {
            format!("{}/{}", root, path)
        }
    }

    /// `op`, `user.name` and `doas` followed by the operation options.
    pub fn query(&self, op: Operation, params: &Options) -> String {
        let mut pairs = vec![("op", op.name())];
        if let Some(username) = self.username {
            pairs.push(("user.name", username));
        }
        if let Some(doas) = self.doas {
            pairs.push(("doas", doas));
        }
        for (key, value) in params.iter() {
            for single in value.values() {
                pairs.push((key, single.as_str()));
            }
        }

        pairs
            .into_iter()
            .map(|(key, value)| format!("{}={}", form_encode(key), form_encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Encoded path and query, ready for the request line.
    pub fn build(&self, path: &str, op: Operation, params: &Options) -> String {
        format!(
            "{}?{}",
            encode_path(&self.api_path(path)),
            self.query(op, params)
        )
    }
}

/// `path` is `root` itself or lies below it.
fn is_under(path: &str, root: &str) -> bool {
    match path.strip_prefix(root) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/**
 * Where a request goes: scheme, host, port and the raw path with
 * query.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub secure: bool,
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl Target {
    /**
     * Parse an absolute redirect location.  The path and query are
     * kept verbatim.  `None` if the location is not an absolute
     * http(s) URI with a host.
     */
    pub fn from_location(location: &str) -> Option<Self> {
        let uri = URI::try_from(location).ok()?;
        Self::from_uri(&uri)
    }

    /**
     * Parse an endpoint such as `http://jmx-host:50070` or
     * `jmx-host:50070`; the scheme defaults to http and the port to
     * `default_port`.
     */
    pub fn from_endpoint(endpoint: &str, default_port: u16) -> Option<Self> {
        let with_scheme;
        let endpoint = if endpoint.contains("://") {
            endpoint
        } else {
            with_scheme = format!("http://{}", endpoint);
            &with_scheme
        };
        let uri = URI::try_from(endpoint).ok()?;
        let mut target = Self::from_uri(&uri)?;
        if uri.port().is_none() {
            target.port = default_port;
        }
        Some(target)
    }

    fn from_uri(uri: &URI<'_>) -> Option<Self> {
        let secure = match uri.scheme().as_str() {
            "http" => false,
            "https" => true,
            _ => return None,
        };
        let host = uri.host()?.to_string();
        if host.is_empty() {
            return None;
        }
        let port = uri.port().unwrap_or(if secure { 443 } else { 80 });
        let mut path = uri.path().to_string();
        if path.is_empty() {
            path.push('/');
        }
        if let Some(query) = uri.query() {
            path.push('?');
            path.push_str(query.as_str());
        }
        Some(Self {
            secure,
            host,
            port,
            path,
        })
    }
}

/// Join a directory and a name with exactly one '/'.
pub fn join(dir: &str, name: &str) -> String {
    let name = name.trim_start_matches('/');
    if dir.is_empty() {
        name.to_owned()
    } else if dir.ends_with('/') {
        format!("{}{}", dir, name)
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Last component of a path, ignoring trailing slashes.
pub fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(pos) => &trimmed[pos + 1..],
        None => trimmed,
    }
}
