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
 * Client configuration, either built in code or loaded from
 * `hdfs-site.xml`.
 */
use std::collections::HashMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use thiserror::Error;
use xml::reader::{EventReader, XmlEvent};

pub const DEFAULT_PORT: u16 = 50070;

/// Remote exceptions that are worth a failover and retry.
pub const DEFAULT_KNOWN_EXCEPTIONS: &[&str] = &["LeaseExpiredException", "StandbyException"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub address: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyMode {
    None,
    Peer,
}

impl Default for VerifyMode {
    fn default() -> Self {
        VerifyMode::Peer
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsConfig {
    pub enabled: bool,
    pub ca_file: Option<PathBuf>,
    pub client_cert: Option<PathBuf>,
    pub client_key: Option<PathBuf>,
    pub verify: VerifyMode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KerberosConfig {
    pub enabled: bool,
    pub keytab: Option<PathBuf>,
}

/**
 * Retry policy.  `max_attempts` is the number of retries allowed for
 * one logical call, so a call makes at most `max_attempts + 1`
 * attempts.  Each rule tier has its own wait interval.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub enabled: bool,
    pub max_attempts: u32,
    pub transient_interval: Duration,
    pub block_length_interval: Duration,
    pub server_error_interval: Duration,
    pub known_exceptions: Vec<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 1,
            transient_interval: Duration::from_secs(10),
            block_length_interval: Duration::from_secs(5),
            server_error_interval: Duration::from_secs(15),
            known_exceptions: DEFAULT_KNOWN_EXCEPTIONS
                .iter()
                .map(|name| (*name).to_owned())
                .collect(),
        }
    }
}

impl RetryPolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Use the same wait interval for every rule tier.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.transient_interval = interval;
        self.block_length_interval = interval;
        self.server_error_interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_known_exceptions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_exceptions = names.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timeouts {
    /// Connection setup.
    pub open: Option<Duration>,
    /// Whole request, for requests without a body.  Uploads are not
    /// limited.
    pub read: Option<Duration>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicAuth {
    pub user: String,
    pub password: Option<String>,
}

/**
 * Everything a client needs to talk to a NameNode.  `host` is changed
 * at runtime by failover; the rest changes only through the client's
 * setters.
 */
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub doas: Option<String>,
    pub proxy: Option<ProxyConfig>,
    pub tls: TlsConfig,
    pub kerberos: KerberosConfig,
    pub headers: HeaderMap,
    pub httpfs_mode: bool,
    pub retry: RetryPolicy,
    pub timeouts: Timeouts,
    /// JMX endpoint that always reaches the active NameNode, e.g. a load
    /// balancer.  Its `NameNodeStatus` bean is trusted without a state check.
    pub jmx_host: Option<String>,
    /// HA NameNode HTTP addresses.  Without `jmx_host`, discovery asks
    /// each of them for its HA state.
    pub namenodes: Vec<String>,
    pub gateway_prefix: Option<String>,
    pub basic_auth: Option<BasicAuth>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("localhost", DEFAULT_PORT)
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            doas: None,
            proxy: None,
            tls: TlsConfig::default(),
            kerberos: KerberosConfig::default(),
            headers: HeaderMap::new(),
            httpfs_mode: false,
            retry: RetryPolicy::default(),
            timeouts: Timeouts::default(),
            jmx_host: None,
            namenodes: Vec::new(),
            gateway_prefix: None,
            basic_auth: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_doas(mut self, doas: impl Into<String>) -> Self {
        self.doas = Some(doas.into());
        self
    }

    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_kerberos(mut self, kerberos: KerberosConfig) -> Self {
        self.kerberos = kerberos;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_httpfs_mode(mut self, httpfs_mode: bool) -> Self {
        self.httpfs_mode = httpfs_mode;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeouts(mut self, open: Option<Duration>, read: Option<Duration>) -> Self {
        self.timeouts = Timeouts { open, read };
        self
    }

    pub fn with_jmx_host(mut self, jmx_host: impl Into<String>) -> Self {
        self.jmx_host = Some(jmx_host.into());
        self
    }

    pub fn with_namenodes<I, S>(mut self, namenodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.namenodes = namenodes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_gateway_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.gateway_prefix = Some(prefix.into());
        self
    }

    pub fn with_basic_auth(mut self, user: impl Into<String>, password: Option<String>) -> Self {
        self.basic_auth = Some(BasicAuth {
            user: user.into(),
            password,
        });
        self
    }

    /**
     * Build a config for a nameservice described in `hdfs-site.xml`.
     * The first namenode becomes the host.  With several HA namenodes
     * all of them are kept as discovery candidates.  `nameservice`
     * defaults to the first one listed in `dfs.nameservices`.
     */
    pub fn from_hadoop_config(
        config_path: &Path,
        nameservice: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let dict = load_config_as_dict(config_path)?;
        Self::from_dict(&dict, nameservice)
    }

    pub fn from_dict(
        conf: &HashMap<String, String>,
        nameservice: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let secure = conf.get("dfs.http.policy").map(String::as_str) == Some("HTTPS_ONLY");
        let services = parse_config(conf, secure);
        let service = match nameservice {
            Some(name) => services.into_iter().find(|serv| serv.name == name),
            None => services.into_iter().find(|serv| !serv.http_nodes.is_empty()),
        };

        let nodes = match service {
            Some(service) => service.http_nodes,
            None => {
                if let Some(name) = nameservice {
                    return Err(ConfigError::Missing(format!("nameservice {}", name)));
                }
                let address_key = http_address_key(secure);
                let address = conf
                    .get(address_key)
                    .ok_or_else(|| ConfigError::Missing(address_key.to_owned()))?;
                vec![NamenodeConfig {
                    name: "default".to_owned(),
                    http_address: address.clone(),
                }]
            }
        };

        let first = nodes
            .first()
            .ok_or_else(|| ConfigError::Missing("namenode http address".to_owned()))?;
        let (host, port) = split_host_port(&first.http_address)?;

        let mut config = Self::new(host, port);
        config.tls.enabled = secure;
        if nodes.len() > 1 {
            let scheme = if secure { "https" } else { "http" };
            config.namenodes = nodes
                .into_iter()
                .map(|node| format!("{}://{}", scheme, node.http_address))
                .collect();
        }
        Ok(config)
    }
}

fn http_address_key(secure: bool) -> &'static str {
    if secure {
        "dfs.namenode.https-address"
    } else {
        "dfs.namenode.http-address"
    }
}

fn split_host_port(address: &str) -> Result<(String, u16), ConfigError> {
    match address.rsplit_once(':') {
        Some((host, port)) => port
            .parse()
            .map(|port| (host.to_owned(), port))
            .map_err(|_| ConfigError::Invalid(address.to_owned())),
        None => Ok((address.to_owned(), DEFAULT_PORT)),
    }
}

/// Try to get path to config from the environment.  It is the
/// "hdfs-site.xml" either from HADOOP_CONF_DIR variable or
/// "/etc/hadoop/conf" directory.
pub fn get_config_path() -> PathBuf {
    let path = match std::env::var_os("HADOOP_CONF_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            tracing::debug!("HADOOP_CONF_DIR is not set, using /etc/hadoop/conf");
            PathBuf::from("/etc/hadoop/conf")
        }
    };

    path.join("hdfs-site.xml")
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to open config {:?}: {:?}", .1, .0)]
    Io(io::Error, PathBuf),
    #[error("failed to read config {:?}: {:?}", .1, .0)]
    Xml(xml::reader::Error, PathBuf),
    #[error("missing config value: {0}")]
    Missing(String),
    #[error("invalid address: {0:?}")]
    Invalid(String),
}

/// Load the XML Hadoop/HDFS config and return properties' name/values as dict.
/// It performs only minimal validation.
pub fn load_config_as_dict(config_path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let buf = io::BufReader::new(
        std::fs::File::open(config_path).map_err(|e| ConfigError::Io(e, config_path.to_owned()))?,
    );

    read_config_as_dict(buf, config_path)
}

pub fn read_config_as_dict<R: Read>(
    r: R,
    config_path: &Path,
) -> Result<HashMap<String, String>, ConfigError> {
    let parser = EventReader::new(r);

    let mut elt = None;
    let mut key = None;
    let mut val = None;

    let mut res = HashMap::new();

    for e in parser {
        match e.map_err(|e| ConfigError::Xml(e, config_path.to_owned()))? {
            XmlEvent::StartElement { name, .. } => {
                elt = Some(name.local_name);
            }
            XmlEvent::EndElement { name } => {
                if name.local_name == "property" {
                    if let Some((k, v)) = key.take().zip(val.take()) {
                        res.insert(k, v);
                    }
                }
                elt = None;
            }
            XmlEvent::Characters(text) => match elt.as_deref() {
                Some("name") => key = Some(text),
                Some("value") => val = Some(text),
                _ => {}
            },
            _ => {}
        }
    }

    Ok(res)
}

#[derive(Debug, PartialEq, Eq)]
pub struct NamenodeConfig {
    pub name: String,
    // Kept as a string: name resolution may change.
    pub http_address: String,
}

#[derive(Debug, PartialEq, Eq)]
pub struct NameserviceConfig {
    pub name: String,
    pub http_nodes: Vec<NamenodeConfig>,
}

fn parse_namenode(
    conf: &HashMap<String, String>,
    namenode: &str,
    nameservice: &str,
    secure: bool,
) -> Option<NamenodeConfig> {
    let key = format!("{}.{}.{}", http_address_key(secure), nameservice, namenode);

    conf.get(&key).map(|address| NamenodeConfig {
        name: namenode.to_owned(),
        http_address: address.clone(),
    })
}

/// Nameservices with their namenodes' HTTP addresses, in config order.
pub fn parse_config(conf: &HashMap<String, String>, secure: bool) -> Vec<NameserviceConfig> {
    conf.get("dfs.nameservices")
        .map(String::as_str)
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            let namenodes = conf
                .get(&format!("dfs.ha.namenodes.{}", name))
                .map(String::as_str)
                .unwrap_or("");
            NameserviceConfig {
                name: name.to_owned(),
                // Namenodes without an address are ignored.
                http_nodes: namenodes
                    .split(',')
                    .map(str::trim)
                    .flat_map(|namenode| parse_namenode(conf, namenode, name, secure))
                    .collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use io::Cursor;
    use std::error::Error;

    use super::*;

    const HA_SITE: &[u8] = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>
<configuration>
  <property><name>dfs.nameservices</name><value>cluster</value></property>
  <property><name>dfs.ha.namenodes.cluster</name><value>nn1,nn2</value></property>
  <property><name>dfs.namenode.http-address.cluster.nn1</name><value>nn1.example.com:9870</value></property>
  <property><name>dfs.namenode.http-address.cluster.nn2</name><value>nn2.example.com:9870</value></property>
</configuration>";

    #[test]
    fn test_config_read_as_dict() -> Result<(), Box<dyn Error>> {
        let data = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?><configuration><property><name>test</name><value>value0</value></property></configuration>";
        let parsed = read_config_as_dict(Cursor::new(data), Path::new("/test/me"))?;
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.get("test"), Some(&"value0".to_owned()));
        Ok(())
    }

    #[test]
    fn test_config_read_as_dict_malformed() {
        let data = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?><configuration><property><name>test</name><value>value0</value></configuration>";
        let parsed = read_config_as_dict(Cursor::new(data), Path::new("/test/me"));
        match parsed {
            Err(ConfigError::Xml(_, path)) => assert_eq!(path.to_str(), Some("/test/me")),
            _ => panic!("expecting XML error"),
        }
    }

    #[test]
    fn test_parse_ha_nameservice() -> Result<(), Box<dyn Error>> {
        let dict = read_config_as_dict(Cursor::new(HA_SITE), Path::new("hdfs-site.xml"))?;
        let services = parse_config(&dict, false);
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].name, "cluster");
        assert_eq!(
            services[0].http_nodes,
            vec![
                NamenodeConfig {
                    name: "nn1".into(),
                    http_address: "nn1.example.com:9870".into()
                },
                NamenodeConfig {
                    name: "nn2".into(),
                    http_address: "nn2.example.com:9870".into()
                },
            ]
        );

        let config = ClientConfig::from_dict(&dict, None)?;
        assert_eq!(config.host, "nn1.example.com");
        assert_eq!(config.port, 9870);
        assert_eq!(config.jmx_host, None);
        assert_eq!(
            config.namenodes,
            vec![
                "http://nn1.example.com:9870",
                "http://nn2.example.com:9870"
            ]
        );
        assert!(!config.tls.enabled);
        Ok(())
    }

    #[test]
    fn test_unknown_nameservice() -> Result<(), Box<dyn Error>> {
        let dict = read_config_as_dict(Cursor::new(HA_SITE), Path::new("hdfs-site.xml"))?;
        match ClientConfig::from_dict(&dict, Some("other")) {
            Err(ConfigError::Missing(what)) => assert_eq!(what, "nameservice other"),
            other => panic!("unexpected {:?}", other.map(|c| c.host)),
        }
        Ok(())
    }

    #[test]
    fn test_single_namenode_https() -> Result<(), Box<dyn Error>> {
        let mut dict = HashMap::new();
        dict.insert("dfs.http.policy".to_owned(), "HTTPS_ONLY".to_owned());
        dict.insert(
            "dfs.namenode.https-address".to_owned(),
            "secure-nn:9871".to_owned(),
        );
        let config = ClientConfig::from_dict(&dict, None)?;
        assert_eq!(config.host, "secure-nn");
        assert_eq!(config.port, 9871);
        assert!(config.tls.enabled);
        assert_eq!(config.jmx_host, None);
        assert!(config.namenodes.is_empty());
        Ok(())
    }

    #[test]
    fn test_bad_port() {
        let mut dict = HashMap::new();
        dict.insert("dfs.namenode.http-address".to_owned(), "nn:http".to_owned());
        assert!(matches!(
            ClientConfig::from_dict(&dict, None),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_retry_policy_defaults() {
        let policy = RetryPolicy::default();
        assert!(policy.enabled);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.block_length_interval, Duration::from_secs(5));
        assert_eq!(
            policy.known_exceptions,
            vec!["LeaseExpiredException", "StandbyException"]
        );

        let policy = policy.with_interval(Duration::ZERO).with_max_attempts(3);
        assert_eq!(policy.server_error_interval, Duration::ZERO);
        assert_eq!(policy.max_attempts, 3);
    }
}
