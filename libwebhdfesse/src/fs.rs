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
use std::io::Read;

use bytes::Bytes;
use http::StatusCode;
use parking_lot::RwLock;
use tracing::{error, info, instrument, warn};

use crate::classify::Success;
use crate::config::{ClientConfig, RetryPolicy};
use crate::discovery;
use crate::error::WebHdfsError;
use crate::op::{Operation, Options};
use crate::redirect::{dispatch, PayloadSlot};
use crate::retry::{with_retry, Failover};
use crate::status::{
    ContentSummary, ContentSummaryWrapper, FileChecksum, FileChecksumWrapper, FileStatus,
    FileStatusWrapper, FileStatusesWrapper, PathWrapper,
};
use crate::transport::{HttpTransport, Payload, Transport, TransportError};

type Result<V> = std::result::Result<V, WebHdfsError>;

/**
 * WebHDFS client.  Every operation validates its options, then runs
 * the request protocol under the retry policy.  The client takes
 * `&self` everywhere; failover changes the host under a lock, and each
 * attempt works on a snapshot of the configuration.
 */
pub struct WebHdfs<T: Transport = HttpTransport> {
    transport: T,
    config: RwLock<ClientConfig>,
}

impl WebHdfs<HttpTransport> {
    pub fn new(config: ClientConfig) -> std::result::Result<Self, TransportError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> WebHdfs<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            transport,
            config: RwLock::new(config),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> ClientConfig {
        self.config.read().clone()
    }

    pub fn host(&self) -> String {
        self.config.read().host.clone()
    }

    pub fn set_host(&self, host: impl Into<String>) {
        self.config.write().host = host.into();
    }

    pub fn set_username(&self, username: Option<String>) {
        self.config.write().username = username;
    }

    pub fn set_doas(&self, doas: Option<String>) {
        self.config.write().doas = doas;
    }

    pub fn set_retry_policy(&self, policy: RetryPolicy) {
        self.config.write().retry = policy;
    }

    pub fn discover_active_namenode(&self) -> Result<String> {
        let config = self.config();
        discovery::discover_active_namenode(&self.transport, &config)
    }

    /// Switch to the active NameNode.  On failure the host is kept.
    pub fn refresh_from_discovery(&self) {
        match self.discover_active_namenode() {
            Ok(host) => {
                info!(%host, "switching namenode");
                self.set_host(host);
            }
            Err(e) => {
                warn!("Failed to detect namenode with error: {}", e);
                warn!("Remaining on {}", self.host());
            }
        }
    }

    /// Stat the root directory once, without retries.
    pub fn ensure_operational(&self) -> Result<()> {
        let config = self.config();
        let mut slot = PayloadSlot::default();
        dispatch(
            &self.transport,
            &config,
            Operation::GetFileStatus,
            "/",
            &Options::new(),
            &mut slot,
        )
        .map(|_| ())
        .map_err(|e| {
            error!("Failed to access HDFS with error {}", e);
            e
        })
    }

    pub fn is_operational(&self) -> bool {
        self.ensure_operational().is_ok()
    }

    fn attempt(
        &self,
        op: Operation,
        path: &str,
        params: &Options,
        payload: &mut PayloadSlot,
    ) -> Result<Success> {
        let config = self.config();
        dispatch(&self.transport, &config, op, path, params, payload)
    }

    #[instrument(skip(self, params, payload))]
    fn execute(
        &self,
        op: Operation,
        path: &str,
        params: &Options,
        payload: Payload,
    ) -> Result<Success> {
        params.validate(op)?;
        let policy = self.config.read().retry.clone();
        let mut slot = PayloadSlot::new(payload);
        with_retry(&policy, self, || self.attempt(op, path, params, &mut slot))
    }

    /// Create a file; `true` if the DataNode answered 201.
    pub fn create(&self, path: &str, data: impl Into<Payload>, options: &Options) -> Result<bool> {
        let res = self.execute(Operation::Create, path, options, data.into())?;
        Ok(res.status == StatusCode::CREATED)
    }

    /// Like [`WebHdfs::create`], streaming `len` bytes from `reader`.
    /// A streamed body cannot be resent once the DataNode has seen it.
    pub fn create_from_reader<R: Read + Send + 'static>(
        &self,
        path: &str,
        reader: R,
        len: u64,
        options: &Options,
    ) -> Result<bool> {
        let payload = Payload::Reader {
            reader: Box::new(reader),
            len,
        };
        let res = self.execute(Operation::Create, path, options, payload)?;
        Ok(res.status == StatusCode::CREATED)
    }

    pub fn append(&self, path: &str, data: impl Into<Payload>, options: &Options) -> Result<bool> {
        let res = self.execute(Operation::Append, path, options, data.into())?;
        Ok(res.status == StatusCode::OK)
    }

    pub fn read(&self, path: &str, options: &Options) -> Result<Bytes> {
        let res = self.execute(Operation::Open, path, options, Payload::Empty)?;
        Ok(res.raw)
    }

    pub fn mkdir(&self, path: &str, options: &Options) -> Result<bool> {
        let res = self.execute(Operation::Mkdirs, path, options, Payload::Empty)?;
        Ok(res.boolean())
    }

    /// `false` (not an error) if the server did not delete anything.
    pub fn delete(&self, path: &str, options: &Options) -> Result<bool> {
        let res = self.execute(Operation::Delete, path, options, Payload::Empty)?;
        Ok(res.boolean())
    }

    pub fn rename(&self, path: &str, destination: &str, options: &Options) -> Result<bool> {
        let destination = if destination.starts_with('/') {
            destination.to_owned()
        } else {
            format!("/{}", destination)
        };
        // Validate caller options before the destination is merged in.
        options.validate(Operation::Rename)?;
        let mut options = options.clone();
        options.set("destination", destination);
        let res = self.execute(Operation::Rename, path, &options, Payload::Empty)?;
        Ok(res.boolean())
    }

    pub fn stat(&self, path: &str) -> Result<FileStatus> {
        let res = self.execute(Operation::GetFileStatus, path, &Options::new(), Payload::Empty)?;
        Ok(res.decode::<FileStatusWrapper>()?.file_status)
    }

    /// Directory entries in server order.
    pub fn list(&self, path: &str) -> Result<Vec<FileStatus>> {
        let res = self.execute(Operation::ListStatus, path, &Options::new(), Payload::Empty)?;
        Ok(res.decode::<FileStatusesWrapper>()?.file_statuses.file_status)
    }

    pub fn content_summary(&self, path: &str) -> Result<ContentSummary> {
        let res = self.execute(
            Operation::GetContentSummary,
            path,
            &Options::new(),
            Payload::Empty,
        )?;
        Ok(res.decode::<ContentSummaryWrapper>()?.content_summary)
    }

    pub fn checksum(&self, path: &str) -> Result<FileChecksum> {
        let res = self.execute(
            Operation::GetFileChecksum,
            path,
            &Options::new(),
            Payload::Empty,
        )?;
        Ok(res.decode::<FileChecksumWrapper>()?.file_checksum)
    }

    pub fn home_directory(&self) -> Result<String> {
        let res = self.execute(
            Operation::GetHomeDirectory,
            "/",
            &Options::new(),
            Payload::Empty,
        )?;
        Ok(res.decode::<PathWrapper>()?.path)
    }

    /// `mode` is sent in octal, e.g. `0o755` as `755`.
    pub fn chmod(&self, path: &str, mode: u16) -> Result<bool> {
        let options = Options::new().with("permission", format!("{:o}", mode));
        let res = self.execute(Operation::SetPermission, path, &options, Payload::Empty)?;
        Ok(res.status == StatusCode::OK)
    }

    /// Needs `owner`, `group` or both.
    pub fn chown(&self, path: &str, options: &Options) -> Result<bool> {
        let res = self.execute(Operation::SetOwner, path, options, Payload::Empty)?;
        Ok(res.status == StatusCode::OK)
    }

    pub fn set_replication(&self, path: &str, replication: u16) -> Result<bool> {
        let options = Options::new().with("replication", replication);
        let res = self.execute(Operation::SetReplication, path, &options, Payload::Empty)?;
        Ok(res.boolean())
    }

    /// Needs `modificationtime`, `accesstime` or both, in milliseconds.
    pub fn set_times(&self, path: &str, options: &Options) -> Result<bool> {
        let res = self.execute(Operation::SetTimes, path, options, Payload::Empty)?;
        Ok(res.status == StatusCode::OK)
    }
}

impl<T: Transport> Failover for WebHdfs<T> {
    fn rediscover(&self) {
        self.refresh_from_discovery()
    }

    fn health_check(&self) -> Result<()> {
        self.ensure_operational()
    }
}
