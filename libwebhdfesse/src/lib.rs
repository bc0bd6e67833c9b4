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
 * Client for the WebHDFS REST protocol of Hadoop NameNodes and HttpFS
 * gateways.
 */
pub mod classify;
pub mod config;
pub mod discovery;
pub mod error;
pub mod fs;
pub mod op;
pub mod path;
pub mod redirect;
pub mod retry;
pub mod simple;
pub mod status;
pub mod transport;
pub mod util;

pub use crate::config::ClientConfig;
pub use crate::error::{ErrorKind, Failure, RemoteException, ValidationError, WebHdfsError};
pub use crate::fs::WebHdfs;
pub use crate::op::{Operation, OptionValue, Options};
pub use crate::status::{ContentSummary, FileChecksum, FileStatus, FileType, FsPermission};
pub use crate::transport::{HttpTransport, Payload, Request, Response, Transport, TransportError};
