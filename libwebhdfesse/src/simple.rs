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
 * Small helpers composed of several facade calls.  Each underlying
 * call is retried on its own.
 */
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;

use crate::error::{Failure, WebHdfsError};
use crate::fs::WebHdfs;
use crate::op::Options;
use crate::path::{basename, join};
use crate::transport::Transport;

type Result<V> = std::result::Result<V, WebHdfsError>;

fn not_found(path: &str, source: WebHdfsError) -> WebHdfsError {
    let status = source.status();
    let remote = source.remote_exception().cloned();
    WebHdfsError::NotFound(
        Failure::new(status, format!("File {} not found", path)).with_remote(remote),
    )
}

/// Append a line to `path`, creating the file if it does not exist.
pub fn append_or_create<T: Transport>(client: &WebHdfs<T>, path: &str, data: &str) -> Result<bool> {
    let line = format!("{}\n", data);
    match client.stat(path) {
        Ok(_) => client.append(path, line, &Options::new()),
        Err(e) if e.is_not_found() => client.create(path, line, &Options::new()),
        Err(e) => Err(e),
    }
}

/// Recursive delete that fails with `NotFound` for a missing path.
pub fn delete_recursive_strict<T: Transport>(client: &WebHdfs<T>, path: &str) -> Result<bool> {
    client.stat(path).map_err(|e| {
        if e.is_not_found() {
            not_found(path, e)
        } else {
            e
        }
    })?;
    client.delete(path, &Options::new().with("recursive", true))
}

/// Recursive delete; `None` if there was nothing to delete.
pub fn delete_recursive<T: Transport>(client: &WebHdfs<T>, path: &str) -> Result<Option<bool>> {
    match delete_recursive_strict(client, path) {
        Ok(deleted) => Ok(Some(deleted)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn list_filenames<T: Transport>(client: &WebHdfs<T>, path: &str) -> Result<Vec<String>> {
    Ok(client
        .list(path)?
        .into_iter()
        .map(|status| status.path_suffix)
        .collect())
}

/// Rename every path into `target_dir`, keeping its base name.  Stops
/// at the first failure.
pub fn move_paths<T: Transport, S: AsRef<str>>(
    client: &WebHdfs<T>,
    paths: &[S],
    target_dir: &str,
) -> Result<Vec<bool>> {
    paths
        .iter()
        .map(|path| {
            let path = path.as_ref();
            client.rename(path, &join(target_dir, basename(path)), &Options::new())
        })
        .collect()
}

/**
 * Read a whole file.  A 404 whose message does not mention "not found"
 * means the path is not a readable file (e.g. a directory) and is
 * reported as `InvalidOp`.
 */
pub fn safe_read<T: Transport>(client: &WebHdfs<T>, path: &str) -> Result<Bytes> {
    client.read(path, &Options::new()).map_err(|e| match e {
        WebHdfsError::NotFound(failure) => {
            let message = failure.remote_message().to_owned();
            let failure = Failure {
                message,
                ..failure
            };
            if failure.message.contains("not found") {
                WebHdfsError::NotFound(failure)
            } else {
                WebHdfsError::InvalidOp(failure)
            }
        }
        e => e,
    })
}

/// Last line of a file, or an empty string.
pub fn tip_of_tail<T: Transport>(client: &WebHdfs<T>, path: &str) -> Result<String> {
    let data = safe_read(client, path)?;
    Ok(String::from_utf8_lossy(&data)
        .lines()
        .last()
        .unwrap_or("")
        .to_owned())
}

/// Modification time, with second precision.
pub fn mtime<T: Transport>(client: &WebHdfs<T>, path: &str) -> Result<SystemTime> {
    let status = client.stat(path).map_err(|e| {
        if e.is_not_found() {
            not_found(path, e)
        } else {
            e
        }
    })?;
    Ok(UNIX_EPOCH + Duration::from_secs(status.modification_time / 1000))
}
