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
use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FsPermission {
    pub perm: u16,
}

impl FsPermission {
    pub fn from_octal(octal: &str) -> Option<Self> {
        u16::from_str_radix(octal, 8).ok().map(|perm| Self { perm })
    }

    pub fn to_octal(self) -> String {
        format!("{:o}", self.perm)
    }
}

fn permission_from_octal<'de, D: Deserializer<'de>>(de: D) -> Result<FsPermission, D::Error> {
    let octal = String::deserialize(de)?;
    FsPermission::from_octal(&octal)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid permission {:?}", octal)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileType {
    File,
    Directory,
    Symlink,
}

impl Default for FileType {
    fn default() -> Self {
        FileType::File
    }
}

/// WebHDFS `FileStatus` object.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileStatus {
    pub path_suffix: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub length: u64,
    pub owner: String,
    pub group: String,
    #[serde(deserialize_with = "permission_from_octal")]
    pub permission: FsPermission,
    pub access_time: u64,
    pub modification_time: u64,
    pub block_size: u64,
    pub replication: u32,
    pub file_id: Option<u64>,
    pub children_num: Option<i32>,
    pub symlink: Option<String>,
    pub storage_policy: Option<u8>,
}

impl FileStatus {
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }

    pub fn is_symlink(&self) -> bool {
        self.file_type == FileType::Symlink
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentSummary {
    pub directory_count: u64,
    pub file_count: u64,
    pub length: u64,
    // -1 when not set.
    pub quota: i64,
    pub space_consumed: u64,
    pub space_quota: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileChecksum {
    pub algorithm: String,
    pub bytes: String,
    pub length: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FileStatusWrapper {
    #[serde(rename = "FileStatus")]
    pub file_status: FileStatus,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FileStatusesWrapper {
    #[serde(rename = "FileStatuses")]
    pub file_statuses: FileStatuses,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FileStatuses {
    #[serde(rename = "FileStatus", default)]
    pub file_status: Vec<FileStatus>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentSummaryWrapper {
    #[serde(rename = "ContentSummary")]
    pub content_summary: ContentSummary,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FileChecksumWrapper {
    #[serde(rename = "FileChecksum")]
    pub file_checksum: FileChecksum,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PathWrapper {
    #[serde(rename = "Path")]
    pub path: String,
}
