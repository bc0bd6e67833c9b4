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
 * WebHDFS operations and their options.
 */
use std::fmt;
use std::iter::FromIterator;

use http::Method;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Append,
    Open,
    Mkdirs,
    Rename,
    Delete,
    GetFileStatus,
    ListStatus,
    GetContentSummary,
    GetFileChecksum,
    GetHomeDirectory,
    SetPermission,
    SetOwner,
    SetReplication,
    SetTimes,
}

impl Operation {
    pub const ALL: [Operation; 15] = [
        Operation::Create,
        Operation::Append,
        Operation::Open,
        Operation::Mkdirs,
        Operation::Rename,
        Operation::Delete,
        Operation::GetFileStatus,
        Operation::ListStatus,
        Operation::GetContentSummary,
        Operation::GetFileChecksum,
        Operation::GetHomeDirectory,
        Operation::SetPermission,
        Operation::SetOwner,
        Operation::SetReplication,
        Operation::SetTimes,
    ];

    /// Value of the `op` query parameter.
    pub fn name(self) -> &'static str {
        match self {
            Operation::Create => "CREATE",
            Operation::Append => "APPEND",
            Operation::Open => "OPEN",
            Operation::Mkdirs => "MKDIRS",
            Operation::Rename => "RENAME",
            Operation::Delete => "DELETE",
            Operation::GetFileStatus => "GETFILESTATUS",
            Operation::ListStatus => "LISTSTATUS",
            Operation::GetContentSummary => "GETCONTENTSUMMARY",
            Operation::GetFileChecksum => "GETFILECHECKSUM",
            Operation::GetHomeDirectory => "GETHOMEDIRECTORY",
            Operation::SetPermission => "SETPERMISSION",
            Operation::SetOwner => "SETOWNER",
            Operation::SetReplication => "SETREPLICATION",
            Operation::SetTimes => "SETTIMES",
        }
    }

    pub fn method(self) -> Method {
        match self {
            Operation::Create
            | Operation::Mkdirs
            | Operation::Rename
            | Operation::SetPermission
            | Operation::SetOwner
            | Operation::SetReplication
            | Operation::SetTimes => Method::PUT,
            Operation::Append => Method::POST,
            Operation::Delete => Method::DELETE,
            Operation::Open
            | Operation::GetFileStatus
            | Operation::ListStatus
            | Operation::GetContentSummary
            | Operation::GetFileChecksum
            | Operation::GetHomeDirectory => Method::GET,
        }
    }

    pub fn permitted_options(self) -> &'static [&'static str] {
        match self {
            Operation::Create => &[
                "overwrite",
                "blocksize",
                "replication",
                "permission",
                "buffersize",
            ],
            Operation::Append => &["buffersize"],
            Operation::Open => &["offset", "length", "buffersize"],
            Operation::Mkdirs => &["permission"],
            Operation::Rename => &["destination"],
            Operation::Delete => &["recursive"],
            Operation::GetFileStatus
            | Operation::ListStatus
            | Operation::GetContentSummary
            | Operation::GetFileChecksum
            | Operation::GetHomeDirectory => &[],
            Operation::SetPermission => &["permission"],
            Operation::SetOwner => &["owner", "group"],
            Operation::SetReplication => &["replication"],
            Operation::SetTimes => &["modificationtime", "accesstime"],
        }
    }

    /// At least one of these options has to be present.
    pub fn required_one_of(self) -> Option<&'static [&'static str]> {
        match self {
            Operation::SetOwner => Some(&["owner", "group"]),
            Operation::SetTimes => Some(&["modificationtime", "accesstime"]),
            _ => None,
        }
    }

    /// Data-carrying operations: the NameNode answers with a redirect to
    /// a DataNode.
    pub fn is_redirected(self) -> bool {
        matches!(
            self,
            Operation::Create | Operation::Append | Operation::Open | Operation::GetFileChecksum
        )
    }

    /// The operation sends the file content in the request body.
    pub fn carries_payload(self) -> bool {
        matches!(self, Operation::Create | Operation::Append)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Single(String),
    /// Repeats the key in the query string.
    List(Vec<String>),
}

impl OptionValue {
    pub fn values(&self) -> &[String] {
        match self {
            OptionValue::Single(value) => std::slice::from_ref(value),
            OptionValue::List(values) => values,
        }
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Single(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Single(value.to_owned())
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Single(value.to_string())
    }
}

macro_rules! option_value_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for OptionValue {
                fn from(value: $t) -> Self {
                    OptionValue::Single(value.to_string())
                }
            }
        )*
    };
}

option_value_from_int!(u8, u16, u32, u64, i32, i64, usize);

impl From<Vec<String>> for OptionValue {
    fn from(values: Vec<String>) -> Self {
        OptionValue::List(values)
    }
}

impl From<Vec<&str>> for OptionValue {
    fn from(values: Vec<&str>) -> Self {
        OptionValue::List(values.into_iter().map(str::to_owned).collect())
    }
}

/**
 * Operation parameters.  Keys are lowercase option names; the
 * insertion order is kept and becomes the query order.
 */
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    entries: Vec<(String, OptionValue)>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Set the option, replacing a previous value of the same key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Check the keys against the operation's option table.  Runs
    /// before anything is sent.
    pub fn validate(&self, op: Operation) -> Result<(), ValidationError> {
        if let Some((key, _)) = self
            .entries
            .iter()
            .find(|(key, _)| key.chars().any(char::is_uppercase))
        {
            return Err(ValidationError::NonCanonicalKey(key.clone()));
        }

        let permitted = op.permitted_options();
        let unknown: Vec<&str> = self
            .entries
            .iter()
            .map(|(key, _)| key.as_str())
            .filter(|key| !permitted.contains(key))
            .collect();
        if !unknown.is_empty() {
            return Err(ValidationError::UnknownOption {
                op: op.name(),
                keys: unknown.join(" "),
            });
        }

        if let Some(keys) = op.required_one_of() {
            if !keys.iter().any(|key| self.contains(key)) {
                return Err(ValidationError::MissingOneOf { op: op.name(), keys });
            }
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<OptionValue>> FromIterator<(K, V)> for Options {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut options = Options::new();
        for (key, value) in iter {
            options.set(key, value);
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirected_operations() {
        let redirected: Vec<_> = Operation::ALL
            .iter()
            .copied()
            .filter(|op| op.is_redirected())
            .collect();
        assert_eq!(
            redirected,
            vec![
                Operation::Create,
                Operation::Append,
                Operation::Open,
                Operation::GetFileChecksum
            ]
        );
    }

    #[test]
    fn test_methods() {
        assert_eq!(Operation::Create.method(), Method::PUT);
        assert_eq!(Operation::Append.method(), Method::POST);
        assert_eq!(Operation::Delete.method(), Method::DELETE);
        assert_eq!(Operation::ListStatus.method(), Method::GET);
        assert_eq!(Operation::SetTimes.method(), Method::PUT);
    }

    #[test]
    fn test_set_replaces() {
        let mut options = Options::new().with("overwrite", false);
        options.set("overwrite", true);
        assert_eq!(options.len(), 1);
        assert_eq!(
            options.get("overwrite"),
            Some(&OptionValue::Single("true".into()))
        );
    }

    #[test]
    fn test_validate_permitted() {
        let options = Options::new()
            .with("overwrite", true)
            .with("replication", 3u16)
            .with("permission", "644");
        assert_eq!(options.validate(Operation::Create), Ok(()));
        assert_eq!(Options::new().validate(Operation::GetFileStatus), Ok(()));
    }

    #[test]
    fn test_validate_unknown() {
        let options = Options::new().with("recursive", true).with("bogus", 1u8);
        assert_eq!(
            options.validate(Operation::Mkdirs),
            Err(ValidationError::UnknownOption {
                op: "MKDIRS",
                keys: "recursive bogus".into()
            })
        );
    }

    #[test]
    fn test_validate_every_operation_rejects_foreign_key() {
        for op in Operation::ALL.iter().copied() {
            let options = Options::new().with("nosuchoption", "x");
            assert!(
                matches!(
                    options.validate(op),
                    Err(ValidationError::UnknownOption { .. })
                ),
                "{} accepted an unknown option",
                op
            );
        }
    }

    #[test]
    fn test_validate_non_canonical() {
        let options = Options::new().with("Recursive", true);
        assert_eq!(
            options.validate(Operation::Delete),
            Err(ValidationError::NonCanonicalKey("Recursive".into()))
        );
    }

    #[test]
    fn test_validate_required_one_of() {
        assert_eq!(
            Options::new().validate(Operation::SetOwner),
            Err(ValidationError::MissingOneOf {
                op: "SETOWNER",
                keys: &["owner", "group"]
            })
        );
        assert_eq!(
            Options::new()
                .with("group", "hadoop")
                .validate(Operation::SetOwner),
            Ok(())
        );
        assert!(Options::new().validate(Operation::SetTimes).is_err());
        assert_eq!(
            Options::new()
                .with("accesstime", 0i64)
                .validate(Operation::SetTimes),
            Ok(())
        );
    }

    #[test]
    fn test_option_list_values() {
        let value = OptionValue::from(vec!["a", "b"]);
        assert_eq!(value.values(), &["a".to_owned(), "b".to_owned()]);
        assert_eq!(OptionValue::from(42u64).values(), &["42".to_owned()]);
    }
}
