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
use chrono::TimeZone;
use libwebhdfesse::{path, FileStatus, FileType};
use number_prefix::NumberPrefix;
use std::borrow::Cow;
use std::cmp::max;
use std::io::Write;

fn format_flag_group(group: u16) -> &'static str {
    match group & 0x7 {
        0 => "---",
        1 => "--x",
        2 => "-w-",
        3 => "-wx",
        4 => "r--",
        5 => "r-x",
        6 => "rw-",
        _ => "rwx",
    }
}

fn format_type(file_type: FileType) -> char {
    match file_type {
        FileType::Directory => 'd',
        FileType::File => '-',
        FileType::Symlink => 'l',
    }
}

fn format_flags(perm: u16) -> String {
    let mut res = String::with_capacity(9);
    for offset in [6u16, 3, 0].iter() {
        res.push_str(format_flag_group(perm >> offset));
    }
    res
}

/// Replace non-printable characters with '?'.
fn quote_name(name: &str) -> Cow<'_, str> {
    if name.chars().any(char::is_control) {
        Cow::Owned(
            name.chars()
                .map(|c| if c.is_control() { '?' } else { c })
                .collect(),
        )
    } else {
        Cow::Borrowed(name)
    }
}

pub(crate) struct Record {
    pub(crate) file_type: FileType,
    pub(crate) perm: u16,
    pub(crate) replication: u32,
    pub(crate) owner: Box<str>,
    pub(crate) group: Box<str>,
    pub(crate) size: u64,
    pub(crate) timestamp: u64,
    pub(crate) name: Box<str>,
}

impl Record {
    pub(crate) fn from_file_status(entry: FileStatus, atime: bool) -> Self {
        Record {
            file_type: entry.file_type,
            perm: entry.permission.perm,
            replication: entry.replication,
            owner: entry.owner.into_boxed_str(),
            group: entry.group.into_boxed_str(),
            size: entry.length,
            timestamp: if atime {
                entry.access_time
            } else {
                entry.modification_time
            },
            name: entry.path_suffix.into_boxed_str(),
        }
    }
}

pub(crate) trait FieldFormatter<W: Write> {
    fn update_len(&mut self, rec: &Record);
    fn print(&self, out: &mut W, rec: &Record) -> std::io::Result<()>;
}

#[derive(Default)]
struct PermFormatter {}

impl<W: Write> FieldFormatter<W> for PermFormatter {
    fn update_len(&mut self, _rec: &Record) {
        // Fixed-size rec
    }

    fn print(&self, out: &mut W, entry: &Record) -> std::io::Result<()> {
        write!(
            out,
            "{}{}",
            format_type(entry.file_type),
            format_flags(entry.perm)
        )
    }
}

struct ReplicationFormatter {
    max_len: usize,
}

impl ReplicationFormatter {
    fn format(entry: &Record) -> Cow<'static, str> {
        if entry.file_type == FileType::Directory {
            Cow::from("-")
        } else {
            Cow::from(format!("{}", entry.replication))
        }
    }
}

impl Default for ReplicationFormatter {
    fn default() -> Self {
        Self { max_len: 3 }
    }
}

impl<W: Write> FieldFormatter<W> for ReplicationFormatter {
    fn update_len(&mut self, entry: &Record) {
        self.max_len = max(self.max_len, Self::format(entry).chars().count());
    }

    fn print(&self, out: &mut W, entry: &Record) -> std::io::Result<()> {
        write!(out, " {0:>1$}", Self::format(entry), self.max_len)
    }
}

#[derive(Default)]
struct SimpleSizeFormatter {}

impl<W: Write> FieldFormatter<W> for SimpleSizeFormatter {
    fn update_len(&mut self, _entry: &Record) {}

    fn print(&self, out: &mut W, entry: &Record) -> std::io::Result<()> {
        write!(out, " {0:>10}", entry.size)
    }
}

struct HumanSizeFormatter {
    max_len: usize,
}

impl HumanSizeFormatter {
    fn format(val: u64) -> String {
        match NumberPrefix::binary(val as f64) {
            NumberPrefix::Standalone(bytes) => format!("{:.0}", bytes),
            NumberPrefix::Prefixed(pref, n) => format!("{:.1} {}", n, &pref.symbol()[0..1]),
        }
    }
}

impl Default for HumanSizeFormatter {
    fn default() -> Self {
        Self { max_len: 10 }
    }
}

impl<W: Write> FieldFormatter<W> for HumanSizeFormatter {
    fn update_len(&mut self, entry: &Record) {
        self.max_len = max(self.max_len, Self::format(entry.size).chars().count());
    }

    fn print(&self, out: &mut W, entry: &Record) -> std::io::Result<()> {
        write!(out, "{0:>1$}", Self::format(entry.size), self.max_len + 1)
    }
}

struct DateFormatter {
    max_len: usize,
    tz_offset: chrono::FixedOffset,
}

impl DateFormatter {
    fn format_datetime(&self, entry: &Record) -> String {
        // Milliseconds are dropped.
        let secs = (entry.timestamp / 1000) as i64;
        match self.tz_offset.timestamp_opt(secs, 0).single() {
            Some(time) => time.format("%Y-%m-%d %H:%M").to_string(),
            None => "????-??-?? ??:??".to_owned(),
        }
    }
}

impl Default for DateFormatter {
    fn default() -> Self {
        Self {
            max_len: 0,
            tz_offset: *chrono::Local::now().offset(),
        }
    }
}

impl<W: Write> FieldFormatter<W> for DateFormatter {
    fn update_len(&mut self, entry: &Record) {
        self.max_len = max(self.max_len, self.format_datetime(entry).chars().count());
    }

    fn print(&self, out: &mut W, entry: &Record) -> std::io::Result<()> {
        write!(
            out,
            "{0:>1$}",
            self.format_datetime(entry),
            self.max_len + 1
        )
    }
}

#[derive(Default)]
struct OwnerFormatter {
    max_len: usize,
}

impl<W: Write> FieldFormatter<W> for OwnerFormatter {
    fn update_len(&mut self, entry: &Record) {
        self.max_len = max(self.max_len, entry.owner.chars().count());
    }

    fn print(&self, out: &mut W, entry: &Record) -> std::io::Result<()> {
        write!(out, " {0:1$}", entry.owner, self.max_len)
    }
}

#[derive(Default)]
struct GroupFormatter {
    max_len: usize,
}

impl<W: Write> FieldFormatter<W> for GroupFormatter {
    fn update_len(&mut self, entry: &Record) {
        self.max_len = max(self.max_len, entry.group.chars().count());
    }

    fn print(&self, out: &mut W, entry: &Record) -> std::io::Result<()> {
        write!(out, " {0:1$}", entry.group, self.max_len)
    }
}

struct NameFormatter {
    base: String,
    quote: bool,
    leading_space: bool,
}

impl NameFormatter {
    fn new(base: &str, quote: bool, leading_space: bool) -> Self {
        Self {
            base: base.to_owned(),
            quote,
            leading_space,
        }
    }

    fn full_name(&self, entry: &Record) -> String {
        // A stat'ed file has an empty suffix.
        let joined = if entry.name.is_empty() {
            self.base.clone()
        } else {
            path::join(&self.base, &entry.name)
        };
        if self.quote {
            quote_name(&joined).into_owned()
        } else {
            joined
        }
    }
}

impl<W: Write> FieldFormatter<W> for NameFormatter {
    fn update_len(&mut self, _entry: &Record) {}

    fn print(&self, out: &mut W, entry: &Record) -> std::io::Result<()> {
        if self.leading_space {
            write!(out, " {}", self.full_name(entry))
        } else {
            write!(out, "{}", self.full_name(entry))
        }
    }
}

pub(crate) struct LineFormat<W: Write> {
    formatters: Vec<Box<dyn FieldFormatter<W>>>,
}

impl<W: Write> LineFormat<W> {
    /// Path-only output
    pub(crate) fn compact(base: &str, quote: bool) -> Self {
        Self {
            formatters: vec![Box::new(NameFormatter::new(base, quote, false))],
        }
    }

    /// Full output; human is the flag that enables human-readable
    /// file size output.
    pub(crate) fn full(base: &str, human: bool, quote: bool) -> Self {
        Self {
            formatters: vec![
                Box::new(PermFormatter::default()),
                Box::new(ReplicationFormatter::default()),
                Box::new(OwnerFormatter::default()),
                Box::new(GroupFormatter::default()),
                if human {
                    Box::new(HumanSizeFormatter::default())
                } else {
                    Box::new(SimpleSizeFormatter::default())
                },
                Box::new(DateFormatter::default()),
                Box::new(NameFormatter::new(base, quote, true)),
            ],
        }
    }

    pub(crate) fn update_len(&mut self, rec: &Record) {
        for formatter in self.formatters.iter_mut() {
            formatter.update_len(rec);
        }
    }

    pub(crate) fn print(&self, out: &mut W, rec: &Record) -> std::io::Result<()> {
        for formatter in self.formatters.iter() {
            formatter.print(out, rec)?;
        }
        writeln!(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, file_type: FileType) -> Record {
        Record {
            file_type,
            perm: 0o750,
            replication: 3,
            owner: "hdfs".into(),
            group: "supergroup".into(),
            size: 2048,
            timestamp: 0,
            name: name.into(),
        }
    }

    #[test]
    fn test_format_flags() {
        assert_eq!(format_flags(0o000), "---------");
        assert_eq!(format_flags(0o007), "------rwx");
        assert_eq!(format_flags(0o077), "---rwxrwx");
        assert_eq!(format_flags(0o777), "rwxrwxrwx");
        assert_eq!(format_flags(0o707), "rwx---rwx");
        assert_eq!(format_flags(0o123), "--x-w--wx");
        assert_eq!(format_flags(0o456), "r--r-xrw-");
        // Sticky bit is not shown.
        assert_eq!(format_flags(0o1777), "rwxrwxrwx");
    }

    #[test]
    fn test_human_size() {
        assert_eq!(HumanSizeFormatter::format(100), "100");
        assert_eq!(HumanSizeFormatter::format(2048), "2.0 K");
    }

    #[test]
    fn test_quote_name() {
        assert_eq!(quote_name("plain"), "plain");
        assert_eq!(quote_name("bad\nname"), "bad?name");
    }

    #[test]
    fn test_compact_line() -> std::io::Result<()> {
        let mut out = vec![];
        let format = LineFormat::compact("/data", false);
        format.print(&mut out, &record("a.txt", FileType::File))?;
        format.print(&mut out, &record("", FileType::File))?;
        assert_eq!(String::from_utf8_lossy(&out), "/data/a.txt\n/data\n");
        Ok(())
    }

    #[test]
    fn test_full_line_prefix() -> std::io::Result<()> {
        let mut out = vec![];
        let mut format = LineFormat::full("/data", false, false);
        let rec = record("dir", FileType::Directory);
        format.update_len(&rec);
        format.print(&mut out, &rec)?;
        let line = String::from_utf8_lossy(&out);
        assert!(line.starts_with("drwxr-x---   - hdfs supergroup       2048 "));
        assert!(line.ends_with(" /data/dir\n"));
        Ok(())
    }
}
