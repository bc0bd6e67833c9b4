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
use std::cmp::Reverse;

use super::Command;
use crate::cli::ls_output::{LineFormat, Record};
use libwebhdfesse::{Transport, WebHdfs, WebHdfsError};
use structopt::StructOpt;
use thiserror::Error;
use tracing::{span, trace, Level};

/*
 * See
 * hadoop/hadoop-common-project/hadoop-common/src/main/java/org/apache/hadoop/fs/shell/Ls.java
 */
// ls options are factored out to separate struct for convenience.
#[derive(Debug, StructOpt)]
#[structopt(
    name = "ls",
    about = "List the contents that match the specified file pattern."
)]
pub struct LsOpts {
    #[structopt(short = "d", help = "Directories are listed as plain files")]
    directory: bool,
    #[structopt(
        short = "t",
        name = "sort_mtime",
        help = "Sort output by modification time (most recent first)"
    )]
    sort_mtime: bool,
    #[structopt(
        short = "u",
        help = "Use access time rather than modification time for display and sorting"
    )]
    atime: bool,
    #[structopt(short = "C", help = "Display the paths of files and directories only")]
    path_only: bool,
    #[structopt(short = "r", help = "Reverse the sort order")]
    sort_reversed: bool,
    #[structopt(
        short = "S",
        conflicts_with = "sort_mtime",
        help = "Sort output by file size"
    )]
    sort_size: bool,
    #[structopt(short = "q", help = "Print ? instead of non-printable characters")]
    quote: bool,
    #[structopt(
        short = "h",
        help = "Formats the sizes of files in a human-readable fashion"
    )]
    human: bool,
}

#[derive(Debug, StructOpt)]
pub struct LsArgs {
    #[structopt(flatten)]
    opts: LsOpts,
    #[structopt(name = "path", default_value = "/")]
    paths: Vec<String>,
}

#[derive(Debug, Error)]
pub enum LsError {
    #[error("ls: `{0}': No such file or directory")]
    NotFound(String),
    #[error("ls: {0}")]
    Fs(#[from] WebHdfsError),
    #[error(transparent)]
    LocalIo(std::io::Error),
}

pub struct Ls<'a, T: Transport> {
    hdfs: &'a WebHdfs<T>,
}

impl<'a, T: Transport> Ls<'a, T> {
    pub fn new(hdfs: &'a WebHdfs<T>) -> Self {
        Self { hdfs }
    }

    fn list_dir(&mut self, path: &str, args: &LsOpts) -> Result<(), LsError> {
        let stdout_obj = std::io::stdout();
        let mut stdout = std::io::LineWriter::new(stdout_obj.lock());

        let status = self.hdfs.stat(path).map_err(|e| {
            if e.is_not_found() {
                LsError::NotFound(path.to_owned())
            } else {
                LsError::Fs(e)
            }
        })?;

        let is_listing = !args.directory && status.is_dir();
        let mut data: Vec<Record> = if is_listing {
            self.hdfs
                .list(path)?
                .into_iter()
                .map(|ent| Record::from_file_status(ent, args.atime))
                .collect()
        } else {
            vec![Record::from_file_status(status, args.atime)]
        };

        let mut format = if args.path_only {
            LineFormat::compact(path, args.quote)
        } else {
            LineFormat::full(path, args.human, args.quote)
        };

        if is_listing && !args.path_only {
            println!("Found {} items", data.len());
        }

        {
            let span = span!(Level::TRACE, "sort", len = data.len());
            let _enter = span.enter();

            if args.sort_mtime {
                if args.sort_reversed {
                    data.sort_by_key(|a| a.timestamp);
                } else {
                    data.sort_by_key(|a| Reverse(a.timestamp));
                }
            } else if args.sort_size {
                if args.sort_reversed {
                    data.sort_by_key(|a| a.size);
                } else {
                    // `hdfs dfs -ls -S` puts the largest first.
                    data.sort_by_key(|a| Reverse(a.size));
                }
            } else {
                // The server already returns names in order.
                if args.sort_reversed {
                    data.reverse();
                }
            }
            trace!("sorted");
        }

        for entry in data.iter() {
            format.update_len(entry);
        }
        for entry in data.iter() {
            format.print(&mut stdout, entry).map_err(LsError::LocalIo)?;
        }
        Ok(())
    }
}

impl<'a, T: Transport> Command for Ls<'a, T> {
    type Args = LsArgs;
    type Error = LsError;

    fn run(&mut self, args: Self::Args) -> Result<i32, Self::Error> {
        let mut has_err = false;
        for path in args.paths {
            if let Err(e) = self.list_dir(&path, &args.opts) {
                if let LsError::LocalIo(ioe) = &e {
                    if ioe.kind() == std::io::ErrorKind::BrokenPipe {
                        // Exit early because of EPIPE
                        break;
                    }
                }
                has_err = true;
                eprintln!("{}", e);
            }
        }
        Ok(if has_err { 1 } else { 0 })
    }
}
