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
use super::Command;
use anyhow::Result;
use libwebhdfesse::{FileStatus, FileType, Transport, WebHdfs};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
pub struct StatArgs {
    #[structopt(name = "path", required = true)]
    paths: Vec<String>,
}

fn describe(status: &FileStatus) -> String {
    let kind = match status.file_type {
        FileType::Directory => "directory",
        FileType::File if status.length == 0 => "regular file (empty)",
        FileType::File => "regular file",
        FileType::Symlink => "symlink",
    };
    format!(
        "{} {} {}:{} {} bytes replication {} block size {} mtime {}",
        kind,
        status.permission.to_octal(),
        status.owner,
        status.group,
        status.length,
        status.replication,
        status.block_size,
        status.modification_time,
    )
}

pub struct Stat<'a, T: Transport> {
    hdfs: &'a WebHdfs<T>,
}

impl<'a, T: Transport> Stat<'a, T> {
    pub fn new(hdfs: &'a WebHdfs<T>) -> Self {
        Self { hdfs }
    }
}

impl<'a, T: Transport> Command for Stat<'a, T> {
    type Args = StatArgs;
    type Error = anyhow::Error;

    fn run(&mut self, args: Self::Args) -> Result<i32> {
        let mut has_error = false;

        for path in args.paths {
            match self.hdfs.stat(&path) {
                Ok(status) => println!("{}: {}", path, describe(&status)),
                Err(e) => {
                    has_error = true;
                    eprintln!("stat: {}", e);
                }
            }
        }

        Ok(has_error as _)
    }
}
