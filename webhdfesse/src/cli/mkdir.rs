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
use libwebhdfesse::{Options, Transport, WebHdfs, WebHdfsError};
use structopt::StructOpt;
use thiserror::Error;

#[derive(Debug, StructOpt)]
#[structopt(name = "mkdir", about = "Create a directory in specified location")]
pub struct MkdirArgs {
    #[structopt(name = "src", required = true)]
    srcs: Vec<String>,
    #[structopt(short = "p", help = "Do not fail if the directory already exists")]
    parents: bool,
}

#[derive(Debug, Error)]
pub enum MkdirError {
    #[error("mkdir: `{0}': File exists")]
    Exists(String),
    #[error("mkdir: `{0}': cannot create directory")]
    NotCreated(String),
    #[error("mkdir: {0}")]
    Fs(#[from] WebHdfsError),
}

pub struct Mkdir<'a, T: Transport> {
    hdfs: &'a WebHdfs<T>,
}

impl<'a, T: Transport> Mkdir<'a, T> {
    pub fn new(hdfs: &'a WebHdfs<T>) -> Self {
        Self { hdfs }
    }

    fn mkdir(&mut self, path: &str, parents: bool) -> Result<(), MkdirError> {
        // MKDIRS always creates parents, so without -p an existing
        // path has to be checked first.
        if !parents {
            match self.hdfs.stat(path) {
                Ok(_) => return Err(MkdirError::Exists(path.to_owned())),
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }

        if self.hdfs.mkdir(path, &Options::new())? {
            Ok(())
        } else {
            Err(MkdirError::NotCreated(path.to_owned()))
        }
    }
}

impl<'a, T: Transport> Command for Mkdir<'a, T> {
    type Args = MkdirArgs;
    type Error = anyhow::Error;

    fn run(&mut self, args: Self::Args) -> Result<i32> {
        let mut has_error = false;

        for path_str in args.srcs {
            if let Err(e) = self.mkdir(&path_str, args.parents) {
                has_error = true;
                eprintln!("{}", e);
            }
        }

        Ok(if has_error { 1 } else { 0 })
    }
}
