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
use anyhow::{bail, Result};
use libwebhdfesse::{simple, Options, Transport, WebHdfs};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
pub struct MvArgs {
    #[structopt(name = "src", required = true)]
    srcs: Vec<String>,
    #[structopt(required = true)]
    dst: String,
}

pub struct Mv<'a, T: Transport> {
    hdfs: &'a WebHdfs<T>,
}

impl<'a, T: Transport> Mv<'a, T> {
    pub fn new(hdfs: &'a WebHdfs<T>) -> Self {
        Self { hdfs }
    }
}

impl<'a, T: Transport> Command for Mv<'a, T> {
    type Args = MvArgs;
    type Error = anyhow::Error;

    fn run(&mut self, args: Self::Args) -> Result<i32> {
        let dst_is_dir = match self.hdfs.stat(&args.dst) {
            Ok(status) => status.is_dir(),
            Err(e) if e.is_not_found() => false,
            Err(e) => return Err(e.into()),
        };

        if dst_is_dir {
            let moved = simple::move_paths(self.hdfs, &args.srcs, &args.dst)?;
            let failed = moved.iter().filter(|ok| !**ok).count();
            if failed > 0 {
                eprintln!("mv: {} of {} paths were not moved", failed, moved.len());
            }
            return Ok((failed > 0) as _);
        }

        if args.srcs.len() > 1 {
            bail!("mv: `{}': Is not a directory", args.dst);
        }
        if !self.hdfs.rename(&args.srcs[0], &args.dst, &Options::new())? {
            eprintln!("mv: `{}': cannot rename to `{}'", args.srcs[0], args.dst);
            return Ok(1);
        }
        Ok(0)
    }
}
