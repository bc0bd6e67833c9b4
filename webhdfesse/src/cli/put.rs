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
use std::fs::File;
use std::path::PathBuf;

use super::Command;
use anyhow::{Context, Result};
use libwebhdfesse::{Options, Transport, WebHdfs};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
pub struct PutArgs {
    #[structopt(short = "f", help = "Overwrite the destination if it already exists")]
    force: bool,
    #[structopt(name = "localsrc", parse(from_os_str), required = true)]
    src: PathBuf,
    #[structopt(required = true)]
    dst: String,
}

pub struct Put<'a, T: Transport> {
    hdfs: &'a WebHdfs<T>,
}

impl<'a, T: Transport> Put<'a, T> {
    pub fn new(hdfs: &'a WebHdfs<T>) -> Self {
        Self { hdfs }
    }
}

impl<'a, T: Transport> Command for Put<'a, T> {
    type Args = PutArgs;
    type Error = anyhow::Error;

    fn run(&mut self, args: Self::Args) -> Result<i32> {
        let file = File::open(&args.src)
            .with_context(|| format!("put: cannot open {}", args.src.display()))?;
        let len = file.metadata()?.len();
        let options = Options::new().with("overwrite", args.force);

        if self
            .hdfs
            .create_from_reader(&args.dst, file, len, &options)?
        {
            Ok(0)
        } else {
            eprintln!("put: `{}': not created", args.dst);
            Ok(1)
        }
    }
}
