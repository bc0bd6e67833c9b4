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
use libwebhdfesse::{Options, Transport, WebHdfs};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
pub struct RmArgs {
    #[structopt(short = "r", help = "Remove directories recursively")]
    recursive: bool,
    #[structopt(name = "src", required = true)]
    srcs: Vec<String>,
}

pub struct Rm<'a, T: Transport> {
    hdfs: &'a WebHdfs<T>,
}

impl<'a, T: Transport> Rm<'a, T> {
    pub fn new(hdfs: &'a WebHdfs<T>) -> Self {
        Self { hdfs }
    }
}

impl<'a, T: Transport> Command for Rm<'a, T> {
    type Args = RmArgs;
    type Error = anyhow::Error;

    fn run(&mut self, args: Self::Args) -> Result<i32> {
        let mut has_error = false;
        let options = Options::new().with("recursive", args.recursive);

        for src in args.srcs {
            match self.hdfs.delete(&src, &options) {
                Ok(true) => {}
                Ok(false) => {
                    has_error = true;
                    eprintln!("rm: `{}': No such file or directory", src);
                }
                Err(e) => {
                    has_error = true;
                    eprintln!("rm: {}", e);
                }
            }
        }

        Ok(has_error as _)
    }
}
