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
use std::io::Write;

use super::Command;
use anyhow::Result;
use libwebhdfesse::{simple, Transport, WebHdfs};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
pub struct CatArgs {
    #[structopt(name = "src", required = true)]
    srcs: Vec<String>,
}

pub struct Cat<'a, T: Transport> {
    hdfs: &'a WebHdfs<T>,
}

impl<'a, T: Transport> Cat<'a, T> {
    pub fn new(hdfs: &'a WebHdfs<T>) -> Self {
        Self { hdfs }
    }
}

impl<'a, T: Transport> Command for Cat<'a, T> {
    type Args = CatArgs;
    type Error = anyhow::Error;

    fn run(&mut self, args: Self::Args) -> Result<i32> {
        let stdout_obj = std::io::stdout();
        let mut stdout = stdout_obj.lock();
        let mut has_error = false;

        for src in args.srcs {
            match simple::safe_read(self.hdfs, &src) {
                Ok(data) => {
                    if let Err(e) = stdout.write_all(&data) {
                        if e.kind() == std::io::ErrorKind::BrokenPipe {
                            break;
                        }
                        return Err(e.into());
                    }
                }
                Err(e) => {
                    has_error = true;
                    eprintln!("cat: {}: {}", src, e);
                }
            }
        }
        stdout.flush()?;

        Ok(has_error as _)
    }
}
