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
use anyhow::{anyhow, Result};
use libwebhdfesse::{Transport, WebHdfs};
use structopt::StructOpt;

fn parse_mode(mode: &str) -> Result<u16> {
    match u16::from_str_radix(mode, 8) {
        Ok(mode) if mode <= 0o1777 => Ok(mode),
        _ => Err(anyhow!("chmod: invalid mode {:?}, only octal modes are supported", mode)),
    }
}

#[derive(Debug, StructOpt)]
pub struct ChmodArgs {
    #[structopt(parse(try_from_str = parse_mode))]
    mode: u16,
    #[structopt(name = "path", required = true)]
    paths: Vec<String>,
}

pub struct Chmod<'a, T: Transport> {
    hdfs: &'a WebHdfs<T>,
}

impl<'a, T: Transport> Chmod<'a, T> {
    pub fn new(hdfs: &'a WebHdfs<T>) -> Self {
        Self { hdfs }
    }
}

impl<'a, T: Transport> Command for Chmod<'a, T> {
    type Args = ChmodArgs;
    type Error = anyhow::Error;

    fn run(&mut self, args: Self::Args) -> Result<i32> {
        let mut has_error = false;

        for path in args.paths {
            if let Err(e) = self.hdfs.chmod(&path, args.mode) {
                has_error = true;
                eprintln!("chmod: {}", e);
            }
        }

        Ok(has_error as _)
    }
}
