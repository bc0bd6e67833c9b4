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
pub mod cat;
pub mod chmod;
pub mod ls;
mod ls_output;
pub mod mkdir;
pub mod mv;
pub mod put;
pub mod rm;
pub mod stat;

/// A `dfs` subcommand.  `run` returns the process exit code; errors
/// for single paths are reported on stderr and turn into a non-zero
/// code instead.
pub trait Command {
    type Args;
    type Error;

    fn run(&mut self, args: Self::Args) -> Result<i32, Self::Error>;
}
