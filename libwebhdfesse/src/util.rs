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
/// Name of the OS user running the process, the usual `user.name`
/// for clusters without Kerberos.
pub fn current_username() -> Option<String> {
    match username::get_user_name() {
        Ok(name) if !name.is_empty() => Some(name),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("cannot get OS user name: {}", e);
            None
        }
    }
}
