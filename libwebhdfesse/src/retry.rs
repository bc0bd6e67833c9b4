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
/*!
 * Retry and failover policy around one logical call.
 */
use std::time::Duration;

use regex::Regex;
use tracing::{error, info, instrument};

use crate::config::RetryPolicy;
use crate::error::WebHdfsError;

lazy_static::lazy_static! {
    static ref BLOCK_LENGTH_RE: Regex = Regex::new("^Cannot obtain block length").unwrap();
}

/// Why a failure is worth another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryRule {
    /// A remote exception from `RetryPolicy::known_exceptions`.
    KnownException,
    /// The DataNode has not reported the last block yet.
    BlockLength,
    ServerError,
    Kerberos,
}

impl RetryRule {
    pub fn classify(err: &WebHdfsError, policy: &RetryPolicy) -> Option<Self> {
        match err {
            WebHdfsError::Io(failure) => {
                let known = failure.remote.as_ref().map_or(false, |remote| {
                    policy.known_exceptions.iter().any(|name| remote.is(name))
                });
                if known {
                    Some(RetryRule::KnownException)
                } else if BLOCK_LENGTH_RE.is_match(failure.remote_message()) {
                    Some(RetryRule::BlockLength)
                } else {
                    None
                }
            }
            WebHdfsError::Server(_) => Some(RetryRule::ServerError),
            WebHdfsError::Kerberos(_) => Some(RetryRule::Kerberos),
            _ => None,
        }
    }

    pub fn interval(self, policy: &RetryPolicy) -> Duration {
        match self {
            RetryRule::KnownException | RetryRule::Kerberos => policy.transient_interval,
            RetryRule::BlockLength => policy.block_length_interval,
            RetryRule::ServerError => policy.server_error_interval,
        }
    }

    /// The block length race is not a NameNode problem.
    pub fn rediscovers(self) -> bool {
        !matches!(self, RetryRule::BlockLength)
    }
}

/// What the retry loop needs from a client to fail over.
pub trait Failover {
    /// Point the client at the active NameNode.  Never fails: on error,
    /// including a client without a discovery endpoint, the client
    /// stays where it is.
    fn rediscover(&self);

    fn health_check(&self) -> Result<(), WebHdfsError>;
}

/**
 * Run `call` until it succeeds, fails with a non-retryable error or
 * the retry budget is spent.  A failed health check after rediscovery
 * ends the loop with the health check's error.
 */
#[instrument(skip(policy, failover, call))]
pub fn with_retry<F, R, C>(policy: &RetryPolicy, failover: &F, mut call: C) -> Result<R, WebHdfsError>
where
    F: Failover + ?Sized,
    C: FnMut() -> Result<R, WebHdfsError>,
{
    let mut retries = 0;
    loop {
        let err = match call() {
            Ok(res) => return Ok(res),
            Err(err) => err,
        };
        if !policy.enabled || retries >= policy.max_attempts {
            return Err(err);
        }
        let rule = match RetryRule::classify(&err, policy) {
            Some(rule) => rule,
            None => return Err(err),
        };
        retries += 1;

        let interval = rule.interval(policy);
        error!(
            ?rule,
            attempt = retries,
            "{}; retrying in {:?}",
            err,
            interval
        );
        if !interval.is_zero() {
            std::thread::sleep(interval);
        }

        if rule.rediscovers() {
            failover.rediscover();
            if let Err(health) = failover.health_check() {
                error!("Failed to access HDFS with error {}", health);
                return Err(health);
            }
            info!("client is operational again");
        }
    }
}
