/*
 * Copyright © 2024, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

//! bounded, constant-interval retry of catalog searches

use std::{future::Future, time::Duration};
use serde::{Serialize,Deserialize};
use tracing::{debug,warn};

use crate::{
    errors::*, geo::BoundingBox, provider::{Candidate, CatalogClient}, weeks::WeekWindow
};

/// fixed count / fixed interval retry policy. The interval does not grow between attempts
#[derive(Deserialize,Serialize,Debug,Clone,Copy,PartialEq,Eq)]
#[serde(default)]
pub struct RetryPolicy {
    /// total number of attempts, including the first one
    pub max_attempts: u32,
    /// wait time between two consecutive attempts
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default()->Self {
        RetryPolicy { max_attempts: 3, interval: Duration::from_secs(60) }
    }
}

/// result of a retried operation that did not fail with a non-retryable error
#[derive(Debug)]
pub enum Retried<T> {
    Done(T),
    Exhausted { attempts: u32, last_error: OdinNdviError }
}

impl RetryPolicy {
    pub fn new (max_attempts: u32, interval: Duration)->Self {
        RetryPolicy { max_attempts, interval }
    }

    /// run `op` until it succeeds, fails with an error that is not `is_retryable`, or we are out of attempts.
    /// `op` gets the 1-based attempt number. We only sleep between attempts, never after the last one
    pub async fn run<T,F,Fut,P> (&self, mut op: F, is_retryable: P)->Result<Retried<T>>
        where F: FnMut(u32)->Fut, Fut: Future<Output=Result<T>>, P: Fn(&OdinNdviError)->bool
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op(attempt).await {
                Ok(v) => return Ok( Retried::Done(v)),
                Err(e) if is_retryable(&e) => {
                    if attempt >= max_attempts {
                        return Ok( Retried::Exhausted { attempts: attempt, last_error: e })
                    }
                    warn!("{e}, attempt {attempt}/{max_attempts}, retrying in {} sec..", self.interval.as_secs());
                    tokio::time::sleep( self.interval).await;
                    attempt += 1;
                }
                Err(e) => return Err(e)
            }
        }
    }
}

#[derive(Debug,Clone,PartialEq)]
pub enum SearchOutcome {
    Candidates(Vec<Candidate>),
    /// the provider stayed unavailable for all attempts
    Unavailable { attempts: u32 },
}

impl SearchOutcome {
    /// candidates to evaluate, which is empty if the provider was unavailable
    pub fn candidates (&self)->&[Candidate] {
        match self {
            SearchOutcome::Candidates(cs) => cs.as_slice(),
            SearchOutcome::Unavailable{..} => &[]
        }
    }
}

/// a `CatalogClient` wrapper that retries on transient provider errors
pub struct RetryingSearch<C> {
    client: C,
    policy: RetryPolicy,
}

impl<C> RetryingSearch<C> where C: CatalogClient {
    pub fn new (client: C, policy: RetryPolicy)->Self {
        RetryingSearch { client, policy }
    }

    /// non-transient errors are returned as-is without retry
    pub async fn search (&self, bbox: &BoundingBox, window: &WeekWindow)->Result<SearchOutcome> {
        let res = self.policy.run( |attempt| {
            debug!("catalog search for {window}, attempt {attempt}");
            self.client.search( bbox, window)
        }, OdinNdviError::is_transient).await?;

        match res {
            Retried::Done(candidates) => Ok( SearchOutcome::Candidates(candidates)),
            Retried::Exhausted { attempts, last_error } => {
                warn!("catalog search for week {} failed after {attempts} attempts: {last_error}", window.number);
                Ok( SearchOutcome::Unavailable { attempts })
            }
        }
    }
}
