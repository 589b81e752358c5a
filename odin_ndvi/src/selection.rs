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

//! the weekly selection controller. Each week goes through
//! ```diagram
//!                           ┌──> Accepted      (first candidate that passes the quality gates)
//!   Searching ──> Evaluating┤
//!       │                   └──> Exhausted     (all of the first N candidates rejected)
//!       └──────────────────────> SearchFailed  (no candidates, or provider unavailable after retries)
//! ```
//! and produces exactly one `WeekResult`

use std::{collections::HashSet, fmt};
use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;
use tracing::{debug,error,info,warn};

use crate::{
    errors::*,
    config::FetchErrorPolicy,
    emitter::ArtifactEmitter,
    geo::BoundingBox,
    provider::{Candidate, CatalogClient, PixelSource},
    quality::{QualityEvaluator, Verdict},
    results::WeekResult,
    retry::{RetryingSearch, SearchOutcome},
    weeks::WeekWindow
};

/// terminal state of a week
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum WeekOutcome {
    Accepted,
    Exhausted,
    SearchFailed,
    /// pixel data retrieval failed and the policy is to give up on the week
    FetchFailed,
}

impl fmt::Display for WeekOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WeekOutcome::Accepted => "accepted",
            WeekOutcome::Exhausted => "exhausted",
            WeekOutcome::SearchFailed => "search failed",
            WeekOutcome::FetchFailed => "fetch failed",
        };
        f.write_str(s)
    }
}

enum WeekState {
    Searching,
    Evaluating(Vec<Candidate>),
    Done(WeekOutcome),
}

#[derive(Debug,Clone,PartialEq)]
pub struct WeekSelection {
    pub outcome: WeekOutcome,
    pub result: WeekResult,
    /// number of candidates for which we retrieved pixel data
    pub evaluated: usize,
}

#[derive(Debug)]
pub enum RunStatus {
    Completed,
    /// externally cancelled. The week in progress is not part of the results
    Cancelled,
    /// a non-recoverable error ended the run. Results of the weeks before are kept
    Aborted(OdinNdviError),
}

/// the accumulated results of a (possibly partial) run, in week order
#[derive(Debug)]
pub struct SelectionRun {
    pub results: Vec<WeekResult>,
    pub outcomes: Vec<WeekOutcome>,
    pub status: RunStatus,
}

impl SelectionRun {
    pub fn is_complete (&self)->bool { matches!( self.status, RunStatus::Completed) }

    pub fn count (&self, outcome: WeekOutcome)->usize {
        self.outcomes.iter().filter( |o| **o == outcome).count()
    }
}

pub struct WeeklySelector<C,P,E> {
    search: RetryingSearch<C>,
    evaluator: QualityEvaluator<P,E>,
    bbox: BoundingBox,
    max_candidates: usize,
    fetch_error_policy: FetchErrorPolicy,
}

impl<C,P,E> WeeklySelector<C,P,E> where C: CatalogClient, P: PixelSource, E: ArtifactEmitter {
    pub fn new (search: RetryingSearch<C>, evaluator: QualityEvaluator<P,E>, bbox: BoundingBox,
                max_candidates: usize, fetch_error_policy: FetchErrorPolicy)->Self {
        WeeklySelector { search, evaluator, bbox, max_candidates, fetch_error_policy }
    }

    /// run the per-week state machine for `window`. Errors are either non-transient search errors or
    /// fetch errors under `FetchErrorPolicy::AbortRun`
    pub async fn select_week (&self, window: &WeekWindow)->Result<WeekSelection> {
        let mut state = WeekState::Searching;
        let mut evaluated = 0;

        loop {
            state = match state {
                WeekState::Searching => {
                    match self.search.search( &self.bbox, window).await? {
                        SearchOutcome::Candidates(candidates) if !candidates.is_empty() => {
                            debug!("{} candidates for week {}", candidates.len(), window.number);
                            WeekState::Evaluating(candidates)
                        }
                        SearchOutcome::Candidates(_) => {
                            info!("no images found for week {}", window.number);
                            WeekState::Done( WeekOutcome::SearchFailed)
                        }
                        SearchOutcome::Unavailable{attempts} => {
                            warn!("no search results for week {} after {attempts} attempts, skipping", window.number);
                            WeekState::Done( WeekOutcome::SearchFailed)
                        }
                    }
                }

                WeekState::Evaluating(candidates) => {
                    let (outcome, n) = self.evaluate_candidates( window, &candidates).await?;
                    evaluated = n;
                    match outcome {
                        Some((outcome, result)) => {
                            return Ok( WeekSelection { outcome, result, evaluated })
                        }
                        None => {
                            info!("no valid image for week {}", window.number);
                            WeekState::Done( WeekOutcome::Exhausted)
                        }
                    }
                }

                WeekState::Done(outcome) => {
                    return Ok( WeekSelection { outcome, result: WeekResult::none(window), evaluated })
                }
            }
        }
    }

    /// walk the first `max_candidates` in provider order. Returns the terminal outcome and result if a
    /// candidate was accepted (or the week was given up), None if all were rejected
    async fn evaluate_candidates (&self, window: &WeekWindow, candidates: &[Candidate])->Result<(Option<(WeekOutcome,WeekResult)>,usize)> {
        let mut seen: HashSet<NaiveDate> = HashSet::new();
        let mut evaluated = 0;

        for candidate in candidates.iter().take( self.max_candidates) {
            if !seen.insert( candidate.date) {
                debug!("skipping {candidate}, date already evaluated");
                continue
            }

            info!("trying image {}", candidate.date);
            evaluated += 1;

            match self.evaluator.evaluate( candidate, window).await? {
                Verdict::Accepted { result, .. } => {
                    return Ok( (Some((WeekOutcome::Accepted, result)), evaluated))
                }
                Verdict::Rejected {..} => {} // already reported by evaluator
                Verdict::FetchFailed(e) => match self.fetch_error_policy {
                    FetchErrorPolicy::AbortRun => return Err(e),
                    FetchErrorPolicy::RejectCandidate => {
                        warn!("failed to retrieve image {}: {e}, trying next candidate", candidate.date);
                    }
                    FetchErrorPolicy::SkipWeek => {
                        warn!("failed to retrieve image {}: {e}, skipping week {}", candidate.date, window.number);
                        return Ok( (Some((WeekOutcome::FetchFailed, WeekResult::none(window))), evaluated))
                    }
                }
            }
        }

        Ok( (None, evaluated) )
    }

    /// process `windows` strictly in order, appending exactly one result per completed week.
    /// Cancellation is checked before and during each week
    pub async fn run<I> (&self, windows: I, cancel: &CancellationToken)->SelectionRun where I: IntoIterator<Item=WeekWindow> {
        let mut results: Vec<WeekResult> = Vec::new();
        let mut outcomes: Vec<WeekOutcome> = Vec::new();
        let mut status = RunStatus::Completed;

        for window in windows {
            if cancel.is_cancelled() {
                status = RunStatus::Cancelled;
                break
            }

            info!("{window}");
            let res = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                res = self.select_week( &window) => Some(res)
            };

            match res {
                Some(Ok(selection)) => {
                    outcomes.push( selection.outcome);
                    results.push( selection.result);
                }
                Some(Err(e)) => {
                    error!("week {} failed: {e}", window.number);
                    status = RunStatus::Aborted(e);
                    break
                }
                None => {
                    warn!("cancelled while processing week {}", window.number);
                    status = RunStatus::Cancelled;
                    break
                }
            }
        }

        SelectionRun { results, outcomes, status }
    }
}
