// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Connectivity probe.
//!
//! [`check`] performs one session fetch and reduces it to a
//! [`ConnectionStatus`]. [`ProbeController`] owns the status a front end
//! renders, runs each check as a background task and receives outcomes over a
//! channel, so the status only ever changes on the thread that drains it.

mod controller;
mod status;

pub use controller::{OverlapPolicy, ProbeController, ProbeOutcome, ProbeUpdate};
pub use status::ConnectionStatus;

use log::{info, warn};

use crate::auth::SessionFetcher;

/// Run one session fetch and map the result to a terminal status.
///
/// Never retries. Failures are logged and reported through
/// [`ConnectionStatus::Failed`] with the error's description.
pub async fn check(fetcher: &dyn SessionFetcher) -> ConnectionStatus {
    let result = fetcher.fetch_session().await;
    match &result {
        Ok(session) => info!("Session fetch succeeded (user {})", session.user.id),
        Err(e) => warn!("Session fetch failed: {}", e),
    }
    ConnectionStatus::from_result(&result)
}
