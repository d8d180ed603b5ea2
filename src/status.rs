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

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use supabase_probe::{ConnectionStatus, ProbeUpdate};

/// One finished probe, as shown in the history panel
#[derive(Debug, Clone)]
pub struct ProbeRecord {
    pub seq: u64,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u128,
    pub status: ConnectionStatus,
    /// Outcome arrived after a newer probe had started and was not shown
    pub superseded: bool,
}

/// Rolling record of probe outcomes
#[derive(Debug)]
pub struct ProbeHistory {
    records: VecDeque<ProbeRecord>,
    max_records: usize,

    // Lifetime counters (not bounded by max_records)
    pub total_probes: u64,
    pub connected_count: u64,
    pub failed_count: u64,
    pub last_connected_at: Option<DateTime<Utc>>,
}

impl ProbeHistory {
    pub fn new(max_records: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(max_records),
            max_records,
            total_probes: 0,
            connected_count: 0,
            failed_count: 0,
            last_connected_at: None,
        }
    }

    /// Record an update received from the probe controller
    pub fn record(&mut self, update: &ProbeUpdate) {
        let outcome = update.outcome();
        let now = Utc::now();
        let superseded = !update.is_applied();

        if !superseded {
            self.total_probes += 1;
            match outcome.status {
                ConnectionStatus::Connected => {
                    self.connected_count += 1;
                    self.last_connected_at = Some(now);
                }
                ConnectionStatus::Failed(_) => self.failed_count += 1,
                ConnectionStatus::NotTested | ConnectionStatus::Testing => {}
            }
        }

        self.records.push_back(ProbeRecord {
            seq: outcome.seq,
            finished_at: now,
            elapsed_ms: outcome.elapsed.as_millis(),
            status: outcome.status.clone(),
            superseded,
        });

        // Keep only the last N records
        while self.records.len() > self.max_records {
            self.records.pop_front();
        }
    }

    /// Records, newest first
    pub fn recent(&self) -> impl Iterator<Item = &ProbeRecord> {
        self.records.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Share of applied probes that connected, in percent
    pub fn success_rate(&self) -> Option<f64> {
        if self.total_probes == 0 {
            None
        } else {
            Some(self.connected_count as f64 * 100.0 / self.total_probes as f64)
        }
    }
}
