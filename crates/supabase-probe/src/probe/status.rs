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

use std::fmt;

use crate::auth::{AuthError, Session};

/// Outcome of the most recent connectivity probe.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// No probe has run since startup.
    #[default]
    NotTested,
    /// A probe is in flight.
    Testing,
    /// The backend returned a session.
    Connected,
    /// The session fetch was rejected; holds the error description.
    Failed(String),
}

impl ConnectionStatus {
    /// Reduce a session-fetch result to a terminal status.
    #[must_use]
    pub fn from_result(result: &Result<Session, AuthError>) -> Self {
        match result {
            Ok(_) => Self::Connected,
            Err(e) => Self::Failed(e.to_string()),
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// `Connected` or `Failed`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Connected | Self::Failed(_))
    }

    /// Failure description, if the probe failed.
    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotTested => f.write_str("Not tested"),
            Self::Testing => f.write_str("Testing..."),
            Self::Connected => f.write_str("Connected"),
            Self::Failed(reason) => write!(f, "Connection failed: {reason}"),
        }
    }
}
