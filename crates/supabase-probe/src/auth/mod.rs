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

//! Auth layer: the session-fetch capability and its error type.
//!
//! [`SessionFetcher`] is the seam the probe depends on. The production
//! implementation is [`crate::SupabaseClient`]; tests substitute their own.

mod session;

pub use session::{Session, User};
pub(crate) use session::{ErrorBody, SessionPayload};

use async_trait::async_trait;
use thiserror::Error;

/// Failures of a session fetch.
///
/// The `Display` text of each variant is what ends up in front of the user.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("network error: {}", describe_transport(.0))]
    Transport(#[from] reqwest::Error),

    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("request cancelled")]
    Cancelled,
}

impl AuthError {
    /// HTTP status of the rejection, when the server answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Decode(_) | Self::Cancelled => None,
        }
    }
}

/// Name the cause of a transport failure.
///
/// reqwest's own message is the same for a timeout, a refused connection and a
/// DNS failure, so the kind and the underlying causes are spelled out.
fn describe_transport(err: &reqwest::Error) -> String {
    let kind = if err.is_timeout() {
        Some("request timed out")
    } else if err.is_connect() {
        Some("could not connect to server")
    } else {
        None
    };

    let mut text = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        // hyper and reqwest sometimes repeat the same message one level down
        if !text.ends_with(&cause_text) {
            text.push_str(": ");
            text.push_str(&cause_text);
        }
        source = cause.source();
    }

    match kind {
        Some(kind) => format!("{kind}: {text}"),
        None => text,
    }
}

/// Something that can retrieve an authentication session from the backend.
#[async_trait]
pub trait SessionFetcher: Send + Sync {
    /// Issue one session-fetch request.
    async fn fetch_session(&self) -> Result<Session, AuthError>;
}
