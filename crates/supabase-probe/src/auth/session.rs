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

//! Session and user payloads returned by the auth service.

use serde::{Deserialize, Serialize};

use crate::config::redact;

/// Authenticated user as reported by `GET /auth/v1/user`.
///
/// Only the fields the probe cares about are modelled; everything else in the
/// payload is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User UUID.
    pub id: String,

    /// Audience claim (usually "authenticated").
    #[serde(default)]
    pub aud: String,

    #[serde(default)]
    pub role: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub phone: Option<String>,

    /// RFC 3339 creation timestamp, kept as sent.
    #[serde(default)]
    pub created_at: Option<String>,

    #[serde(default)]
    pub last_sign_in_at: Option<String>,

    #[serde(default)]
    pub is_anonymous: bool,
}

/// A session: the bearer token that was accepted plus the user behind it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    /// Build a session from the user returned for a given bearer token.
    #[must_use]
    pub fn from_user(access_token: &str, user: User) -> Self {
        Self {
            access_token: access_token.to_string(),
            token_type: default_token_type(),
            user,
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &redact(&self.access_token))
            .field("token_type", &self.token_type)
            .field("user", &self.user)
            .finish()
    }
}

/// Success body of the session-fetch endpoint.
///
/// GoTrue answers with a bare user object, but proxies and older servers may
/// wrap it in a full session. Both shapes are accepted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum SessionPayload {
    Session(Session),
    User(User),
}

impl SessionPayload {
    pub(crate) fn into_session(self, bearer: &str) -> Session {
        match self {
            Self::Session(session) => session,
            Self::User(user) => Session::from_user(bearer, user),
        }
    }
}

/// Error body returned by the auth service or the API gateway in front of it.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    /// The most specific human-readable message in the body, if any.
    pub(crate) fn into_message(self) -> Option<String> {
        self.msg
            .or(self.message)
            .or(self.error_description)
            .or(self.error)
            .filter(|m| !m.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER_JSON: &str = r#"{
        "id": "8d0fd2b3-9ca7-4d9e-a95f-9e13dded323e",
        "aud": "authenticated",
        "role": "authenticated",
        "email": "pilot@example.com",
        "app_metadata": {"provider": "email"},
        "created_at": "2025-06-14T08:00:00Z",
        "is_anonymous": false
    }"#;

    #[test]
    fn test_user_payload_becomes_session() {
        let payload: SessionPayload = serde_json::from_str(USER_JSON).unwrap();
        let session = payload.into_session("anon-key");
        assert_eq!(session.access_token, "anon-key");
        assert_eq!(session.token_type, "bearer");
        assert_eq!(session.user.email.as_deref(), Some("pilot@example.com"));
        assert_eq!(session.user.aud, "authenticated");
    }

    #[test]
    fn test_session_payload_kept_as_is() {
        let json = format!(
            r#"{{"access_token": "jwt", "token_type": "bearer", "expires_in": 3600, "user": {USER_JSON}}}"#
        );
        let payload: SessionPayload = serde_json::from_str(&json).unwrap();
        let session = payload.into_session("anon-key");
        assert_eq!(session.access_token, "jwt");
        assert_eq!(session.user.id, "8d0fd2b3-9ca7-4d9e-a95f-9e13dded323e");
    }

    #[test]
    fn test_payload_without_user_rejected() {
        let result: Result<SessionPayload, _> = serde_json::from_str(r#"{"status": "ok"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_error_body_message_precedence() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"code": 401, "error_code": "bad_jwt", "msg": "invalid JWT", "error": "unauthorized"}"#,
        )
        .unwrap();
        assert_eq!(body.into_message().as_deref(), Some("invalid JWT"));

        let body: ErrorBody =
            serde_json::from_str(r#"{"message": "Invalid API key", "hint": "Double check"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("Invalid API key"));

        assert_eq!(ErrorBody::default().into_message(), None);
    }

    #[test]
    fn test_session_debug_redacts_token() {
        let payload: SessionPayload = serde_json::from_str(USER_JSON).unwrap();
        let session = payload.into_session("very-secret-token");
        assert!(!format!("{session:?}").contains("very-secret-token"));
    }
}
