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

//! Supabase connectivity probe.
//!
//! This library checks whether a Supabase project is reachable and accepts the
//! configured credentials by fetching an authentication session. It is split
//! into layers that can be used on their own:
//!
//! - **Config layer**: [`ClientConfig`] validates the base URL and API key up
//!   front and reports problems as a typed [`ConfigError`]
//! - **Client layer**: [`ClientProvider`] builds one [`SupabaseClient`] and
//!   hands out shared handles to it
//! - **Probe layer**: [`check`] reduces one session fetch to a
//!   [`ConnectionStatus`]; [`ProbeController`] runs probes in the background
//!   and owns the status a front end renders
//!
//! # Quick Start
//!
//! ```no_run
//! use supabase_probe::{check, ClientConfig, ClientProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), supabase_probe::ConfigError> {
//!     let provider = ClientProvider::new(ClientConfig::new(
//!         "https://example.supabase.co",
//!         "public-anon-key",
//!     )?)?;
//!
//!     let status = check(&*provider.get()).await;
//!     println!("{status}");
//!     Ok(())
//! }
//! ```
//!
//! # Background Probes
//!
//! ```no_run
//! use supabase_probe::{ClientProvider, OverlapPolicy, ProbeController};
//!
//! # async fn example(provider: ClientProvider) {
//! let mut controller = ProbeController::new(provider.get(), tokio::runtime::Handle::current())
//!     .with_policy(OverlapPolicy::LatestRequestWins);
//!
//! controller.start();
//! // Called once per frame by a UI loop
//! for update in controller.poll() {
//!     println!("{:?}", update);
//! }
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod probe;

pub use auth::{AuthError, Session, SessionFetcher, User};
pub use client::{ClientHandle, ClientProvider, SupabaseClient};
pub use config::{ClientConfig, ConfigError};
pub use probe::{check, ConnectionStatus, OverlapPolicy, ProbeController, ProbeOutcome, ProbeUpdate};
