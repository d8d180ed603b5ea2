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

mod app;
mod config;
mod status;
mod status_pane;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use eframe::egui;
use log::{error, info};
use mimalloc::MiMalloc;
use supabase_probe::{ClientProvider, ConnectionStatus, ProbeController};

use config::{AppConfig, Overrides, ENV_ACCESS_TOKEN, ENV_ANON_KEY, ENV_URL};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Exit code for configuration problems found before anything runs
const EXIT_CONFIG: u8 = 2;

/// Probe a Supabase project by fetching an auth session
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Supabase project URL
    #[arg(long, env = ENV_URL)]
    url: Option<String>,

    /// Public anon API key
    #[arg(long, env = ENV_ANON_KEY, hide_env_values = true)]
    key: Option<String>,

    /// User access token sent as the bearer instead of the anon key
    #[arg(long, env = ENV_ACCESS_TOKEN, hide_env_values = true)]
    access_token: Option<String>,

    /// Total request timeout in seconds (0 disables it)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Read settings from this file instead of the platform config directory
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run one probe without a window; exit 0 when connected, 1 otherwise
    #[arg(long)]
    headless: bool,

    /// Print the config file path and exit
    #[arg(long)]
    config_path: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            url: self.url.clone(),
            anon_key: self.key.clone(),
            access_token: self.access_token.clone(),
            request_timeout_secs: self.timeout_secs,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if cli.config_path {
        return match AppConfig::get_config_path() {
            Ok(path) => {
                println!("{}", path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Cannot determine config path: {}", e);
                ExitCode::from(EXIT_CONFIG)
            }
        };
    }

    let loaded = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    let app_config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    // Validate before any UI exists; a bad URL or key stops here
    let provider = match app_config
        .client_config(&cli.overrides())
        .and_then(ClientProvider::new)
    {
        Ok(provider) => provider,
        Err(e) => {
            error!("Invalid Supabase configuration: {}", e);
            error!("Set {} and {} or use --url/--key", ENV_URL, ENV_ANON_KEY);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if cli.headless {
        return run_headless(&provider, &runtime, &app_config);
    }

    match run_window(provider, runtime, app_config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Window error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_headless(
    provider: &ClientProvider,
    runtime: &tokio::runtime::Runtime,
    app_config: &AppConfig,
) -> ExitCode {
    let mut controller = ProbeController::new(provider.get(), runtime.handle().clone())
        .with_policy(app_config.overlap_policy);

    let status = runtime.block_on(controller.run_once());
    println!("Supabase Connection: {status}");

    match status {
        ConnectionStatus::Connected => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}

fn run_window(
    provider: ClientProvider,
    runtime: tokio::runtime::Runtime,
    app_config: AppConfig,
) -> Result<(), eframe::Error> {
    info!("Starting Dual for {}", provider.config().base_url());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([420.0, 560.0])
            .with_title("Dual"),
        ..Default::default()
    };

    eframe::run_native(
        "Dual",
        options,
        Box::new(move |cc| {
            Ok(Box::new(app::DualApp::new(
                cc,
                &provider,
                runtime,
                app_config.overlap_policy,
                app_config.history_limit,
            )))
        }),
    )
}
