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

//! The desktop front end: one window, one button, one status label.

use eframe::egui;
use log::info;
use supabase_probe::{ClientProvider, OverlapPolicy, ProbeController};
use tokio::runtime::Runtime;

use crate::status::ProbeHistory;
use crate::status_pane::{PaneState, StatusPane};

pub struct DualApp {
    // Declared before the runtime so in-flight probes are cancelled first on drop
    controller: ProbeController,
    history: ProbeHistory,
    pane: StatusPane,
    endpoint: String,
    _runtime: Runtime,
}

impl DualApp {
    /// Build the app around an already validated client provider.
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        provider: &ClientProvider,
        runtime: Runtime,
        policy: OverlapPolicy,
        history_limit: usize,
    ) -> Self {
        let ctx = cc.egui_ctx.clone();
        let controller = ProbeController::new(provider.get(), runtime.handle().clone())
            .with_policy(policy)
            .with_notifier(move || ctx.request_repaint());

        info!("Probe controller ready ({:?})", policy);

        Self {
            controller,
            history: ProbeHistory::new(history_limit),
            pane: StatusPane::new(),
            endpoint: provider.config().user_endpoint().to_string(),
            _runtime: runtime,
        }
    }
}

impl eframe::App for DualApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Apply finished probes before drawing so the frame shows the latest status
        for update in self.controller.poll() {
            self.history.record(&update);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            let state = PaneState {
                status: self.controller.status(),
                endpoint: &self.endpoint,
                policy: self.controller.policy(),
                in_flight: self.controller.in_flight(),
                history: &self.history,
            };

            if self.pane.render(ui, &state) {
                self.controller.start();
            }
        });
    }
}
