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

use crate::status::ProbeHistory;
use supabase_probe::{ConnectionStatus, OverlapPolicy};

const CONNECTED_GREEN: egui::Color32 = egui::Color32::from_rgb(100, 220, 100);
const FAILED_RED: egui::Color32 = egui::Color32::from_rgb(255, 100, 100);
const MUTED_GREY: egui::Color32 = egui::Color32::from_rgb(130, 130, 130);

/// Everything the pane needs to draw one frame
pub struct PaneState<'a> {
    pub status: &'a ConnectionStatus,
    pub endpoint: &'a str,
    pub policy: OverlapPolicy,
    pub in_flight: usize,
    pub history: &'a ProbeHistory,
}

pub struct StatusPane {
    pub history_expanded: bool,
}

impl Default for StatusPane {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusPane {
    pub fn new() -> Self {
        Self {
            history_expanded: true,
        }
    }

    /// Render the single screen. Returns true when "Test Connection" was clicked.
    pub fn render(&mut self, ui: &mut egui::Ui, state: &PaneState<'_>) -> bool {
        let mut test_clicked = false;

        ui.vertical_centered(|ui| {
            ui.add_space(20.0);
            self.render_header(ui);

            ui.add_space(20.0);
            test_clicked = self.render_connection_section(ui, state);

            ui.add_space(16.0);
            ui.separator();
        });

        self.render_history_section(ui, state.history);

        test_clicked
    }

    fn render_header(&self, ui: &mut egui::Ui) {
        ui.label(egui::RichText::new("🌐")
            .size(32.0)
            .color(ui.visuals().selection.bg_fill));
        ui.label(egui::RichText::new("Dual App")
            .size(24.0)
            .strong());
    }

    fn render_connection_section(&self, ui: &mut egui::Ui, state: &PaneState<'_>) -> bool {
        ui.label(egui::RichText::new("Supabase Connection:")
            .size(16.0)
            .strong());

        ui.label(egui::RichText::new(state.status.to_string())
            .color(status_color(state.status))
            .size(14.0));

        ui.label(egui::RichText::new(state.endpoint)
            .color(MUTED_GREY)
            .size(9.0)
            .monospace());

        // Only reachable by clicking again while a probe is running
        if state.in_flight > 1 {
            let note = match state.policy {
                OverlapPolicy::LatestRequestWins => "earlier probes cancelled",
                OverlapPolicy::LastWriteWins => "last to finish wins",
            };
            ui.label(egui::RichText::new(format!("{} probes in flight ({})", state.in_flight, note))
                .color(egui::Color32::from_rgb(255, 200, 100))
                .size(9.0)
                .italics());
        }

        ui.add_space(8.0);

        let button = egui::Button::new(egui::RichText::new("Test Connection").size(14.0))
            .fill(ui.visuals().selection.bg_fill);
        ui.add(button).clicked()
    }

    fn render_history_section(&mut self, ui: &mut egui::Ui, history: &ProbeHistory) {
        // Label changes with the record count, so the collapse state needs a fixed id
        let header = egui::CollapsingHeader::new(egui::RichText::new(format!("HISTORY ({})", history.len()))
                .color(egui::Color32::from_rgb(150, 150, 150))
                .size(10.0)
                .strong())
            .id_salt("probe_history")
            .default_open(self.history_expanded)
            .show(ui, |ui| {
                if history.is_empty() {
                    ui.label(egui::RichText::new("No probes yet")
                        .color(egui::Color32::from_rgb(100, 100, 100))
                        .size(9.0)
                        .italics());
                    return;
                }

                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new("Probes:")
                        .color(MUTED_GREY)
                        .size(9.0));
                    let rate = history
                        .success_rate()
                        .map_or_else(|| "-".to_string(), |r| format!("{r:.0}%"));
                    ui.label(egui::RichText::new(format!("{} ({} ok, {} failed, {} success)",
                        history.total_probes, history.connected_count, history.failed_count, rate))
                        .color(egui::Color32::from_rgb(200, 200, 200))
                        .size(9.0)
                        .monospace());
                });

                if let Some(last) = history.last_connected_at {
                    ui.horizontal(|ui| {
                        ui.label(egui::RichText::new("Last OK:")
                            .color(MUTED_GREY)
                            .size(9.0));
                        ui.label(egui::RichText::new(last.format("%H:%M:%S").to_string())
                            .color(egui::Color32::from_rgb(200, 200, 200))
                            .size(9.0)
                            .monospace());
                    });
                }

                ui.add_space(4.0);

                egui::ScrollArea::vertical()
                    .max_height(14.0 * 8.0)
                    .auto_shrink([false, true])
                    .show(ui, |ui| {
                        for record in history.recent() {
                            ui.horizontal(|ui| {
                                let (icon, color) = match (&record.status, record.superseded) {
                                    (_, true) => ("○", MUTED_GREY),
                                    (ConnectionStatus::Connected, false) => ("●", CONNECTED_GREEN),
                                    _ => ("✕", FAILED_RED),
                                };

                                ui.label(egui::RichText::new(icon)
                                    .color(color)
                                    .size(9.0));

                                ui.label(egui::RichText::new(format!("#{} {}",
                                    record.seq, record.finished_at.format("%H:%M:%S")))
                                    .color(egui::Color32::from_rgb(100, 100, 100))
                                    .size(8.0)
                                    .monospace());

                                ui.label(egui::RichText::new(format!("{}ms", record.elapsed_ms))
                                    .color(egui::Color32::from_rgb(100, 180, 255))
                                    .size(8.0)
                                    .monospace());

                                let text = truncate(&record.status.to_string(), 48);
                                ui.label(egui::RichText::new(text)
                                    .color(egui::Color32::from_rgb(180, 180, 180))
                                    .size(8.0))
                                    .on_hover_text(record.status.to_string());
                            });
                        }
                    });
            });

        self.history_expanded = header.openness > 0.5;
    }
}

/// Green when connected, red for everything else
pub fn status_color(status: &ConnectionStatus) -> egui::Color32 {
    if status.is_connected() {
        CONNECTED_GREEN
    } else {
        FAILED_RED
    }
}

/// Shorten a message to at most `max_chars` characters, marking the cut
fn truncate(message: &str, max_chars: usize) -> String {
    if message.chars().count() > max_chars {
        let kept: String = message.chars().take(max_chars).collect();
        format!("{kept}...")
    } else {
        message.to_string()
    }
}
