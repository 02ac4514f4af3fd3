use crate::config::Settings;
use crate::event::AppEvent;
use crate::link;
use crate::session::controller::{Phase, SessionController, SubmitOutcome};
use crate::session::store;
use crate::session::{transcript_markdown, Role, StageStateMeta, TranscriptMeta, SCHEMA_VERSION};
use crate::theme::Theme;
use crate::tutor::{prompt, TutorClient};
use eframe::egui::{self, Color32, RichText, ScrollArea};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

// Share page that carries the encoded configuration fragment.
pub const SHARE_PAGE_URL: &str = "https://gradus.app/setup";

pub struct GradusApp {
    rx: Receiver<AppEvent>,
    client: TutorClient,
    controller: SessionController,
    settings: Settings,
    settings_draft: Settings,
    settings_open: bool,
    input_buffer: String,
    error_line: Option<String>,
    diagnostics_log: Vec<String>,
    started_at: String,
    scroll_to_bottom: bool,
    theme: Theme,
}

impl GradusApp {
    pub fn new(
        rx: Receiver<AppEvent>,
        client: TutorClient,
        settings: Settings,
        startup_warnings: Vec<String>,
    ) -> Self {
        let mut app = Self {
            rx,
            client,
            controller: SessionController::new(),
            settings_draft: settings.clone(),
            settings,
            settings_open: false,
            input_buffer: String::new(),
            error_line: None,
            diagnostics_log: Vec::new(),
            started_at: Self::timestamp(),
            scroll_to_bottom: false,
            theme: Theme::default(),
        };

        for warning in startup_warnings {
            app.log_diagnostic(warning);
        }
        app.restore_persisted_session();
        app
    }

    pub fn apply_theme(&self, ctx: &egui::Context) {
        self.theme.apply_visuals(ctx);
    }

    fn timestamp() -> String {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(duration) => duration.as_secs().to_string(),
            Err(_) => "0".to_string(),
        }
    }

    fn log_diagnostic(&mut self, message: impl Into<String>) {
        self.diagnostics_log
            .push(format!("[{}] {}", Self::timestamp(), message.into()));
    }

    fn restore_persisted_session(&mut self) {
        let (transcript, warning) = store::load_transcript();
        if let Some(warning) = warning {
            self.log_diagnostic(format!("transcript load warning: {warning}"));
        }
        let (stage_state, warning) = store::load_stage_state();
        if let Some(warning) = warning {
            self.log_diagnostic(format!("stage state load warning: {warning}"));
        }

        if let Some(meta) = transcript {
            self.started_at = meta.started_at.clone();
            self.controller
                .restore(meta.messages, stage_state.map(|meta| meta.text));
        }
    }

    fn phase_label(&self) -> (&'static str, Color32) {
        match self.controller.phase() {
            Phase::Idle => ("No session", self.theme.text_muted),
            Phase::AwaitingReply => ("Waiting for tutor...", self.theme.warning),
            Phase::Active => ("Session active", self.theme.success),
        }
    }

    fn persist_transcript(&mut self) {
        let meta = TranscriptMeta {
            schema_version: SCHEMA_VERSION,
            started_at: self.started_at.clone(),
            messages: self.controller.messages().to_vec(),
        };
        if let Err(err) = store::save_transcript(&meta) {
            self.log_diagnostic(format!("failed to persist transcript: {err}"));
        }
    }

    fn persist_stage_state(&mut self) {
        let result = match self.controller.stage_state() {
            Some(text) => store::save_stage_state(&StageStateMeta {
                schema_version: SCHEMA_VERSION,
                text: text.to_string(),
            }),
            None => store::clear_stage_state(),
        };
        if let Err(err) = result {
            self.log_diagnostic(format!("failed to persist stage state: {err}"));
        }
    }

    fn drain_events(&mut self, ctx: &egui::Context) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => self.apply_event(event, ctx),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.log_diagnostic("event channel disconnected");
                    break;
                }
            }
        }
    }

    fn apply_event(&mut self, event: AppEvent, ctx: &egui::Context) {
        match event {
            AppEvent::ReplyReceived { epoch, text } => {
                if self.controller.apply_reply(epoch, &text) {
                    self.error_line = None;
                    self.persist_transcript();
                    self.persist_stage_state();
                    self.scroll_to_bottom = true;
                    ctx.request_repaint();
                } else {
                    self.log_diagnostic("discarded a reply from a previous session");
                }
            }
            AppEvent::CallFailed { epoch, message } => {
                if self.controller.apply_failure(epoch) {
                    self.log_diagnostic(format!("call failed: {message}"));
                    self.error_line = Some(message);
                    ctx.request_repaint();
                } else {
                    self.log_diagnostic("discarded a failure from a previous session");
                }
            }
        }
    }

    fn start_session(&mut self) {
        if let Err(message) = self.settings.validate() {
            self.error_line = Some(message);
            return;
        }
        if let Some(request) = self.controller.start(Instant::now()) {
            self.started_at = Self::timestamp();
            self.persist_transcript();
            self.client.send(&self.settings, request.epoch, request.messages);
            self.scroll_to_bottom = true;
        }
    }

    fn submit_input(&mut self) {
        let text = self.input_buffer.clone();
        if !self.controller.is_local_toggle(text.trim()) {
            if let Err(message) = self.settings.validate() {
                self.error_line = Some(message);
                return;
            }
        }

        match self.controller.submit(&text, Instant::now()) {
            SubmitOutcome::Rejected(_) => {}
            SubmitOutcome::ToggledLocally { .. } => {
                self.input_buffer.clear();
            }
            SubmitOutcome::Dispatch(request) => {
                self.persist_transcript();
                self.client.send(&self.settings, request.epoch, request.messages);
                self.input_buffer.clear();
                self.scroll_to_bottom = true;
            }
        }
    }

    fn reset_session(&mut self) {
        if !self.controller.reset(Instant::now()) {
            return;
        }
        if let Err(err) = store::clear_transcript() {
            self.log_diagnostic(format!("failed to clear transcript: {err}"));
        }
        if let Err(err) = store::clear_stage_state() {
            self.log_diagnostic(format!("failed to clear stage state: {err}"));
        }
        self.error_line = None;
        self.input_buffer.clear();
    }

    fn save_settings(&mut self) {
        self.settings = self.settings_draft.clone();
        if let Err(err) = store::save_settings(&self.settings) {
            self.log_diagnostic(format!("failed to persist settings: {err}"));
        }
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        let (phase_text, phase_color) = self.phase_label();
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.strong("Gradus");
                ui.separator();
                ui.label(RichText::new(phase_text).color(phase_color));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Settings").clicked() {
                        self.settings_draft = self.settings.clone();
                        self.settings_open = true;
                    }
                    if ui.button("Copy transcript").clicked() {
                        ctx.copy_text(transcript_markdown(self.controller.messages()));
                    }
                    if ui
                        .add_enabled(
                            self.controller.phase() != Phase::Idle,
                            egui::Button::new("Reset"),
                        )
                        .clicked()
                    {
                        self.reset_session();
                    }
                });
            });
        });
    }

    fn render_state_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("stage_state_panel")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| {
                ui.heading("Stage state");
                ui.separator();

                let progress = self.controller.progress();
                let current_text = progress
                    .current
                    .map(|stage| stage.to_string())
                    .unwrap_or_else(|| "-".to_string());
                ui.label(format!("Stage {current_text} / {}", progress.total));
                if let Some(current) = progress.current {
                    let fraction = current as f32 / progress.total.max(1) as f32;
                    ui.add(egui::ProgressBar::new(fraction).show_percentage());
                }
                ui.separator();

                match self.controller.stage_state() {
                    Some(state) if self.controller.state_visible() => {
                        self.theme.card_frame().show(ui, |ui| {
                            ScrollArea::vertical().id_salt("stage_state_text").show(ui, |ui| {
                                ui.monospace(state);
                            });
                        });
                    }
                    Some(_) => {
                        ui.label(
                            RichText::new(format!(
                                "Hidden. Send \"{}\" to reveal it.",
                                prompt::CMD_TOGGLE_STATE
                            ))
                            .color(self.theme.text_muted),
                        );
                    }
                    None => {
                        ui.label(
                            RichText::new("The tutor has not reported any state yet.")
                                .color(self.theme.text_muted),
                        );
                    }
                }
            });
    }

    fn render_center_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Tutoring session");
            ui.separator();

            let transcript_height = (ui.available_height() - 170.0).max(120.0);
            ScrollArea::vertical()
                .id_salt("chat_transcript")
                .max_height(transcript_height)
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    for message in self.controller.messages() {
                        let label = match message.role {
                            Role::System => continue,
                            Role::User => format!("[You] {}", message.content),
                            Role::Assistant => format!("[Tutor] {}", message.content),
                        };
                        ui.label(label);
                    }

                    if self.controller.phase() == Phase::AwaitingReply {
                        ui.label(
                            RichText::new("[Tutor] ...").color(self.theme.text_muted),
                        );
                    }

                    if self.scroll_to_bottom {
                        ui.scroll_to_cursor(Some(egui::Align::BOTTOM));
                    }
                });
            self.scroll_to_bottom = false;

            ui.separator();
            if let Some(error) = &self.error_line {
                ui.label(RichText::new(error).color(self.theme.danger));
            }

            egui::CollapsingHeader::new("Diagnostics")
                .default_open(false)
                .show(ui, |ui| {
                    ScrollArea::vertical()
                        .id_salt("diagnostics_log")
                        .max_height(90.0)
                        .stick_to_bottom(true)
                        .show(ui, |ui| {
                            for entry in &self.diagnostics_log {
                                ui.label(entry);
                            }
                        });
                });

            ui.separator();
            match self.controller.phase() {
                Phase::Idle => {
                    if ui.button("Start session").clicked() {
                        self.start_session();
                    }
                }
                phase => {
                    let input_enabled = phase == Phase::Active;
                    let hint = if input_enabled {
                        format!(
                            "Ask a question, or send \"{}\" / \"{}\"",
                            prompt::CMD_ADVANCE,
                            prompt::CMD_TOGGLE_STATE
                        )
                    } else {
                        "Waiting for the tutor...".to_string()
                    };

                    let mut send_now = false;
                    self.theme.composer_frame().show(ui, |ui| {
                        ui.horizontal(|ui| {
                            let response = ui.add_enabled(
                                input_enabled,
                                egui::TextEdit::singleline(&mut self.input_buffer)
                                    .desired_width(f32::INFINITY)
                                    .hint_text(hint),
                            );
                            if response.lost_focus()
                                && ui.input(|i| i.key_pressed(egui::Key::Enter))
                            {
                                send_now = true;
                            }

                            let clicked = ui
                                .add_enabled(
                                    input_enabled && !self.input_buffer.trim().is_empty(),
                                    egui::Button::new("Send"),
                                )
                                .clicked();
                            send_now |= clicked;
                        });
                    });

                    if send_now && input_enabled {
                        self.submit_input();
                    }
                }
            }
        });
    }

    fn render_settings_window(&mut self, ctx: &egui::Context) {
        if !self.settings_open {
            return;
        }

        let mut open = self.settings_open;
        let mut save_clicked = false;
        let mut copy_link_clicked = false;
        egui::Window::new("Settings")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                egui::Grid::new("settings_grid").num_columns(2).show(ui, |ui| {
                    ui.label("Base URL");
                    ui.text_edit_singleline(&mut self.settings_draft.base_url);
                    ui.end_row();

                    ui.label("Model");
                    ui.text_edit_singleline(&mut self.settings_draft.model);
                    ui.end_row();

                    ui.label("API key");
                    ui.add(
                        egui::TextEdit::singleline(&mut self.settings_draft.api_key)
                            .password(true),
                    );
                    ui.end_row();
                });

                ui.separator();
                ui.horizontal(|ui| {
                    save_clicked = ui.button("Save").clicked();
                    copy_link_clicked = ui.button("Copy setup link").clicked();
                });
            });
        self.settings_open = open;

        if save_clicked {
            self.save_settings();
            self.settings_open = false;
        }
        if copy_link_clicked {
            ctx.copy_text(link::encode_share_link(SHARE_PAGE_URL, &self.settings_draft));
        }
    }
}

impl eframe::App for GradusApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events(ctx);
        self.render_top_bar(ctx);
        self.render_state_panel(ctx);
        self.render_center_panel(ctx);
        self.render_settings_window(ctx);
    }
}
