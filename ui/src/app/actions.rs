use std::sync::Arc;

use chrono::Local;
use iced::Command;
use printdash_core::{targets, Error, FetchOutcome, PrinterSnapshot, RequestId};

use super::helpers::error_severity;
use super::types::{Message, Severity, DIAGNOSTIC_LOG_LINES};
use super::PrintDashApp;
use crate::logging::LogEntry;

impl PrintDashApp {
    pub(super) fn fetch_printer(&self, request_id: RequestId) -> Command<Message> {
        let client = Arc::clone(&self.client);
        let printer = self.printer.clone();
        Command::perform(
            async move { client.fetch_printer(&printer).await },
            move |result| Message::PrinterFetched { request_id, result },
        )
    }

    /// Jobs, files and events. Refreshed on start, on a state change and on
    /// manual refresh rather than every tick.
    pub(super) fn fetch_history(&self) -> Command<Message> {
        let jobs = {
            let client = Arc::clone(&self.client);
            let limit = self.dash.jobs_limit;
            Command::perform(
                async move { client.fetch_jobs(limit, 0).await },
                Message::JobsFetched,
            )
        };
        let files = {
            let client = Arc::clone(&self.client);
            let printer = self.printer.clone();
            let limit = self.dash.files_limit;
            Command::perform(
                async move { client.fetch_files(&printer, limit).await },
                Message::FilesFetched,
            )
        };
        let events = {
            let client = Arc::clone(&self.client);
            let printer = self.printer.clone();
            let limit = self.dash.events_limit;
            Command::perform(
                async move { client.fetch_events(&printer, limit).await },
                Message::EventsFetched,
            )
        };
        Command::batch([jobs, files, events])
    }

    pub(super) fn on_printer_fetched(
        &mut self,
        request_id: RequestId,
        result: Result<PrinterSnapshot, Error>,
    ) -> Command<Message> {
        match self.scheduler.complete(request_id, result) {
            FetchOutcome::Applied { changes, first, .. } => {
                self.last_updated = Some(Local::now());
                self.last_error = None;
                let state_changed = changes.state_change().is_some();
                for change in changes {
                    tracing::info!(target: targets::UI, "{}", change);
                    self.notify(Severity::Info, change.to_string());
                }
                if first || state_changed {
                    self.fetch_history()
                } else {
                    Command::none()
                }
            }
            FetchOutcome::Stale { .. } => Command::none(),
            FetchOutcome::Failed { error, .. } => {
                let mut summary = error.user_summary();
                if error.is_fatal() {
                    summary.push_str(". Scheduled refresh stopped, press r to retry");
                }
                self.notify(error_severity(&error), summary);
                self.last_error = Some(error);
                Command::none()
            }
        }
    }

    pub(super) fn open_preview(&mut self, path: &str) {
        let Some(url) = self.client.preview_url(path) else {
            self.notify(Severity::Warning, "No preview available");
            return;
        };
        match open::that(&url) {
            Ok(()) => {
                tracing::info!(target: targets::UI, "Opened preview in browser");
                self.notify(Severity::Info, "Browser opened");
            }
            Err(error) => {
                tracing::warn!(target: targets::UI, %error, "Failed to open browser");
                self.notify(Severity::Warning, format!("Could not open browser: {url}"));
            }
        }
    }

    pub(super) fn refresh_logs(&mut self) {
        let entries = self.log_store.snapshot();
        for entry in &entries {
            if self.known_targets.insert(entry.target.clone()) {
                self.enabled_targets.insert(entry.target.clone());
            }
        }
        self.log_entries = entries;
    }

    pub(super) fn visible_entries(&self) -> Vec<&LogEntry> {
        self.log_entries
            .iter()
            .filter(|entry| self.enabled_targets.contains(&entry.target))
            .collect()
    }

    pub(super) fn copy_diagnostics(&self) -> String {
        let text = self.diagnostics_text();
        match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text)) {
            Ok(()) => {
                tracing::info!(target: targets::UI, "Diagnostics copied to clipboard");
                "Copied".to_string()
            }
            Err(error) => {
                tracing::warn!(target: targets::UI, "Clipboard copy failed: {}", error);
                format!("Failed: {error}")
            }
        }
    }

    pub(super) fn diagnostics_text(&self) -> String {
        let mut output = String::new();
        output.push_str("printdash diagnostics\n");
        output.push_str(&format!("Printer: {}\n", self.printer));
        output.push_str(&format!("Log level: {}\n", self.log_level));
        output.push_str(&format!(
            "Refresh: {} every {}s\n",
            self.scheduler.run_state(),
            self.scheduler.interval_seconds()
        ));
        match self.scheduler.snapshot() {
            Some(snapshot) => output.push_str(&format!("State: {}\n", snapshot.printer_state)),
            None => output.push_str("State: no snapshot yet\n"),
        }
        if let Some(updated) = self.last_updated {
            output.push_str(&format!("Last update: {}\n", updated.format("%Y-%m-%d %H:%M:%S")));
        }
        if let Some(halted) = self.scheduler.halted() {
            output.push_str(&format!("Halted: {}\n", halted.technical_detail()));
        }
        if let Some(error) = &self.last_error {
            output.push_str(&format!("Last error: {}\n", error.technical_detail()));
        }
        output.push_str(&format!(
            "Targets enabled: {}\n",
            self.known_targets
                .iter()
                .filter(|target| self.enabled_targets.contains(*target))
                .cloned()
                .collect::<Vec<String>>()
                .join(", ")
        ));
        output.push_str("Recent logs:\n");

        let entries = self.visible_entries();
        let start = entries.len().saturating_sub(DIAGNOSTIC_LOG_LINES);
        for entry in entries.into_iter().skip(start) {
            output.push_str(&entry.format_line());
            output.push('\n');
        }

        output
    }
}
