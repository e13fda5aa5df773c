mod actions;
mod helpers;
mod styles;
mod types;
mod views;

use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Local};
use iced::{keyboard, window};
use iced::{Application, Command, Element, Subscription, Theme};

use printdash_core::{
    targets, AdaptDecision, ConnectClient, DashConfig, Error, Event, File, Job, PrinterId,
    RefreshScheduler, RunState, TickDecision,
};

use crate::logging::{apply_log_level, LogEntry, LogLevel, LogStore, ReloadHandle};
use helpers::{error_severity, key_event, save_png, screenshot_path};
use types::{History, Notifications, Severity, LOG_TICK};

pub use types::{Flags, Message, Tab};

pub struct PrintDashApp {
    client: Arc<dyn ConnectClient>,
    printer: PrinterId,
    dash: DashConfig,
    scheduler: RefreshScheduler,
    last_error: Option<Error>,
    last_updated: Option<DateTime<Local>>,
    jobs: History<Job>,
    files: History<File>,
    events: History<Event>,
    notifications: Notifications,
    active_tab: Tab,
    log_store: LogStore,
    reload_handle: ReloadHandle,
    log_entries: Vec<LogEntry>,
    log_level: LogLevel,
    known_targets: BTreeSet<String>,
    enabled_targets: HashSet<String>,
    copy_status: Option<String>,
}

impl Application for PrintDashApp {
    type Executor = crate::executor::StackSizedTokioExecutor;
    type Message = Message;
    type Theme = Theme;
    type Flags = Flags;

    fn new(flags: Flags) -> (Self, Command<Message>) {
        let known_targets: BTreeSet<String> =
            targets::ALL.iter().map(|value| value.to_string()).collect();
        let enabled_targets = known_targets.iter().cloned().collect();
        let mut scheduler = RefreshScheduler::new(flags.dash.intervals());
        let first_request = scheduler.start();

        let mut app = Self {
            client: flags.client,
            printer: flags.printer,
            dash: flags.dash,
            scheduler,
            last_error: None,
            last_updated: None,
            jobs: History::default(),
            files: History::default(),
            events: History::default(),
            notifications: Notifications::default(),
            active_tab: Tab::Dashboard,
            log_store: flags.log_store,
            reload_handle: flags.reload_handle,
            log_entries: Vec::new(),
            log_level: flags.log_level,
            known_targets,
            enabled_targets,
            copy_status: None,
        };
        app.refresh_logs();

        let command = Command::batch([app.fetch_printer(first_request), app.fetch_history()]);
        (app, command)
    }

    fn title(&self) -> String {
        match self.scheduler.snapshot() {
            Some(snapshot) => format!("printdash - {}", snapshot.display_name()),
            None => format!("printdash - {}", self.printer),
        }
    }

    fn update(&mut self, message: Message) -> Command<Message> {
        match message {
            Message::FetchTick => match self.scheduler.on_tick() {
                TickDecision::Fetch(request_id) => self.fetch_printer(request_id),
                TickDecision::Skip(_) => Command::none(),
            },
            Message::AdaptTick => {
                if let AdaptDecision::Rescheduled(change) = self.scheduler.on_adapt_check() {
                    self.notify(
                        Severity::Info,
                        format!("Refreshing every {}s", change.to.as_secs()),
                    );
                }
                Command::none()
            }
            Message::PrinterFetched { request_id, result } => {
                self.on_printer_fetched(request_id, result)
            }
            Message::JobsFetched(result) => {
                self.jobs = self.history_result("jobs", result);
                Command::none()
            }
            Message::FilesFetched(result) => {
                self.files = self.history_result("files", result);
                Command::none()
            }
            Message::EventsFetched(result) => {
                self.events = self.history_result("events", result);
                Command::none()
            }
            Message::TogglePause => {
                match self.scheduler.toggle_pause() {
                    RunState::Paused => self.notify(Severity::Info, "Refresh paused"),
                    RunState::Active => self.notify(Severity::Info, "Refresh resumed"),
                    RunState::Idle => {}
                }
                Command::none()
            }
            Message::RefreshNow => {
                let request_id = self.scheduler.refresh_now();
                Command::batch([self.fetch_printer(request_id), self.fetch_history()])
            }
            Message::Screenshot => {
                tracing::debug!(target: targets::UI, "Screenshot requested");
                window::screenshot(window::Id::MAIN, Message::ScreenshotCaptured)
            }
            Message::ScreenshotCaptured(screenshot) => {
                let path = screenshot_path(Path::new("."), Local::now());
                Command::perform(
                    async move {
                        save_png(
                            &path,
                            &screenshot.bytes,
                            screenshot.size.width,
                            screenshot.size.height,
                        )
                        .map(|()| path)
                    },
                    Message::ScreenshotSaved,
                )
            }
            Message::ScreenshotSaved(result) => {
                match result {
                    Ok(path) => {
                        tracing::info!(target: targets::UI, path = %path.display(), "Screenshot saved");
                        self.notify(
                            Severity::Info,
                            format!("Screenshot saved to {}", path.display()),
                        );
                    }
                    Err(error) => {
                        tracing::warn!(target: targets::UI, %error, "Screenshot failed");
                        self.notify(Severity::Warning, format!("Screenshot failed: {error}"));
                    }
                }
                Command::none()
            }
            Message::Quit => {
                tracing::info!(target: targets::UI, "Quit requested");
                window::close(window::Id::MAIN)
            }
            Message::LogTick => {
                self.refresh_logs();
                self.notifications.prune(Instant::now());
                Command::none()
            }
            Message::LogLevelChanged(level) => {
                self.log_level = level;
                apply_log_level(&self.reload_handle, level);
                tracing::info!(target: targets::UI, "Log level set to {}", level);
                Command::none()
            }
            Message::ToggleTarget(target, enabled) => {
                if enabled {
                    self.enabled_targets.insert(target);
                } else {
                    self.enabled_targets.remove(&target);
                }
                Command::none()
            }
            Message::CopyDiagnostics => {
                self.copy_status = Some(self.copy_diagnostics());
                Command::none()
            }
            Message::SelectTab(tab) => {
                self.active_tab = tab;
                Command::none()
            }
            Message::DismissNotification(id) => {
                self.notifications.dismiss(id);
                Command::none()
            }
            Message::OpenPreview(path) => {
                self.open_preview(&path);
                Command::none()
            }
        }
    }

    fn subscription(&self) -> Subscription<Message> {
        let log_tick = iced::time::every(LOG_TICK).map(|_| Message::LogTick);
        let adapt_tick =
            iced::time::every(self.scheduler.intervals().adapt).map(|_| Message::AdaptTick);
        let keys = keyboard::on_key_press(key_event);
        let mut subscriptions = vec![log_tick, adapt_tick, keys];

        // Dropping and re-adding the timer restarts it from a full interval.
        if let Some(interval) = self.scheduler.fetch_timer() {
            subscriptions.push(iced::time::every(interval).map(|_| Message::FetchTick));
        }

        Subscription::batch(subscriptions)
    }

    fn view(&self) -> Element<'_, Message> {
        self.root_view()
    }
}

impl PrintDashApp {
    fn notify(&mut self, severity: Severity, text: impl Into<String>) {
        self.notifications.push(severity, text, Instant::now());
    }

    fn history_result<T>(&mut self, label: &str, result: Result<Vec<T>, Error>) -> History<T> {
        match result {
            Ok(items) => {
                tracing::debug!(target: targets::UI, kind = label, count = items.len(), "History loaded");
                History::Loaded(items)
            }
            Err(error) => {
                tracing::warn!(
                    target: targets::UI,
                    kind = label,
                    error = %error.technical_detail(),
                    "History fetch failed"
                );
                self.notify(error_severity(&error), error.user_summary());
                History::Failed(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use printdash_core::{MockConnectClient, PrinterSnapshot, RequestId};
    use serde_json::json;
    use tracing_subscriber::{reload, EnvFilter};

    fn snapshot(state: &str) -> PrinterSnapshot {
        let mut value = json!({"uuid": "abc-123", "printer_state": state, "name": "XL"});
        if state == "PRINTING" {
            value["job_info"] = json!({
                "display_name": "part.gcode",
                "progress": 10.0,
                "time_printing": 60,
                "time_remaining": 600,
                "start": 1_720_000_000
            });
        }
        PrinterSnapshot::from_value("printers/abc-***", value).expect("snapshot")
    }

    fn app() -> PrintDashApp {
        let (_layer, reload_handle) = reload::Layer::new(EnvFilter::default());
        let flags = Flags {
            log_store: LogStore::new(16),
            reload_handle,
            log_level: LogLevel::Info,
            client: Arc::new(MockConnectClient::new()),
            printer: PrinterId::new("abc-123"),
            dash: DashConfig::default(),
        };
        PrintDashApp::new(flags).0
    }

    fn deliver(
        app: &mut PrintDashApp,
        request_id: RequestId,
        result: Result<PrinterSnapshot, Error>,
    ) {
        let _ = app.update(Message::PrinterFetched { request_id, result });
    }

    #[test]
    fn first_fetch_is_issued_on_start() {
        let app = app();
        assert_eq!(app.scheduler.run_state(), RunState::Active);
        assert_eq!(app.scheduler.in_flight(), 1);
        assert!(app.scheduler.fetch_timer().is_some());
    }

    #[test]
    fn state_change_is_announced() {
        let mut app = app();
        let idle = app.scheduler.refresh_now();
        deliver(&mut app, idle, Ok(snapshot("IDLE")));
        let printing = app.scheduler.refresh_now();
        deliver(&mut app, printing, Ok(snapshot("PRINTING")));

        let texts: Vec<&str> = app
            .notifications
            .items()
            .iter()
            .map(|item| item.text.as_str())
            .collect();
        assert!(texts.contains(&"Printer state changed: IDLE -> PRINTING"));
    }

    #[test]
    fn not_found_keeps_snapshot_and_stops_timer() {
        let mut app = app();
        let idle = app.scheduler.refresh_now();
        deliver(&mut app, idle, Ok(snapshot("IDLE")));
        let missing = app.scheduler.refresh_now();
        deliver(
            &mut app,
            missing,
            Err(Error::NotFound {
                resource: "printers/abc-***".to_string(),
            }),
        );

        assert!(app.scheduler.snapshot().is_some());
        assert!(app.scheduler.fetch_timer().is_none());
        assert!(matches!(app.last_error, Some(Error::NotFound { .. })));
    }

    #[test]
    fn pause_toggle_notifies() {
        let mut app = app();
        let _ = app.update(Message::TogglePause);
        assert!(app.scheduler.is_paused());
        assert!(app.scheduler.fetch_timer().is_none());
        let _ = app.update(Message::TogglePause);
        assert!(!app.scheduler.is_paused());
        assert_eq!(app.notifications.items().len(), 2);
    }
}
