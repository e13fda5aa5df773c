use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use iced::window;
use printdash_core::{
    ConnectClient, DashConfig, Error, Event, File, Job, PrinterId, PrinterSnapshot, RequestId,
};

use crate::logging::{LogLevel, LogStore, ReloadHandle};

pub(crate) const NOTIFICATION_TTL: Duration = Duration::from_secs(8);
pub(crate) const MAX_NOTIFICATIONS: usize = 5;
pub(crate) const LOG_TICK: Duration = Duration::from_millis(250);
pub(crate) const DIAGNOSTIC_LOG_LINES: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Dashboard,
    Files,
    History,
    Events,
    Log,
}

impl Tab {
    pub const ALL: [Tab; 5] = [Tab::Dashboard, Tab::Files, Tab::History, Tab::Events, Tab::Log];

    pub fn label(self) -> &'static str {
        match self {
            Tab::Dashboard => "Dashboard",
            Tab::Files => "Files",
            Tab::History => "History",
            Tab::Events => "Events",
            Tab::Log => "Log",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    FetchTick,
    AdaptTick,
    PrinterFetched {
        request_id: RequestId,
        result: Result<PrinterSnapshot, Error>,
    },
    JobsFetched(Result<Vec<Job>, Error>),
    FilesFetched(Result<Vec<File>, Error>),
    EventsFetched(Result<Vec<Event>, Error>),
    TogglePause,
    RefreshNow,
    Screenshot,
    ScreenshotCaptured(window::Screenshot),
    ScreenshotSaved(Result<PathBuf, String>),
    Quit,
    LogTick,
    LogLevelChanged(LogLevel),
    ToggleTarget(String, bool),
    CopyDiagnostics,
    SelectTab(Tab),
    DismissNotification(u64),
    OpenPreview(String),
}

pub struct Flags {
    pub log_store: LogStore,
    pub reload_handle: ReloadHandle,
    pub log_level: LogLevel,
    pub client: Arc<dyn ConnectClient>,
    pub printer: PrinterId,
    pub dash: DashConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub(crate) struct Notification {
    pub(crate) id: u64,
    pub(crate) severity: Severity,
    pub(crate) text: String,
    pub(crate) created: Instant,
}

impl Notification {
    pub(crate) fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created) >= NOTIFICATION_TTL
    }
}

/// Toast queue, newest last. Oldest entries fall off past the cap.
#[derive(Debug, Default)]
pub(crate) struct Notifications {
    next_id: u64,
    items: Vec<Notification>,
}

impl Notifications {
    pub(crate) fn push(&mut self, severity: Severity, text: impl Into<String>, now: Instant) -> u64 {
        self.next_id += 1;
        self.items.push(Notification {
            id: self.next_id,
            severity,
            text: text.into(),
            created: now,
        });
        if self.items.len() > MAX_NOTIFICATIONS {
            let overflow = self.items.len() - MAX_NOTIFICATIONS;
            self.items.drain(..overflow);
        }
        self.next_id
    }

    pub(crate) fn dismiss(&mut self, id: u64) {
        self.items.retain(|item| item.id != id);
    }

    pub(crate) fn prune(&mut self, now: Instant) {
        self.items.retain(|item| !item.is_expired(now));
    }

    pub(crate) fn items(&self) -> &[Notification] {
        &self.items
    }
}

/// Latest result of one of the history fetches.
#[derive(Debug, Clone)]
pub(crate) enum History<T> {
    Loading,
    Loaded(Vec<T>),
    Failed(Error),
}

impl<T> History<T> {
    pub(crate) fn items(&self) -> &[T] {
        match self {
            History::Loaded(items) => items,
            _ => &[],
        }
    }
}

impl<T> Default for History<T> {
    fn default() -> Self {
        History::Loading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifications_cap_and_expire() {
        let start = Instant::now();
        let mut notifications = Notifications::default();
        for index in 0..7 {
            notifications.push(Severity::Info, format!("note {index}"), start);
        }
        assert_eq!(notifications.items().len(), MAX_NOTIFICATIONS);
        assert_eq!(notifications.items()[0].text, "note 2");

        let last = notifications.push(Severity::Warning, "late", start + Duration::from_secs(5));
        notifications.prune(start + NOTIFICATION_TTL);
        assert_eq!(notifications.items().len(), 1);

        notifications.dismiss(last);
        assert!(notifications.items().is_empty());
    }

    #[test]
    fn history_items_only_when_loaded() {
        let loading: History<u32> = History::default();
        assert!(loading.items().is_empty());
        let loaded = History::Loaded(vec![1, 2]);
        assert_eq!(loaded.items(), &[1, 2]);
    }
}
