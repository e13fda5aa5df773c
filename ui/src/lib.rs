pub mod app;
mod executor;
pub mod logging;

use iced::{window, Application, Size};

pub use app::{Flags, Message, PrintDashApp, Tab};
pub use logging::{
    apply_log_level, init_logging, LogEntry, LogLevel, LogStore, ReloadHandle,
    DEFAULT_LOG_CAPACITY,
};

pub type UiResult = iced::Result;

pub fn run(flags: Flags) -> UiResult {
    PrintDashApp::run(iced::Settings {
        window: window::Settings {
            size: Size::new(1280.0, 860.0),
            ..window::Settings::default()
        },
        ..iced::Settings::with_flags(flags)
    })
}
