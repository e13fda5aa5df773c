use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use iced::{keyboard, Color};
use printdash_core::{Error, PrinterState};

use super::types::{Message, Severity};

pub(crate) fn level_color(level: tracing::Level) -> Color {
    match level {
        tracing::Level::ERROR => Color::from_rgb8(0xe0, 0x4f, 0x4f),
        tracing::Level::WARN => Color::from_rgb8(0xe0, 0xb0, 0x4f),
        tracing::Level::INFO => Color::from_rgb8(0x3b, 0x82, 0xf6),
        tracing::Level::DEBUG => Color::from_rgb8(0x22, 0x7d, 0x64),
        tracing::Level::TRACE => Color::from_rgb8(0x6b, 0x72, 0x80),
    }
}

pub(crate) fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Info => Color::from_rgb8(0x3b, 0x82, 0xf6),
        Severity::Warning => Color::from_rgb8(0xe0, 0xb0, 0x4f),
        Severity::Error => Color::from_rgb8(0xe0, 0x4f, 0x4f),
    }
}

pub(crate) fn state_color(state: &PrinterState) -> Color {
    match state.as_str() {
        PrinterState::PRINTING => Color::from_rgb8(0x22, 0x7d, 0x64),
        PrinterState::PAUSED | PrinterState::STOPPED => Color::from_rgb8(0xe0, 0xb0, 0x4f),
        PrinterState::ERROR | PrinterState::OFFLINE => Color::from_rgb8(0xe0, 0x4f, 0x4f),
        _ => Color::from_rgb8(0x3a, 0x4a, 0x5a),
    }
}

pub(crate) fn error_severity(error: &Error) -> Severity {
    if error.is_fatal() {
        Severity::Error
    } else {
        Severity::Warning
    }
}

pub(crate) fn key_event(key: keyboard::Key, modifiers: keyboard::Modifiers) -> Option<Message> {
    if modifiers.control() || modifiers.alt() || modifiers.logo() {
        return None;
    }
    match key.as_ref() {
        keyboard::Key::Character("p") => Some(Message::TogglePause),
        keyboard::Key::Character("r") => Some(Message::RefreshNow),
        keyboard::Key::Character("s") => Some(Message::Screenshot),
        keyboard::Key::Character("q") => Some(Message::Quit),
        _ => None,
    }
}

pub(crate) fn screenshot_path(dir: &Path, at: DateTime<Local>) -> PathBuf {
    dir.join(format!("printdash_{}.png", at.format("%Y-%m-%dT%H_%M_%S")))
}

/// Writes RGBA pixels as PNG.
pub(crate) fn save_png(path: &Path, rgba: &[u8], width: u32, height: u32) -> Result<(), String> {
    let buffer = image::RgbaImage::from_raw(width, height, rgba.to_vec()).ok_or_else(|| {
        format!(
            "screenshot buffer of {} bytes does not match {width}x{height}",
            rgba.len()
        )
    })?;
    buffer
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|error| error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn bindings_map_to_messages() {
        let none = keyboard::Modifiers::empty();
        let press = |value: &str| key_event(keyboard::Key::Character(value.into()), none);
        assert!(matches!(press("p"), Some(Message::TogglePause)));
        assert!(matches!(press("r"), Some(Message::RefreshNow)));
        assert!(matches!(press("s"), Some(Message::Screenshot)));
        assert!(matches!(press("q"), Some(Message::Quit)));
        assert!(press("x").is_none());
        assert!(
            key_event(keyboard::Key::Character("q".into()), keyboard::Modifiers::CTRL).is_none()
        );
    }

    #[test]
    fn screenshot_name_is_timestamped() {
        let at = Local
            .with_ymd_and_hms(2024, 7, 3, 9, 46, 40)
            .single()
            .expect("local time");
        let path = screenshot_path(Path::new("."), at);
        assert_eq!(path, Path::new("./printdash_2024-07-03T09_46_40.png"));
    }

    #[test]
    fn png_rejects_short_buffer() {
        let error = save_png(Path::new("unused.png"), &[0; 3], 1, 1).expect_err("short buffer");
        assert!(error.contains("1x1"));
    }

    #[test]
    fn fatal_errors_are_red() {
        let fatal = Error::NotFound {
            resource: "printers/abc-***".to_string(),
        };
        assert_eq!(error_severity(&fatal), Severity::Error);
        let malformed = Error::malformed("current job", "missing start");
        assert_eq!(error_severity(&malformed), Severity::Warning);
    }
}
