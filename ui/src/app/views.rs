use iced::alignment::Horizontal;
use iced::theme;
use iced::widget::{
    button, checkbox, column, container, pick_list, progress_bar, row, scrollable, text, Space,
};
use iced::{Alignment, Color, Element, Length};

use printdash_core::{
    current_job_file, tool_rows, CurrentJobPanel, EventRow, Field, FileCard, HeaderPanel,
    JobCard, PrinterSnapshot, PrinterState, Progress, RunState,
};

use super::helpers::{level_color, severity_color, state_color};
use super::styles::{CardButtonStyle, TabStyle, ToastStyle, ToolRowStyle};
use super::types::{History, Message, Tab};
use super::PrintDashApp;
use crate::logging::LogLevel;

const TITLE: Color = rgb(0x10, 0x1a, 0x24);
const MUTED: Color = rgb(0x5f, 0x6b, 0x7a);
const WARNING: Color = rgb(0xe0, 0xb0, 0x4f);
const TOOL_CELL: f32 = 130.0;

impl PrintDashApp {
    pub(super) fn root_view(&self) -> Element<'_, Message> {
        let header = row![
            text("printdash").size(28).style(theme::Text::Color(TITLE)),
            text(self.status_line())
                .size(16)
                .style(theme::Text::Color(MUTED)),
        ]
        .spacing(12)
        .align_items(Alignment::Center);

        let body = match self.active_tab {
            Tab::Dashboard => self.dashboard_view(),
            Tab::Files => self.files_view(),
            Tab::History => self.jobs_view(),
            Tab::Events => self.events_view(),
            Tab::Log => self.log_tab_view(),
        };

        let content = column![header, self.notifications_view(), self.tab_bar(), body]
            .spacing(16)
            .padding(16);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn status_line(&self) -> String {
        let state = self
            .scheduler
            .snapshot()
            .map(|snapshot| snapshot.printer_state.to_string())
            .unwrap_or_else(|| "waiting".to_string());
        let refresh = if self.scheduler.halted().is_some() {
            "refresh halted".to_string()
        } else if self.scheduler.run_state() == RunState::Paused {
            "refresh paused (p to resume)".to_string()
        } else {
            format!("refresh every {}s", self.scheduler.interval_seconds())
        };
        let updated = self
            .last_updated
            .map(|at| format!("updated {}", at.format("%H:%M:%S")))
            .unwrap_or_else(|| "not updated yet".to_string());
        format!("{state} · {refresh} · {updated}")
    }

    fn notifications_view(&self) -> Element<'_, Message> {
        let mut toasts = column![].spacing(6);
        for notification in self.notifications.items() {
            let accent = severity_color(notification.severity);
            let toast = row![
                text(&notification.text)
                    .size(14)
                    .style(theme::Text::Color(accent)),
                Space::with_width(Length::Fill),
                button(text("x").size(12))
                    .style(theme::Button::Text)
                    .on_press(Message::DismissNotification(notification.id)),
            ]
            .spacing(8)
            .align_items(Alignment::Center);
            toasts = toasts.push(
                container(toast)
                    .padding([4, 10])
                    .width(Length::Fill)
                    .style(theme::Container::Custom(Box::new(ToastStyle { accent }))),
            );
        }
        toasts.into()
    }

    fn tab_bar(&self) -> Element<'_, Message> {
        let mut tabs = row![].spacing(4).align_items(Alignment::Center);
        for tab in Tab::ALL {
            tabs = tabs.push(
                button(text(tab.label()))
                    .style(theme::Button::custom(TabStyle {
                        active: self.active_tab == tab,
                    }))
                    .on_press(Message::SelectTab(tab)),
            );
        }
        tabs.into()
    }

    fn dashboard_view(&self) -> Element<'_, Message> {
        let Some(snapshot) = self.scheduler.snapshot() else {
            let waiting = match &self.last_error {
                Some(error) => error.user_summary(),
                None => "Waiting for the first printer snapshot...".to_string(),
            };
            return text(waiting)
                .size(16)
                .style(theme::Text::Color(MUTED))
                .into();
        };

        let content = column![
            self.printer_header_view(snapshot),
            section("Tools", self.tools_view(snapshot)),
            section("Currently printing", self.current_job_view(snapshot)),
        ]
        .spacing(16);

        scrollable(content).height(Length::Fill).into()
    }

    fn printer_header_view(&self, snapshot: &PrinterSnapshot) -> Element<'_, Message> {
        let panel = HeaderPanel::from_snapshot(snapshot);
        let mut title = row![
            text(&panel.title).size(22).style(theme::Text::Color(TITLE)),
            text(&panel.state)
                .size(18)
                .style(theme::Text::Color(state_color(&snapshot.printer_state))),
        ]
        .spacing(12)
        .align_items(Alignment::Center);
        if let Some(reason) = &panel.state_reason {
            title = title.push(text(reason).size(14).style(theme::Text::Color(MUTED)));
        }

        let mut columns = row![].spacing(24);
        for fields in &panel.columns {
            let mut lines = column![].spacing(4);
            for field in fields {
                lines = lines.push(field_line(field));
            }
            columns = columns.push(lines.width(Length::FillPortion(1)));
        }

        container(column![title, columns].spacing(10))
            .padding(12)
            .width(Length::Fill)
            .style(theme::Container::Box)
            .into()
    }

    fn tools_view(&self, snapshot: &PrinterSnapshot) -> Element<'_, Message> {
        let rows = tool_rows(snapshot);
        if rows.is_empty() {
            return muted("No tool information reported");
        }

        let mut list = column![].spacing(2);
        for tool in rows {
            let mut cells = row![].spacing(8);
            for field in &tool.fields {
                cells = cells.push(
                    column![
                        text(&field.label).size(12).style(theme::Text::Color(MUTED)),
                        text(&field.value).size(14),
                    ]
                    .width(Length::Fixed(TOOL_CELL)),
                );
            }
            list = list.push(
                container(cells)
                    .padding([4, 8])
                    .width(Length::Fill)
                    .style(theme::Container::Custom(Box::new(ToolRowStyle {
                        active: tool.active,
                    }))),
            );
        }
        list.into()
    }

    fn current_job_view(&self, snapshot: &PrinterSnapshot) -> Element<'_, Message> {
        let file = current_job_file(snapshot, self.jobs.items());
        let panel = match CurrentJobPanel::build(snapshot, file) {
            Ok(Some(panel)) => panel,
            Ok(None) => return muted("Nothing is printing"),
            Err(error) => {
                return text(format!("Job details unavailable: {}", error.user_summary()))
                    .size(14)
                    .style(theme::Text::Color(WARNING))
                    .into();
            }
        };

        let mut bars = column![
            row![
                text(&panel.display_name).size(18),
                Space::with_width(Length::Fill),
                text(format!("{:.1}%  {}", panel.progress_percent, panel.eta_label())).size(14),
            ]
            .align_items(Alignment::Center),
            progress_bar(0.0..=1.0, panel.progress_fraction()).height(Length::Fixed(12.0)),
        ]
        .spacing(6);
        if let Some(weight) = panel.weight {
            bars = bars.push(labelled_bar("Weight", weight));
        }
        if let Some(height) = panel.height {
            bars = bars.push(labelled_bar("Height", height));
        }

        let mut timing = column![].spacing(4);
        for field in &panel.timing {
            timing = timing.push(field_line(field));
        }
        let mut details = column![].spacing(4);
        for field in &panel.file_details {
            details = details.push(field_line(field));
        }

        column![
            bars,
            row![
                timing.width(Length::FillPortion(1)),
                details.width(Length::FillPortion(1))
            ]
            .spacing(24),
        ]
        .spacing(12)
        .into()
    }

    fn files_view(&self) -> Element<'_, Message> {
        if let Some(status) = history_status(&self.files, "No files uploaded") {
            return status;
        }

        let mut cards = column![].spacing(8);
        for file in self.files.items() {
            let card = FileCard::from_file(file);
            let badge = if card.firmware { "firmware" } else { "print file" };
            cards = cards.push(card_button(
                &card.title,
                badge,
                MUTED,
                &card.fields,
                card.preview_path.clone(),
            ));
        }
        scrollable(cards).height(Length::Fill).into()
    }

    fn jobs_view(&self) -> Element<'_, Message> {
        if let Some(status) = history_status(&self.jobs, "No print history") {
            return status;
        }

        let mut cards = column![].spacing(8);
        for job in self.jobs.items() {
            let card = JobCard::from_job(job);
            let color = state_color(&PrinterState::new(card.state.clone()));
            cards = cards.push(card_button(
                &card.title,
                &card.state,
                color,
                &card.fields,
                card.preview_path.clone(),
            ));
        }
        scrollable(cards).height(Length::Fill).into()
    }

    fn events_view(&self) -> Element<'_, Message> {
        if let Some(status) = history_status(&self.events, "No events recorded") {
            return status;
        }

        let mut lines = column![].spacing(4);
        for event in self.events.items() {
            let row_model = EventRow::from_event(event);
            lines = lines.push(
                row![
                    text(row_model.created)
                        .size(14)
                        .style(theme::Text::Color(MUTED))
                        .width(Length::Fixed(170.0)),
                    text(row_model.event).size(14).width(Length::Fixed(240.0)),
                    text(row_model.source).size(14).style(theme::Text::Color(MUTED)),
                ]
                .spacing(8),
            );
        }
        scrollable(lines).height(Length::Fill).into()
    }

    fn log_tab_view(&self) -> Element<'_, Message> {
        let level_picker = pick_list(
            &LogLevel::ALL[..],
            Some(self.log_level),
            Message::LogLevelChanged,
        )
        .placeholder("Log level");

        let console_header = row![
            text("Console").size(20).style(theme::Text::Color(TITLE)),
            level_picker
        ]
        .spacing(12)
        .align_items(Alignment::Center);

        let console = column![console_header, self.target_filters_view(), self.log_lines_view()]
            .spacing(12)
            .width(Length::FillPortion(2));

        row![console, self.diagnostics_panel_view()]
            .spacing(16)
            .align_items(Alignment::Start)
            .into()
    }

    fn target_filters_view(&self) -> Element<'_, Message> {
        let mut filters = row![text("Targets").size(14).style(theme::Text::Color(MUTED))]
            .spacing(12)
            .align_items(Alignment::Center);

        for target in &self.known_targets {
            let enabled = self.enabled_targets.contains(target);
            let target = target.clone();
            filters = filters.push(
                checkbox(target.clone(), enabled)
                    .on_toggle(move |value| Message::ToggleTarget(target.clone(), value)),
            );
        }

        container(filters)
            .padding(8)
            .style(theme::Container::Box)
            .into()
    }

    fn log_lines_view(&self) -> Element<'_, Message> {
        let mut lines = column![].spacing(4);

        for entry in self.visible_entries() {
            lines = lines.push(
                text(entry.format_line())
                    .size(13)
                    .horizontal_alignment(Horizontal::Left)
                    .style(theme::Text::Color(level_color(entry.level))),
            );
        }

        scrollable(lines)
            .height(Length::Fill)
            .width(Length::Fill)
            .into()
    }

    fn diagnostics_panel_view(&self) -> Element<'_, Message> {
        let copy_status = self.copy_status.as_deref().unwrap_or("Ready");
        let halted = self
            .scheduler
            .halted()
            .map(|error| error.user_summary())
            .unwrap_or_else(|| "no".to_string());
        let last_error = self
            .last_error
            .as_ref()
            .map(|error| error.technical_detail())
            .unwrap_or_else(|| "none".to_string());

        let panel = column![
            text("Diagnostics").size(20).style(theme::Text::Color(TITLE)),
            muted(format!("Printer: {}", self.printer)),
            muted(format!("Refresh state: {}", self.scheduler.run_state())),
            muted(format!("Interval: {}s", self.scheduler.interval_seconds())),
            muted(format!("Requests in flight: {}", self.scheduler.in_flight())),
            muted(format!("Halted: {halted}")),
            muted(format!("Last error: {last_error}")),
            button("Copy diagnostics").on_press(Message::CopyDiagnostics),
            text(format!("Clipboard: {copy_status}"))
                .size(12)
                .style(theme::Text::Color(MUTED)),
        ]
        .spacing(10);

        container(panel)
            .padding(12)
            .width(Length::FillPortion(1))
            .style(theme::Container::Box)
            .into()
    }
}

const fn rgb(r: u8, g: u8, b: u8) -> Color {
    Color {
        r: r as f32 / 255.0,
        g: g as f32 / 255.0,
        b: b as f32 / 255.0,
        a: 1.0,
    }
}

fn muted<'a>(value: impl ToString) -> Element<'a, Message> {
    text(value.to_string())
        .size(14)
        .style(theme::Text::Color(MUTED))
        .into()
}

fn section<'a>(title: &str, body: Element<'a, Message>) -> Element<'a, Message> {
    container(
        column![
            text(title.to_string()).size(18).style(theme::Text::Color(TITLE)),
            body
        ]
        .spacing(8),
    )
    .padding(12)
    .width(Length::Fill)
    .style(theme::Container::Box)
    .into()
}

fn field_line<'a>(field: &Field) -> Element<'a, Message> {
    row![
        text(format!("{}:", field.label))
            .size(14)
            .style(theme::Text::Color(MUTED)),
        text(field.value.clone()).size(14),
    ]
    .spacing(6)
    .into()
}

fn labelled_bar<'a>(label: &str, progress: Progress) -> Element<'a, Message> {
    row![
        text(label.to_string())
            .size(13)
            .width(Length::Fixed(60.0))
            .style(theme::Text::Color(MUTED)),
        progress_bar(0.0..=1.0, progress.fraction()).height(Length::Fixed(8.0)),
    ]
    .spacing(8)
    .align_items(Alignment::Center)
    .into()
}

fn history_status<'a, T>(history: &History<T>, empty: &str) -> Option<Element<'a, Message>> {
    match history {
        History::Loading => Some(muted("Loading...")),
        History::Failed(error) => Some(
            text(error.user_summary())
                .size(14)
                .style(theme::Text::Color(WARNING))
                .into(),
        ),
        History::Loaded(items) if items.is_empty() => Some(muted(empty)),
        History::Loaded(_) => None,
    }
}

fn card_button<'a>(
    title: &str,
    badge: &str,
    badge_color: Color,
    fields: &[Field],
    preview_path: Option<String>,
) -> Element<'a, Message> {
    let mut grid = row![].spacing(16);
    for field in fields {
        grid = grid.push(
            column![
                text(field.label.clone()).size(12).style(theme::Text::Color(MUTED)),
                text(field.value.clone()).size(14),
            ]
            .width(Length::FillPortion(1)),
        );
    }

    let content = column![
        row![
            text(title.to_string()).size(16).style(theme::Text::Color(WARNING)),
            text(badge.to_string())
                .size(14)
                .style(theme::Text::Color(badge_color)),
        ]
        .spacing(12),
        grid,
    ]
    .spacing(6);

    let mut card = button(content)
        .width(Length::Fill)
        .padding(10)
        .style(theme::Button::custom(CardButtonStyle));
    if let Some(path) = preview_path {
        card = card.on_press(Message::OpenPreview(path));
    }
    card.into()
}
