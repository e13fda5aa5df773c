use crate::format::{
    format_duration, format_epoch, format_number, format_pair, format_size, nicer_label,
    number_or_missing, or_missing, MISSING,
};
use crate::model::{Event, File, FileKind, FileMeta, Job, JobInfo, PrinterSnapshot, Reading};
use crate::Error;

pub const CURRENT_JOB_RESOURCE: &str = "current job";

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub label: String,
    pub value: String,
}

impl Field {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderPanel {
    pub title: String,
    pub state: String,
    pub state_reason: Option<String>,
    pub columns: Vec<Vec<Field>>,
}

impl HeaderPanel {
    pub fn from_snapshot(snapshot: &PrinterSnapshot) -> Self {
        let tool = format!(
            "{}/{}",
            or_missing(snapshot.active_tool()),
            snapshot.slot_count()
        );
        let reading = |reading: Reading| format_pair(reading.current, reading.target);
        let columns = vec![
            vec![
                Field::new("State", snapshot.printer_state.as_str()),
                Field::new("Location", or_missing(snapshot.location.as_deref())),
                Field::new("Firmware", or_missing(snapshot.firmware.as_deref())),
            ],
            vec![
                Field::new("Material", or_missing(snapshot.material())),
                Field::new(
                    "Nozzle diameter",
                    number_or_missing(snapshot.nozzle_diameter),
                ),
                Field::new("Active tool", tool),
            ],
            vec![
                Field::new("Nozzle temp", reading(snapshot.temp.nozzle())),
                Field::new("Bed temp", reading(snapshot.temp.bed())),
                Field::new(
                    "Current z",
                    snapshot
                        .axis_z
                        .map(|z| format!("{z:.2} mm"))
                        .unwrap_or_else(|| MISSING.to_string()),
                ),
            ],
            vec![Field::new("Speed", format!("{}%", snapshot.speed_percent()))],
        ];

        Self {
            title: snapshot.display_name(),
            state: snapshot.printer_state.to_string(),
            state_reason: snapshot.state_reason.clone(),
            columns,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolRow {
    pub id: u32,
    pub active: bool,
    pub fields: Vec<Field>,
}

pub fn tool_rows(snapshot: &PrinterSnapshot) -> Vec<ToolRow> {
    let Some(slot) = &snapshot.slot else {
        return Vec::new();
    };
    slot.tools()
        .into_iter()
        .map(|(id, tool)| ToolRow {
            id,
            active: slot.active == Some(id),
            fields: vec![
                Field::new("Id", id.to_string()),
                Field::new("Material", or_missing(tool.material.as_deref())),
                Field::new("Temp", number_or_missing(tool.temp)),
                Field::new("Fan hotend", number_or_missing(tool.fan_hotend)),
                Field::new("Fan print", number_or_missing(tool.fan_print)),
            ],
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub done: f64,
    pub total: f64,
}

impl Progress {
    pub fn fraction(&self) -> f32 {
        if self.total <= 0.0 {
            return 0.0;
        }
        (self.done / self.total).clamp(0.0, 1.0) as f32
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentJobPanel {
    pub display_name: String,
    pub progress_percent: f64,
    pub elapsed: i64,
    pub remaining: Option<i64>,
    pub started: i64,
    pub real_end: i64,
    pub estimated_end: Option<i64>,
    pub estimated_duration: Option<i64>,
    pub weight: Option<Progress>,
    pub height: Option<Progress>,
    pub timing: Vec<Field>,
    pub file_details: Vec<Field>,
}

impl CurrentJobPanel {
    // Ok(None) when there is no job.
    pub fn build(snapshot: &PrinterSnapshot, file: Option<&File>) -> Result<Option<Self>, Error> {
        let Some(job) = &snapshot.job_info else {
            return Ok(None);
        };

        let require = |value: Option<i64>, key: &str| {
            value.ok_or_else(|| Error::malformed(CURRENT_JOB_RESOURCE, format!("missing {key}")))
        };
        let display_name = job
            .display_name
            .clone()
            .ok_or_else(|| Error::malformed(CURRENT_JOB_RESOURCE, "missing display_name"))?;
        let progress_percent = job
            .progress
            .ok_or_else(|| Error::malformed(CURRENT_JOB_RESOURCE, "missing progress"))?;
        let elapsed = require(job.time_printing, "time_printing")?;
        require(job.time_remaining, "time_remaining")?;
        let started = require(job.start, "start")?;

        let remaining = job.remaining_seconds();
        let real_duration = elapsed.saturating_add(remaining.unwrap_or(0));
        let real_end = started.saturating_add(real_duration);
        let meta = file.map(|file| &file.meta);
        let estimated_duration = meta.and_then(FileMeta::estimated_print_time);
        let estimated_end = estimated_duration.map(|secs| started.saturating_add(secs));

        let weight = weight_progress(job);
        let height = match (snapshot.axis_z, job.total_height) {
            (Some(z), Some(total)) => Some(Progress { done: z, total }),
            _ => None,
        };

        let mut timing = vec![
            Field::new("Started", format_epoch(started)),
            Field::new("Slicer end", or_missing(estimated_end.map(format_epoch))),
            Field::new("Real end", format_epoch(real_end)),
            Field::new(
                "Slicer duration",
                or_missing(estimated_duration.map(format_duration)),
            ),
            Field::new("Real duration", format_duration(real_duration)),
            Field::new("Printing time", format_duration(elapsed)),
            Field::new("Remaining time", format_duration(remaining.unwrap_or(0))),
        ];
        if let Some(weight) = weight {
            timing.push(Field::new(
                "Weight",
                format!("{:.2}/{:.2} g", weight.done, weight.total),
            ));
        }
        if let Some(height) = height {
            timing.push(Field::new(
                "Height",
                format!("{:.2}/{:.2} mm", height.done, height.total),
            ));
        }

        Ok(Some(Self {
            display_name,
            progress_percent,
            elapsed,
            remaining,
            started,
            real_end,
            estimated_end,
            estimated_duration,
            weight,
            height,
            timing,
            file_details: meta.map(file_detail_fields).unwrap_or_default(),
        }))
    }

    pub fn progress_fraction(&self) -> f32 {
        (self.progress_percent / 100.0).clamp(0.0, 1.0) as f32
    }

    pub fn eta_label(&self) -> String {
        let total = self.elapsed.saturating_add(self.remaining.unwrap_or(0));
        format!(
            "{}/{}",
            format_duration(self.elapsed),
            format_duration(total)
        )
    }
}

fn weight_progress(job: &JobInfo) -> Option<Progress> {
    let total = job.model_weight?;
    let remaining = job.weight_remaining?;
    Some(Progress {
        done: total - remaining,
        total,
    })
}

// Falls back to the most recent job when no id matches.
pub fn current_job_file<'a>(snapshot: &PrinterSnapshot, jobs: &'a [Job]) -> Option<&'a File> {
    let job_id = snapshot.job_info.as_ref().and_then(|job| job.id);
    jobs.iter()
        .find(|job| Some(job.id) == job_id)
        .or_else(|| jobs.first())
        .map(|job| &job.file)
}

pub fn file_detail_fields(meta: &FileMeta) -> Vec<Field> {
    let flag = |value: Option<bool>| or_missing(value);
    vec![
        Field::new("Printer model", or_missing(meta.printer_model())),
        Field::new("Filament type", or_missing(meta.filament_type())),
        Field::new(
            "Filament length",
            meta.filament_used_m()
                .map(|value| format!("{value:.2} meters"))
                .unwrap_or_else(|| MISSING.to_string()),
        ),
        Field::new(
            "Filament weight",
            meta.filament_used_g()
                .map(|value| format!("{value:.2} grams"))
                .unwrap_or_else(|| MISSING.to_string()),
        ),
        Field::new(
            "Filament cost",
            meta.filament_cost()
                .map(|value| format!("{}$", format_number(value)))
                .unwrap_or_else(|| MISSING.to_string()),
        ),
        Field::new("Nozzle diameter", number_or_missing(meta.nozzle_diameter())),
        Field::new("Bed temperature", number_or_missing(meta.bed_temperature())),
        Field::new("Layer height", number_or_missing(meta.layer_height())),
        Field::new("Fill density", or_missing(meta.fill_density())),
        Field::new("Brim width", number_or_missing(meta.brim_width())),
        Field::new("Support material", flag(meta.support_material())),
        Field::new("Ironing", flag(meta.ironing())),
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileCard {
    pub title: String,
    pub firmware: bool,
    pub fields: Vec<Field>,
    pub preview_path: Option<String>,
}

impl FileCard {
    pub fn from_file(file: &File) -> Self {
        let fields = match file.kind {
            FileKind::Firmware => vec![
                Field::new("Size", or_missing(file.size.map(format_size))),
                Field::new("Modified", or_missing(file.m_timestamp.map(format_epoch))),
            ],
            _ => vec![
                Field::new("Printer model", or_missing(file.meta.printer_model())),
                Field::new("Filament type", or_missing(file.meta.filament_type())),
                Field::new(
                    nicer_label("estimated_print_time"),
                    or_missing(file.meta.estimated_print_time().map(format_duration)),
                ),
                Field::new("Layer height", number_or_missing(file.meta.layer_height())),
                Field::new(
                    "Nozzle diameter",
                    number_or_missing(file.meta.nozzle_diameter()),
                ),
                Field::new("Uploaded", or_missing(file.uploaded.map(format_epoch))),
            ],
        };

        Self {
            title: file.title().to_string(),
            firmware: file.kind == FileKind::Firmware,
            fields,
            preview_path: file.preview_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobCard {
    pub title: String,
    pub state: String,
    pub fields: Vec<Field>,
    pub preview_path: Option<String>,
}

impl JobCard {
    pub fn from_job(job: &Job) -> Self {
        let meta = &job.file.meta;
        Self {
            title: job.file.title().to_string(),
            state: job.state.clone(),
            fields: vec![
                Field::new("Printer model", or_missing(meta.printer_model())),
                Field::new("Filament type", or_missing(meta.filament_type())),
                Field::new("Real time", or_missing(job.real_duration().map(format_duration))),
                Field::new("Layer height", number_or_missing(meta.layer_height())),
                Field::new("Nozzle diameter", number_or_missing(meta.nozzle_diameter())),
                Field::new("Print end", or_missing(job.finished_at().map(format_epoch))),
            ],
            preview_path: job.file.preview_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    pub event: String,
    pub created: String,
    pub source: String,
}

impl EventRow {
    pub fn from_event(event: &Event) -> Self {
        Self {
            event: nicer_label(&event.event),
            created: or_missing(event.created.map(format_epoch)),
            source: or_missing(event.source.as_deref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn printing(job_info: serde_json::Value) -> PrinterSnapshot {
        PrinterSnapshot::from_value(
            "printers/abc",
            json!({
                "uuid": "abc",
                "printer_state": "PRINTING",
                "axis_z": 3.0,
                "slot": {"active": 1, "slots": {"1": {"material": "PLA"}, "2": {"material": "PETG"}}},
                "job_info": job_info
            }),
        )
        .expect("snapshot")
    }

    fn job_info() -> serde_json::Value {
        json!({
            "id": 42,
            "display_name": "part.gcode",
            "progress": 12.5,
            "time_printing": 600,
            "time_remaining": 4200,
            "start": 1_720_000_000,
            "model_weight": 40.0,
            "weight_remaining": 30.0,
            "total_height": 30.0
        })
    }

    fn job(id: i64, estimated: i64) -> Job {
        serde_json::from_value(json!({
            "id": id,
            "state": "PRINTING",
            "start": 1_720_000_000,
            "file": {"name": format!("job-{id}.bgcode"), "meta": {"estimated_print_time": estimated}}
        }))
        .expect("job")
    }

    #[test]
    fn current_job_panel_computes_timing() {
        let snapshot = printing(job_info());
        let jobs = vec![job(7, 100), job(42, 5000)];
        let file = current_job_file(&snapshot, &jobs);
        assert_eq!(file.map(|file| file.name.as_str()), Some("job-42.bgcode"));

        let panel = CurrentJobPanel::build(&snapshot, file)
            .expect("valid")
            .expect("panel");
        assert_eq!(panel.real_end, 1_720_000_000 + 4800);
        assert_eq!(panel.estimated_end, Some(1_720_000_000 + 5000));
        assert_eq!(panel.weight.map(|weight| weight.done), Some(10.0));
        assert_eq!(panel.height.map(|height| height.fraction()), Some(0.1));
        assert_eq!(panel.eta_label(), "0:10:00/1:20:00");
        assert!((panel.progress_fraction() - 0.125).abs() < f32::EPSILON);
    }

    #[test]
    fn no_job_means_no_panel() {
        let snapshot = PrinterSnapshot::from_value(
            "printers/abc",
            json!({"uuid": "abc", "printer_state": "IDLE"}),
        )
        .expect("snapshot");
        assert_eq!(CurrentJobPanel::build(&snapshot, None), Ok(None));
    }

    #[test]
    fn paused_job_without_start_is_malformed() {
        let snapshot = PrinterSnapshot::from_value(
            "printers/abc",
            json!({
                "uuid": "abc",
                "printer_state": "PAUSED",
                "job_info": {"display_name": "part.gcode", "progress": 50.0,
                             "time_printing": 10, "time_remaining": 10}
            }),
        )
        .expect("snapshot");
        let error = CurrentJobPanel::build(&snapshot, None).expect_err("malformed");
        assert!(matches!(error, Error::MalformedResponse { .. }));
    }

    #[test]
    fn unknown_remaining_counts_as_zero() {
        let mut info = job_info();
        info["time_remaining"] = json!(-1);
        let snapshot = printing(info);
        let panel = CurrentJobPanel::build(&snapshot, None)
            .expect("valid")
            .expect("panel");
        assert_eq!(panel.remaining, None);
        assert_eq!(panel.real_end, 1_720_000_000 + 600);
        assert_eq!(panel.estimated_end, None);
        assert!(panel.file_details.is_empty());
    }

    #[test]
    fn huge_vendor_timing_saturates() {
        let mut info = job_info();
        info["time_printing"] = json!(1e300);
        info["time_remaining"] = json!(i64::MAX);
        let snapshot = printing(info);
        let jobs = vec![job(42, i64::MAX)];
        let file = current_job_file(&snapshot, &jobs);

        let panel = CurrentJobPanel::build(&snapshot, file)
            .expect("valid")
            .expect("panel");
        assert_eq!(panel.elapsed, i64::MAX);
        assert_eq!(panel.real_end, i64::MAX);
        assert_eq!(panel.estimated_end, Some(i64::MAX));
        assert_eq!(panel.timing[2].value, MISSING);
        assert!(panel.eta_label().contains('/'));
    }

    #[test]
    fn tool_rows_flag_active_slot() {
        let snapshot = printing(job_info());
        let rows = tool_rows(&snapshot);
        assert_eq!(rows.len(), 2);
        assert!(rows[0].active);
        assert!(!rows[1].active);
        assert_eq!(rows[1].fields[1].value, "PETG");
    }

    #[test]
    fn firmware_card_shows_size() {
        let file: File = serde_json::from_value(json!({
            "type": "FIRMWARE",
            "name": "fw.bbf",
            "size": 2048
        }))
        .expect("file");
        let card = FileCard::from_file(&file);
        assert!(card.firmware);
        assert_eq!(card.fields[0].value, "2.0 KB");
    }
}
