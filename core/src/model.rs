use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::Error;

pub type EpochSeconds = i64;

// Doubles as a capability for the printer endpoints; never display it whole.
#[derive(Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct PrinterId(String);

impl PrinterId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(4).collect();
        format!("{prefix}***")
    }
}

impl fmt::Display for PrinterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl fmt::Debug for PrinterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrinterId({})", self.redacted())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct PrinterState(String);

impl PrinterState {
    pub const IDLE: &'static str = "IDLE";
    pub const READY: &'static str = "READY";
    pub const PRINTING: &'static str = "PRINTING";
    pub const PAUSED: &'static str = "PAUSED";
    pub const FINISHED: &'static str = "FINISHED";
    pub const STOPPED: &'static str = "STOPPED";
    pub const ERROR: &'static str = "ERROR";
    pub const OFFLINE: &'static str = "OFFLINE";

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_printing(&self) -> bool {
        self.0 == Self::PRINTING
    }
}

impl fmt::Display for PrinterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for PrinterState {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Reading {
    pub current: Option<f64>,
    pub target: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Temperatures(BTreeMap<String, Value>);

impl Temperatures {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    pub fn reading(&self, sensor: &str) -> Reading {
        Reading {
            current: self.get(&format!("temp_{sensor}")),
            target: self.get(&format!("target_{sensor}")),
        }
    }

    pub fn nozzle(&self) -> Reading {
        self.reading("nozzle")
    }

    pub fn bed(&self) -> Reading {
        self.reading("bed")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ToolSlot {
    pub material: Option<String>,
    pub temp: Option<f64>,
    pub fan_hotend: Option<f64>,
    pub fan_print: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SlotInfo {
    #[serde(default, deserialize_with = "lenient_u32")]
    pub active: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub slots: BTreeMap<String, ToolSlot>,
}

impl SlotInfo {
    pub fn tools(&self) -> Vec<(u32, &ToolSlot)> {
        let mut tools: Vec<(u32, &ToolSlot)> = self
            .slots
            .iter()
            .filter_map(|(key, tool)| key.trim().parse::<u32>().ok().map(|id| (id, tool)))
            .collect();
        tools.sort_by_key(|(id, _)| *id);
        tools
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Filament {
    #[serde(default)]
    pub material: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JobInfo {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub id: Option<i64>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub time_printing: Option<i64>,
    // -1 while the printer has no estimate yet.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub time_remaining: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub start: Option<EpochSeconds>,
    #[serde(default)]
    pub model_weight: Option<f64>,
    #[serde(default)]
    pub weight_remaining: Option<f64>,
    #[serde(default)]
    pub total_height: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JobInfo {
    pub const REQUIRED_WHILE_PRINTING: [&'static str; 4] =
        ["time_printing", "time_remaining", "progress", "display_name"];

    pub fn remaining_seconds(&self) -> Option<i64> {
        self.time_remaining.filter(|value| *value >= 0)
    }

    pub fn missing_required(&self) -> Vec<&'static str> {
        let present = [
            self.time_printing.is_some(),
            self.time_remaining.is_some(),
            self.progress.is_some(),
            self.display_name.is_some(),
        ];
        Self::REQUIRED_WHILE_PRINTING
            .iter()
            .zip(present)
            .filter(|(_, present)| !present)
            .map(|(key, _)| *key)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PrinterSnapshot {
    pub uuid: PrinterId,
    pub printer_state: PrinterState,
    #[serde(default)]
    pub state_reason: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub firmware: Option<String>,
    #[serde(default)]
    pub printer_model: Option<String>,
    #[serde(default)]
    pub printer_type_name: Option<String>,
    #[serde(default)]
    pub axis_x: Option<f64>,
    #[serde(default)]
    pub axis_y: Option<f64>,
    #[serde(default)]
    pub axis_z: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub temp: Temperatures,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub flow: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub speed: Option<u32>,
    #[serde(default)]
    pub nozzle_diameter: Option<f64>,
    #[serde(default)]
    pub slot: Option<SlotInfo>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub slots: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub filament: Filament,
    #[serde(default)]
    pub job_info: Option<JobInfo>,
}

impl PrinterSnapshot {
    pub fn from_json(resource: &str, body: &str) -> Result<Self, Error> {
        let snapshot: PrinterSnapshot = serde_json::from_str(body)
            .map_err(|error| Error::malformed(resource, error.to_string()))?;
        snapshot.validate(resource)?;
        Ok(snapshot)
    }

    pub fn from_value(resource: &str, value: Value) -> Result<Self, Error> {
        let snapshot: PrinterSnapshot = serde_json::from_value(value)
            .map_err(|error| Error::malformed(resource, error.to_string()))?;
        snapshot.validate(resource)?;
        Ok(snapshot)
    }

    pub fn validate(&self, resource: &str) -> Result<(), Error> {
        if !self.printer_state.is_printing() {
            return Ok(());
        }

        let Some(job) = &self.job_info else {
            return Err(Error::malformed(resource, "state PRINTING without job_info"));
        };

        let missing = job.missing_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::malformed(
                resource,
                format!("job_info missing {}", missing.join(", ")),
            ))
        }
    }

    pub fn is_printing(&self) -> bool {
        self.printer_state.is_printing()
    }

    pub fn speed_percent(&self) -> u32 {
        self.speed.unwrap_or(0).min(100)
    }

    pub fn active_tool(&self) -> Option<u32> {
        self.slot.as_ref().and_then(|slot| slot.active)
    }

    pub fn slot_count(&self) -> u32 {
        self.slots
            .or_else(|| {
                self.slot
                    .as_ref()
                    .map(|slot| slot.tools().len() as u32)
                    .filter(|count| *count > 0)
            })
            .unwrap_or(1)
    }

    pub fn material(&self) -> Option<&str> {
        self.filament.material.as_deref()
    }

    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.printer_model.clone())
            .unwrap_or_else(|| self.uuid.redacted())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FileKind {
    PrintFile,
    Firmware,
    Other(String),
    #[default]
    Unknown,
}

impl FileKind {
    pub fn parse(value: &str) -> Self {
        match value {
            "PRINT_FILE" => FileKind::PrintFile,
            "FIRMWARE" => FileKind::Firmware,
            other => FileKind::Other(other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for FileKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.map(|text| FileKind::parse(&text)).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct FileMeta(Map<String, Value>);

impl FileMeta {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|value| !value.is_null())
    }

    pub fn text(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        }
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(flag) => Some(*flag),
            Value::Number(number) => number.as_f64().map(|value| value != 0.0),
            _ => None,
        }
    }

    pub fn printer_model(&self) -> Option<String> {
        self.text("printer_model")
    }

    pub fn filament_type(&self) -> Option<String> {
        self.text("filament_type")
    }

    pub fn estimated_print_time(&self) -> Option<i64> {
        self.number("estimated_print_time").map(|value| value as i64)
    }

    pub fn layer_height(&self) -> Option<f64> {
        self.number("layer_height")
    }

    pub fn nozzle_diameter(&self) -> Option<f64> {
        self.number("nozzle_diameter")
    }

    pub fn filament_used_m(&self) -> Option<f64> {
        self.number("filament_used_m")
    }

    pub fn filament_used_g(&self) -> Option<f64> {
        self.number("filament_used_g")
    }

    pub fn filament_cost(&self) -> Option<f64> {
        self.number("filament_cost")
    }

    pub fn bed_temperature(&self) -> Option<f64> {
        self.number("bed_temperature")
    }

    pub fn fill_density(&self) -> Option<String> {
        self.text("fill_density")
    }

    pub fn brim_width(&self) -> Option<f64> {
        self.number("brim_width")
    }

    pub fn support_material(&self) -> Option<bool> {
        self.flag("support_material")
    }

    pub fn ironing(&self) -> Option<bool> {
        self.flag("ironing")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct File {
    #[serde(rename = "type", default)]
    pub kind: FileKind,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub size: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub m_timestamp: Option<EpochSeconds>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub uploaded: Option<EpochSeconds>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub preview_mimetype: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub meta: FileMeta,
}

impl File {
    pub fn title(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Job {
    #[serde(deserialize_with = "required_i64")]
    pub id: i64,
    #[serde(default)]
    pub printer_uuid: Option<PrinterId>,
    pub state: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub start: Option<EpochSeconds>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub end: Option<EpochSeconds>,
    pub file: File,
}

impl Job {
    pub fn finished_at(&self) -> Option<EpochSeconds> {
        self.end.filter(|end| *end >= 0)
    }

    pub fn real_duration(&self) -> Option<i64> {
        let start = self.start?;
        self.finished_at().map(|end| end.saturating_sub(start))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Event {
    pub event: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub created: Option<EpochSeconds>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Map<String, Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn number_as_i64(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|number| number as i64))
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(number_as_i64))
}

fn required_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    number_as_i64(&value).ok_or_else(|| serde::de::Error::custom("expected a number"))
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_i64(deserializer)?.and_then(|value| u32::try_from(value).ok()))
}
