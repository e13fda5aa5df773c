use std::fmt;

use crate::model::{PrinterSnapshot, PrinterState};

#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    StateChanged {
        from: PrinterState,
        to: PrinterState,
    },
    JobStarted {
        display_name: Option<String>,
    },
    JobCleared,
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeEvent::StateChanged { from, to } => {
                write!(f, "Printer state changed: {from} -> {to}")
            }
            ChangeEvent::JobStarted {
                display_name: Some(name),
            } => write!(f, "Job started: {name}"),
            ChangeEvent::JobStarted { display_name: None } => f.write_str("Job started"),
            ChangeEvent::JobCleared => f.write_str("Job cleared"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    events: Vec<ChangeEvent>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn events(&self) -> &[ChangeEvent] {
        &self.events
    }

    pub fn state_change(&self) -> Option<(&PrinterState, &PrinterState)> {
        self.events.iter().find_map(|event| match event {
            ChangeEvent::StateChanged { from, to } => Some((from, to)),
            _ => None,
        })
    }
}

impl IntoIterator for ChangeSet {
    type Item = ChangeEvent;
    type IntoIter = std::vec::IntoIter<ChangeEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

pub fn diff(old: &PrinterSnapshot, new: &PrinterSnapshot) -> ChangeSet {
    let mut events = Vec::new();

    if old.printer_state != new.printer_state {
        events.push(ChangeEvent::StateChanged {
            from: old.printer_state.clone(),
            to: new.printer_state.clone(),
        });
    }

    match (&old.job_info, &new.job_info) {
        (None, Some(job)) => events.push(ChangeEvent::JobStarted {
            display_name: job.display_name.clone(),
        }),
        (Some(_), None) => events.push(ChangeEvent::JobCleared),
        _ => {}
    }

    ChangeSet { events }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(state: &str) -> PrinterSnapshot {
        PrinterSnapshot::from_value(
            "printers/abc",
            json!({"uuid": "abc", "printer_state": state, "temp": {"temp_nozzle": 24.0}}),
        )
        .expect("snapshot")
    }

    #[test]
    fn identical_snapshots_produce_no_changes() {
        let first = snapshot("IDLE");
        let second = snapshot("IDLE");
        assert!(diff(&first, &first).is_empty());
        assert!(diff(&first, &second).is_empty());
    }

    #[test]
    fn state_only_difference_yields_single_state_change() {
        let old = snapshot("IDLE");
        let new = snapshot("PAUSED");
        let changes = diff(&old, &new);
        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes.events()[0],
            ChangeEvent::StateChanged {
                from: PrinterState::new("IDLE"),
                to: PrinterState::new("PAUSED"),
            }
        );
    }

    #[test]
    fn job_appearing_is_reported_next_to_state_change() {
        let old = snapshot("IDLE");
        let new = PrinterSnapshot::from_value(
            "printers/abc",
            json!({
                "uuid": "abc",
                "printer_state": "PRINTING",
                "job_info": {
                    "display_name": "part.gcode",
                    "progress": 12.5,
                    "time_printing": 600,
                    "time_remaining": 4200
                }
            }),
        )
        .expect("snapshot");

        let changes = diff(&old, &new);
        let (from, to) = changes.state_change().expect("state change");
        assert_eq!(from, &"IDLE");
        assert_eq!(to, &"PRINTING");
        assert!(changes.events().contains(&ChangeEvent::JobStarted {
            display_name: Some("part.gcode".to_string())
        }));
        assert_eq!(diff(&new, &old).events().last(), Some(&ChangeEvent::JobCleared));
    }

    #[test]
    fn other_field_drift_is_not_a_change() {
        let old = snapshot("IDLE");
        let mut new = old.clone();
        new.axis_z = Some(1.2);
        assert!(diff(&old, &new).is_empty());
    }
}
