//! CSV export of per-trial DPS, the combat log and the resource timeline.

use std::io::Write;

use serde::Serialize;

use crate::combat::engine::TrialResult;
use crate::combat::trace::{CombatEvent, TimelineSample};

#[derive(Debug, Serialize)]
struct TrialRow {
    trial: usize,
    fight_length: f64,
    total_damage: f64,
    dps: f64,
    time_to_oom: Option<f64>,
}

fn write_rows<W: Write, T: Serialize>(writer: W, rows: impl IntoIterator<Item = T>) -> Result<(), csv::Error> {
    let mut out = csv::Writer::from_writer(writer);
    for row in rows {
        out.serialize(row)?;
    }
    out.flush()?;
    Ok(())
}

/// One row per trial, in trial order. An empty `time_to_oom` cell means mana never ran out.
pub fn write_trials_csv<W: Write>(writer: W, trials: &[TrialResult]) -> Result<(), csv::Error> {
    write_rows(
        writer,
        trials.iter().enumerate().map(|(trial, r)| TrialRow {
            trial,
            fight_length: r.fight_length,
            total_damage: r.total_damage,
            dps: r.dps,
            time_to_oom: r.time_to_oom,
        }),
    )
}

pub fn write_events_csv<W: Write>(writer: W, events: &[CombatEvent]) -> Result<(), csv::Error> {
    write_rows(writer, events)
}

pub fn write_timeline_csv<W: Write>(writer: W, timeline: &[TimelineSample]) -> Result<(), csv::Error> {
    write_rows(writer, timeline)
}

/// Renders any of the exports into a string, for API responses.
pub fn to_csv_string<F>(write: F) -> Result<String, csv::Error>
where
    F: FnOnce(&mut Vec<u8>) -> Result<(), csv::Error>,
{
    let mut buffer = Vec::new();
    write(&mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
