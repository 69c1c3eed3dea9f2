//! Optional per-trial combat log and resource timeline.

use serde::Serialize;

use crate::combat::fighter::AttackOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceMode {
    #[default]
    Off,
    Events,
}

/// One combat log line with the fighter's resources right after the event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombatEvent {
    pub time: f64,
    pub event: String,
    pub outcome: String,
    pub energy: f64,
    pub combo_points: u8,
    pub mana: f64,
}

/// Resources and damage dealt at one simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimelineSample {
    pub time: f64,
    pub damage: f64,
    pub energy: f64,
    pub combo_points: u8,
    pub mana: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resources {
    pub energy: f64,
    pub combo_points: u8,
    pub mana: f64,
}

#[derive(Debug, Clone, Default)]
pub struct TraceCollector {
    mode: TraceMode,
    events: Vec<CombatEvent>,
    timeline: Vec<TimelineSample>,
}

impl TraceCollector {
    pub fn new(mode: TraceMode) -> Self {
        Self {
            mode,
            events: Vec::new(),
            timeline: Vec::new(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.mode == TraceMode::Events
    }

    pub fn record(&mut self, time: f64, event: &str, outcome: impl Into<String>, resources: Resources) {
        if !self.enabled() {
            return;
        }
        self.events.push(CombatEvent {
            time,
            event: event.to_string(),
            outcome: outcome.into(),
            energy: resources.energy,
            combo_points: resources.combo_points,
            mana: resources.mana,
        });
    }

    pub fn sample(&mut self, time: f64, damage: f64, resources: Resources) {
        if !self.enabled() {
            return;
        }
        self.timeline.push(TimelineSample {
            time,
            damage,
            energy: resources.energy,
            combo_points: resources.combo_points,
            mana: resources.mana,
        });
    }

    pub fn events(&self) -> &[CombatEvent] {
        &self.events
    }

    pub fn timeline(&self) -> &[TimelineSample] {
        &self.timeline
    }

    pub fn into_parts(self) -> (Vec<CombatEvent>, Vec<TimelineSample>) {
        (self.events, self.timeline)
    }
}

/// Log text for an attack: damage or "miss", with crit, clearcast and T4 tags.
pub fn describe_outcome(outcome: &AttackOutcome) -> String {
    let mut tags = Vec::new();
    let base = if outcome.missed {
        "miss".to_string()
    } else {
        if outcome.crit {
            tags.push("crit");
        }
        format!("{}", outcome.damage.trunc() as i64)
    };
    if outcome.clearcast {
        tags.push("clearcast");
    }
    if outcome.t4_proc && !outcome.missed {
        tags.push("T4 proc");
    }
    if tags.is_empty() {
        base
    } else {
        format!("{base} ({})", tags.join(", "))
    }
}

pub fn serialize_events_json(events: &[CombatEvent]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::fighter::Ability;

    fn resources() -> Resources {
        Resources {
            energy: 58.0,
            combo_points: 2,
            mana: 4000.0,
        }
    }

    #[test]
    fn disabled_collector_records_nothing() {
        let mut trace = TraceCollector::new(TraceMode::Off);
        trace.record(1.0, "melee", "100", resources());
        trace.sample(1.0, 100.0, resources());
        assert!(trace.events().is_empty());
        assert!(trace.timeline().is_empty());
    }

    #[test]
    fn outcome_text_tags_crit_and_clearcast() {
        let outcome = AttackOutcome {
            ability: Ability::Shred,
            damage: 1234.9,
            missed: false,
            crit: true,
            clearcast: true,
            t4_proc: false,
        };
        assert_eq!(describe_outcome(&outcome), "1234 (crit, clearcast)");
        let miss = AttackOutcome {
            missed: true,
            crit: false,
            damage: 0.0,
            ..outcome
        };
        assert_eq!(describe_outcome(&miss), "miss (clearcast)");
    }

    #[test]
    fn events_serialize_as_json_array() {
        let mut trace = TraceCollector::new(TraceMode::Events);
        trace.record(0.05, "Shred", "980", resources());
        let json = serialize_events_json(trace.events()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["event"], "Shred");
        assert_eq!(parsed[0]["combo_points"], 2);
    }
}
