//! Multi-scenario replacement scheduling.
//!
//! For every (unit, scenario) pair we walk the unit's counter forward in steps
//! of the scenario's replacement interval, projecting each target to a date,
//! until the projection passes the end-of-life horizon.

use std::collections::HashMap;

use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::warn;

use crate::domain::{BaselineMode, ReplacementEvent, Scenario, ScenarioSchedule};
use crate::fit::CounterTrend;

/// Events per (unit, scenario) pair before a schedule is cut short and reported.
pub const DEFAULT_MAX_EVENTS_PER_UNIT: usize = 1_000_000;

/// Inputs shared by every (unit, scenario) pair of one run.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleParams<'a> {
    pub eol: NaiveDate,
    pub baseline: BaselineMode,
    pub cost_by_unit: &'a HashMap<String, f64>,
    /// A pair reaching this many events before EOL is truncated and flagged.
    pub max_events_per_unit: usize,
}

impl<'a> ScheduleParams<'a> {
    pub fn new(eol: NaiveDate, baseline: BaselineMode, cost_by_unit: &'a HashMap<String, f64>) -> Self {
        Self {
            eol,
            baseline,
            cost_by_unit,
            max_events_per_unit: DEFAULT_MAX_EVENTS_PER_UNIT,
        }
    }
}

/// Events of one unit under one scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitSchedule {
    pub events: Vec<ReplacementEvent>,
    /// The event limit was hit while projected dates were still before EOL.
    pub truncated: bool,
}

/// Build one schedule per scenario, in scenario order.
///
/// Events within a schedule are ordered by date, then by the unit's position in
/// `unit_ids`, then by sequence. Units without a projector contribute nothing.
pub fn schedule(
    unit_ids: &[String],
    scenarios: &[Scenario],
    projector_by_unit: &HashMap<String, CounterTrend>,
    params: ScheduleParams<'_>,
) -> Vec<ScenarioSchedule> {
    let unit_rank: HashMap<&str, usize> = unit_ids
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();

    scenarios
        .par_iter()
        .map(|scenario| {
            let per_unit: Vec<(&String, UnitSchedule)> = unit_ids
                .par_iter()
                .filter_map(|unit_id| projector_by_unit.get(unit_id).map(|trend| (unit_id, trend)))
                .map(|(unit_id, trend)| (unit_id, schedule_unit(trend, scenario, params)))
                .collect();

            let mut events = Vec::new();
            let mut truncated_units = Vec::new();
            for (unit_id, unit) in per_unit {
                if unit.truncated {
                    truncated_units.push(unit_id.clone());
                }
                events.extend(unit.events);
            }

            events.sort_by(|a, b| {
                a.date
                    .cmp(&b.date)
                    .then_with(|| unit_rank[a.unit_id.as_str()].cmp(&unit_rank[b.unit_id.as_str()]))
                    .then(a.sequence.cmp(&b.sequence))
            });

            ScenarioSchedule {
                scenario: scenario.clone(),
                events,
                truncated_units,
            }
        })
        .collect()
}

/// Replacement events for one unit under one scenario.
///
/// Stops at the first target that is unreachable or lands after EOL.
pub fn schedule_unit(trend: &CounterTrend, scenario: &Scenario, params: ScheduleParams<'_>) -> UnitSchedule {
    let mut events = Vec::new();
    if scenario.threshold_hours == 0 {
        return UnitSchedule {
            events,
            truncated: false,
        };
    }

    let step = scenario.threshold_hours as f64;
    let baseline = match params.baseline {
        BaselineMode::LastReading => trend.last_hours,
        BaselineMode::Zero => 0.0,
    };
    let cost = params.cost_by_unit.get(&trend.unit_id).copied().unwrap_or(0.0);

    // With a zero baseline the early targets sit in the past; jump past them.
    let mut k = (((trend.last_hours - baseline) / step).floor().max(0.0) as u64).max(1);
    loop {
        let target = baseline + step * k as f64;
        k += 1;

        if target <= trend.last_hours {
            continue;
        }

        let Some(date) = trend.project(target) else {
            break;
        };
        if date > params.eol {
            break;
        }

        if events.len() >= params.max_events_per_unit {
            warn!(
                unit = %trend.unit_id,
                scenario = %scenario.name,
                limit = params.max_events_per_unit,
                next_date = %date,
                "replacement schedule truncated before EOL"
            );
            return UnitSchedule {
                events,
                truncated: true,
            };
        }

        events.push(ReplacementEvent {
            scenario: scenario.name.clone(),
            unit_id: trend.unit_id.clone(),
            sequence: events.len() as u32 + 1,
            target_hours: target,
            date,
            cost,
        });
    }

    UnitSchedule {
        events,
        truncated: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// 40,000 hours per 365 days, last reading 50,000 on 2024-01-01.
    fn trend(unit: &str) -> CounterTrend {
        CounterTrend {
            unit_id: unit.to_string(),
            first_date: ymd(2023, 1, 1),
            last_date: ymd(2024, 1, 1),
            last_hours: 50_000.0,
            rate_per_day: 40_000.0 / 365.0,
            samples_used: 2,
            samples_dropped: 0,
        }
    }

    fn params(eol: NaiveDate, costs: &HashMap<String, f64>) -> ScheduleParams<'_> {
        ScheduleParams::new(eol, BaselineMode::LastReading, costs)
    }

    fn stalled(unit: &str) -> CounterTrend {
        CounterTrend {
            rate_per_day: 0.0,
            ..trend(unit)
        }
    }

    #[test]
    fn single_event_before_eol() {
        let costs = HashMap::from([("DT101".to_string(), 250_000.0)]);
        let scenario = Scenario::new(1, 60_000);

        let events = schedule_unit(&trend("DT101"), &scenario, params(ymd(2026, 6, 30), &costs)).events;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].target_hours, 110_000.0);
        assert_eq!(events[0].sequence, 1);
        assert_eq!(events[0].cost, 250_000.0);
        assert!(events[0].date > ymd(2025, 6, 1) && events[0].date < ymd(2025, 8, 1));
    }

    #[test]
    fn events_are_monotonic_and_stop_at_eol() {
        let costs = HashMap::new();
        let scenario = Scenario::new(1, 20_000);
        let eol = ymd(2030, 6, 30);

        let events = schedule_unit(&trend("DT101"), &scenario, params(eol, &costs)).events;

        assert!(events.len() > 2);
        for w in events.windows(2) {
            assert!(w[0].date < w[1].date);
            assert_eq!(w[0].target_hours + 20_000.0, w[1].target_hours);
        }
        assert!(events.iter().all(|e| e.date <= eol));

        let next_target = events.last().unwrap().target_hours + 20_000.0;
        assert!(trend("DT101").project(next_target).unwrap() > eol);
    }

    #[test]
    fn first_target_past_eol_gives_empty_schedule() {
        let costs = HashMap::new();
        let events = schedule_unit(&trend("DT101"), &Scenario::new(1, 60_000), params(ymd(2024, 6, 30), &costs)).events;
        assert!(events.is_empty());
    }

    #[test]
    fn zero_threshold_never_replaces() {
        let costs = HashMap::new();
        let events = schedule_unit(&trend("DT101"), &Scenario::new(1, 0), params(ymd(2030, 1, 1), &costs)).events;
        assert!(events.is_empty());
    }

    #[test]
    fn zero_baseline_skips_targets_already_passed() {
        let costs = HashMap::new();
        let p = ScheduleParams {
            baseline: BaselineMode::Zero,
            ..params(ymd(2026, 12, 31), &costs)
        };

        let events = schedule_unit(&trend("DT101"), &Scenario::new(1, 20_000), p).events;

        assert_eq!(events[0].target_hours, 60_000.0);
        assert_eq!(events[0].sequence, 1);
        assert!(events[0].date > ymd(2024, 1, 1));
    }

    #[test]
    fn units_without_projector_contribute_nothing() {
        let units = vec!["DT101".to_string(), "DT102".to_string()];
        let projectors = HashMap::from([("DT101".to_string(), trend("DT101"))]);
        let scenarios = vec![Scenario::new(1, 60_000), Scenario::new(2, 80_000)];
        let costs = HashMap::new();

        let schedules = schedule(&units, &scenarios, &projectors, params(ymd(2025, 12, 1), &costs));

        assert_eq!(schedules.len(), 2);
        assert_eq!(schedules[0].scenario.name, "Scenario 1");
        assert_eq!(schedules[0].events.len(), 1);
        assert!(schedules.iter().flat_map(|s| &s.events).all(|e| e.unit_id == "DT101"));
        // 80,000 hours out lands after the horizon.
        assert!(schedules[1].events.is_empty());
    }

    #[test]
    fn schedule_is_deterministic() {
        let units: Vec<String> = (1..=8).map(|i| format!("DT{i:03}")).collect();
        let projectors: HashMap<String, CounterTrend> = units.iter().map(|u| (u.clone(), trend(u))).collect();
        let scenarios = vec![Scenario::new(1, 20_000), Scenario::new(2, 40_000)];
        let costs = HashMap::new();
        let p = params(ymd(2029, 6, 30), &costs);

        let a = schedule(&units, &scenarios, &projectors, p);
        let b = schedule(&units, &scenarios, &projectors, p);
        assert_eq!(a, b);

        // Same date for every unit: ties break on fleet order.
        let first_day: Vec<&str> = a[0]
            .events
            .iter()
            .take(units.len())
            .map(|e| e.unit_id.as_str())
            .collect();
        let expected: Vec<&str> = units.iter().map(String::as_str).collect();
        assert_eq!(first_day, expected);
    }

    #[test]
    fn sub_day_threshold_runs_all_the_way_to_eol() {
        let costs = HashMap::new();
        let eol = ymd(2027, 6, 30);
        let unit = trend("DT101");

        let schedule = schedule_unit(&unit, &Scenario::new(1, 1), params(eol, &costs));

        assert!(!schedule.truncated);
        let last = schedule.events.last().unwrap();
        assert!(last.date <= eol);
        for w in schedule.events.windows(2) {
            assert!(w[0].date <= w[1].date);
            assert_eq!(w[0].target_hours + 1.0, w[1].target_hours);
        }
        // The first target left out is the first one past the horizon.
        assert!(unit.project(last.target_hours + 1.0).unwrap() > eol);
    }

    #[test]
    fn event_limit_truncates_and_flags_the_unit() {
        let units = vec!["DT101".to_string(), "DT102".to_string()];
        let projectors = HashMap::from([
            ("DT101".to_string(), trend("DT101")),
            ("DT102".to_string(), trend("DT102")),
        ]);
        let costs = HashMap::new();
        let p = ScheduleParams {
            max_events_per_unit: 5,
            ..params(ymd(2027, 6, 30), &costs)
        };

        let unit = schedule_unit(&trend("DT101"), &Scenario::new(1, 1), p);
        assert!(unit.truncated);
        assert_eq!(unit.events.len(), 5);

        let schedules = schedule(&units, &[Scenario::new(1, 1), Scenario::new(2, 60_000)], &projectors, p);
        assert_eq!(schedules[0].truncated_units, units);
        assert!(schedules[1].truncated_units.is_empty());
    }

    #[test]
    fn stalled_unit_gets_no_events_in_any_scenario() {
        let units = vec!["DT101".to_string(), "DT102".to_string()];
        let projectors = HashMap::from([
            ("DT101".to_string(), stalled("DT101")),
            ("DT102".to_string(), trend("DT102")),
        ]);
        let scenarios = vec![Scenario::new(1, 20_000), Scenario::new(2, 60_000), Scenario::new(3, 5_000)];
        let costs = HashMap::new();
        let eol = ymd(2027, 6, 30);

        for baseline in [BaselineMode::LastReading, BaselineMode::Zero] {
            let p = ScheduleParams {
                baseline,
                ..params(eol, &costs)
            };
            let schedules = schedule(&units, &scenarios, &projectors, p);
            for s in &schedules {
                assert!(s.events.iter().all(|e| e.unit_id != "DT101"));
                assert!(s.events.iter().any(|e| e.unit_id == "DT102"));
                assert!(s.truncated_units.is_empty());
            }
            for scenario in &scenarios {
                assert!(schedule_unit(&stalled("DT101"), scenario, p).events.is_empty());
            }
        }
    }

    #[test]
    fn documented_example_emits_two_events_before_default_eol() {
        use crate::domain::CounterSample;
        use crate::fit::clean_samples;

        let reading = |d: NaiveDate, hours: f64| CounterSample {
            unit_id: "DT101".to_string(),
            timestamp: d.and_hms_opt(0, 0, 0).unwrap(),
            hours,
        };
        let samples = [reading(ymd(2023, 1, 1), 10_000.0), reading(ymd(2024, 1, 1), 50_000.0)];
        let refs: Vec<&CounterSample> = samples.iter().collect();
        let fitted = CounterTrend::fit("DT101", &clean_samples(&refs)).unwrap();
        let costs = HashMap::new();

        let events = schedule_unit(&fitted, &Scenario::new(1, 60_000), params(ymd(2027, 6, 30), &costs)).events;

        let got: Vec<(f64, NaiveDate)> = events.iter().map(|e| (e.target_hours, e.date)).collect();
        assert_eq!(
            got,
            vec![(110_000.0, ymd(2025, 7, 2)), (170_000.0, ymd(2026, 12, 31))]
        );
    }
}
