//! Linked strategy and component counters joined to fleet history.
//!
//! Work-order types and component names are matched case-insensitively, with
//! surrounding whitespace ignored.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::domain::{ComponentIntervalRow, ComponentReading, StrategyDataRow, StrategyRow};
use crate::plan::CostSummary;

fn match_key(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Strategy lines of the fleet's units with the PM02 average of each type.
///
/// Rows follow the fleet's unit order, then work-order type. A unit listing
/// the same type twice keeps its first line. Types without PM02 history get
/// no average rather than a zero.
pub fn strategy_data(strategy: &[StrategyRow], unit_ids: &[String], pm02: &CostSummary) -> Vec<StrategyDataRow> {
    let rank = unit_rank(unit_ids);

    let averages: HashMap<String, f64> = pm02
        .averages
        .iter()
        .map(|a| (match_key(&a.work_order_type), a.average_cost))
        .collect();
    let orders: HashMap<(&str, String), usize> = pm02
        .per_unit
        .iter()
        .map(|r| ((r.unit_id.as_str(), match_key(&r.work_order_type)), r.orders))
        .collect();

    let mut seen: BTreeMap<(usize, String), StrategyDataRow> = BTreeMap::new();
    for line in strategy {
        let Some(&r) = rank.get(line.unit_id.as_str()) else {
            continue;
        };
        let key = match_key(&line.work_order_type);
        if seen.contains_key(&(r, key.clone())) {
            debug!(unit = %line.unit_id, work_order_type = %line.work_order_type, "duplicate strategy line ignored");
            continue;
        }
        let row = StrategyDataRow {
            unit_id: line.unit_id.clone(),
            work_order_type: line.work_order_type.trim().to_string(),
            interval_hours: line.interval_hours,
            orders: orders.get(&(line.unit_id.as_str(), key.clone())).copied().unwrap_or(0),
            average_cost: averages.get(&key).copied(),
        };
        seen.insert((r, key), row);
    }

    seen.into_values().collect()
}

/// Latest reading of each fleet unit's components, with the strategy interval.
///
/// Of several readings for a component the latest timestamp wins; equal
/// timestamps keep the higher hours. Rows follow the fleet's unit order, then
/// component name.
pub fn component_intervals(
    readings: &[ComponentReading],
    strategy: &[StrategyRow],
    unit_ids: &[String],
) -> Vec<ComponentIntervalRow> {
    let rank = unit_rank(unit_ids);

    let mut latest: BTreeMap<(usize, String), &ComponentReading> = BTreeMap::new();
    for reading in readings {
        let Some(&r) = rank.get(reading.unit_id.as_str()) else {
            continue;
        };
        latest
            .entry((r, match_key(&reading.component)))
            .and_modify(|current| {
                let newer = (reading.timestamp, reading.hours) > (current.timestamp, current.hours);
                if newer {
                    *current = reading;
                }
            })
            .or_insert(reading);
    }

    // First interval stated for each (unit, type).
    let mut intervals: HashMap<(&str, String), f64> = HashMap::new();
    for line in strategy {
        if let Some(hours) = line.interval_hours {
            intervals
                .entry((line.unit_id.as_str(), match_key(&line.work_order_type)))
                .or_insert(hours);
        }
    }

    latest
        .into_iter()
        .map(|((_, key), reading)| {
            let interval_hours = intervals.get(&(reading.unit_id.as_str(), key)).copied();
            ComponentIntervalRow {
                unit_id: reading.unit_id.clone(),
                component: reading.component.trim().to_string(),
                last_date: reading.timestamp.date(),
                component_hours: reading.hours,
                interval_hours,
                hours_remaining: interval_hours.map(|i| i - reading.hours),
            }
        })
        .collect()
}

fn unit_rank(unit_ids: &[String]) -> HashMap<&str, usize> {
    unit_ids.iter().enumerate().map(|(i, u)| (u.as_str(), i)).collect()
}
