//! Cost filtering and work-order averages.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::domain::{CostRecord, UnitWorkOrderRow, WorkOrderAverage, WorkOrderCategory};

/// Cost rows of one category for one fleet, with averages per work-order type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostSummary {
    pub category: WorkOrderCategory,
    /// Matching rows ordered by unit, date, then work-order type.
    pub rows: Vec<CostRecord>,
    /// Average cost per work-order type, ordered by type.
    pub averages: Vec<WorkOrderAverage>,
    /// Which work-order types each unit has, with the fleet-wide average.
    pub per_unit: Vec<UnitWorkOrderRow>,
}

impl CostSummary {
    pub fn average_for(&self, work_order_type: &str) -> Option<f64> {
        self.averages
            .iter()
            .find(|a| a.work_order_type == work_order_type)
            .map(|a| a.average_cost)
    }

    /// Expected cost of one visit covering every work-order type the unit has
    /// on record. `None` when the unit has no rows in this category.
    pub fn unit_visit_cost(&self, unit_id: &str) -> Option<f64> {
        let mut costs: Vec<f64> = self
            .per_unit
            .iter()
            .filter(|r| r.unit_id == unit_id)
            .map(|r| r.average_cost)
            .collect();
        if costs.is_empty() {
            return None;
        }
        Some(stable_sum(&mut costs))
    }
}

/// Filter `cost_table` to `unit_ids` and `category`, and average per work-order type.
///
/// Types without matching rows are absent from the averages: a missing average
/// is never defaulted to zero. The averages do not depend on input row order.
pub fn filter_and_average(
    cost_table: &[CostRecord],
    unit_ids: &[String],
    category: WorkOrderCategory,
) -> CostSummary {
    let wanted: HashSet<&str> = unit_ids.iter().map(String::as_str).collect();

    let mut rows: Vec<CostRecord> = cost_table
        .iter()
        .filter(|r| r.category == category && wanted.contains(r.unit_id.as_str()))
        .cloned()
        .collect();
    rows.sort_by(|a, b| {
        a.unit_id
            .cmp(&b.unit_id)
            .then(a.date.cmp(&b.date))
            .then(a.work_order_type.cmp(&b.work_order_type))
            .then(a.cost.total_cmp(&b.cost))
    });

    let mut by_type: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for r in &rows {
        by_type.entry(r.work_order_type.as_str()).or_default().push(r.cost);
    }

    let averages: Vec<WorkOrderAverage> = by_type
        .into_iter()
        .filter(|(_, costs)| !costs.is_empty())
        .map(|(wo_type, mut costs)| {
            let orders = costs.len();
            WorkOrderAverage {
                work_order_type: wo_type.to_string(),
                orders,
                average_cost: stable_sum(&mut costs) / orders as f64,
            }
        })
        .collect();

    let mut unit_types: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for r in &rows {
        *unit_types.entry((r.unit_id.as_str(), r.work_order_type.as_str())).or_default() += 1;
    }

    let mut per_unit = Vec::new();
    for unit_id in unit_ids {
        let for_unit = unit_types.iter().filter(|((u, _), _)| *u == unit_id.as_str());
        for ((_, wo_type), orders) in for_unit {
            let Some(avg) = averages.iter().find(|a| a.work_order_type == *wo_type) else {
                continue;
            };
            per_unit.push(UnitWorkOrderRow {
                unit_id: unit_id.clone(),
                work_order_type: wo_type.to_string(),
                orders: *orders,
                average_cost: avg.average_cost,
            });
        }
    }

    CostSummary {
        category,
        rows,
        averages,
        per_unit,
    }
}

/// Sum in ascending order so the result does not depend on input order.
fn stable_sum(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    values.iter().sum()
}
