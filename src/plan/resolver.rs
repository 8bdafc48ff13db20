//! Fleet → unit resolution.

use std::collections::HashMap;

use crate::domain::FleetRow;
use crate::error::PlanError;

/// Units of one fleet and their replacement costs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedFleet {
    /// Unit ids in order of first appearance in the fleet list.
    pub unit_ids: Vec<String>,
    /// Replacement cost per unit, for units that have one.
    pub unit_costs: HashMap<String, f64>,
}

impl ResolvedFleet {
    pub fn is_empty(&self) -> bool {
        self.unit_ids.is_empty()
    }
}

/// Resolve the units belonging to `fleet_id`.
///
/// An empty or unmatched fleet id yields an empty unit set; that is "nothing to
/// schedule yet", not an error. The only failure is a malformed table: a unit
/// listed under two different fleets.
pub fn resolve(fleet_id: &str, fleet_table: &[FleetRow]) -> Result<ResolvedFleet, PlanError> {
    ensure_single_fleet_per_unit(fleet_table)?;

    let fleet_id = fleet_id.trim();
    let mut out = ResolvedFleet::default();
    if fleet_id.is_empty() {
        return Ok(out);
    }

    for row in fleet_table.iter().filter(|r| r.fleet.trim() == fleet_id) {
        if !out.unit_ids.contains(&row.unit_id) {
            out.unit_ids.push(row.unit_id.clone());
        }
        // The first listed cost wins if a unit is repeated.
        if let Some(cost) = row.replacement_cost {
            out.unit_costs.entry(row.unit_id.clone()).or_insert(cost);
        }
    }

    Ok(out)
}

fn ensure_single_fleet_per_unit(fleet_table: &[FleetRow]) -> Result<(), PlanError> {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    for row in fleet_table {
        let fleet = row.fleet.trim();
        match seen.get(row.unit_id.as_str()) {
            Some(existing) if *existing != fleet => {
                return Err(PlanError::Lookup(format!(
                    "unit `{}` is listed under fleets `{existing}` and `{fleet}`",
                    row.unit_id
                )));
            }
            Some(_) => {}
            None => {
                seen.insert(row.unit_id.as_str(), fleet);
            }
        }
    }
    Ok(())
}
