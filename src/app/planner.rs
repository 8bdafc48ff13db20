//! Memoized planning over raw uploads.
//!
//! A `Planner` owns a per-process cache keyed by a SHA-256 digest of every
//! upload's bytes plus the serialized run parameters. Identical requests share
//! the previous output; any changed byte or parameter recomputes. The cache
//! holds at most `capacity` outputs and evicts the least recently used.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::app::pipeline::{PlanInputs, PlanOutput, run_plan};
use crate::domain::PlanConfig;
use crate::error::PlanError;
use crate::io::ingest::{
    COMPONENT_COUNTER_DATA, COST_DATA, COUNTER_DATA, FLEET_LIST, LINKED_STRATEGY, ingest_component_counters,
    ingest_costs, ingest_counters, ingest_fleet_list, ingest_strategy,
};
use crate::io::table::{Upload, read_table};

/// The uploads of a run. `None` means "not uploaded yet".
///
/// The first three are required to plan; the linked strategy and component
/// counters only add tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Uploads {
    pub fleet_list: Option<Upload>,
    pub cost_data: Option<Upload>,
    pub counter_data: Option<Upload>,
    pub linked_strategy: Option<Upload>,
    pub component_counter_data: Option<Upload>,
}

impl Uploads {
    /// Read whichever paths are given.
    pub fn from_paths(
        fleet_list: Option<&Path>,
        cost_data: Option<&Path>,
        counter_data: Option<&Path>,
    ) -> Result<Self, PlanError> {
        Ok(Self {
            fleet_list: fleet_list.map(Upload::from_path).transpose()?,
            cost_data: cost_data.map(Upload::from_path).transpose()?,
            counter_data: counter_data.map(Upload::from_path).transpose()?,
            linked_strategy: None,
            component_counter_data: None,
        })
    }

    /// Add the optional strategy uploads from whichever paths are given.
    pub fn with_strategy_paths(
        mut self,
        linked_strategy: Option<&Path>,
        component_counter_data: Option<&Path>,
    ) -> Result<Self, PlanError> {
        self.linked_strategy = linked_strategy.map(Upload::from_path).transpose()?;
        self.component_counter_data = component_counter_data.map(Upload::from_path).transpose()?;
        Ok(self)
    }
}

/// Decode and validate every present upload.
pub fn load_inputs(uploads: &Uploads) -> Result<PlanInputs, PlanError> {
    let mut inputs = PlanInputs::default();

    if let Some(upload) = &uploads.fleet_list {
        let table = read_table(FLEET_LIST, upload)?;
        let ingested = ingest_fleet_list(&table)?;
        info!(table = FLEET_LIST, rows = ingested.records.len(), "ingested");
        inputs.row_errors.extend(ingested.row_errors);
        inputs.fleet_list = Some(ingested.records);
    }
    if let Some(upload) = &uploads.cost_data {
        let table = read_table(COST_DATA, upload)?;
        let ingested = ingest_costs(&table)?;
        info!(table = COST_DATA, rows = ingested.records.len(), "ingested");
        inputs.row_errors.extend(ingested.row_errors);
        inputs.costs = Some(ingested.records);
    }
    if let Some(upload) = &uploads.counter_data {
        let table = read_table(COUNTER_DATA, upload)?;
        let ingested = ingest_counters(&table)?;
        info!(table = COUNTER_DATA, rows = ingested.records.len(), "ingested");
        inputs.row_errors.extend(ingested.row_errors);
        inputs.counters = Some(ingested.records);
    }
    if let Some(upload) = &uploads.linked_strategy {
        let table = read_table(LINKED_STRATEGY, upload)?;
        let ingested = ingest_strategy(&table)?;
        info!(table = LINKED_STRATEGY, rows = ingested.records.len(), "ingested");
        inputs.row_errors.extend(ingested.row_errors);
        inputs.strategy = Some(ingested.records);
    }
    if let Some(upload) = &uploads.component_counter_data {
        let table = read_table(COMPONENT_COUNTER_DATA, upload)?;
        let ingested = ingest_component_counters(&table)?;
        info!(table = COMPONENT_COUNTER_DATA, rows = ingested.records.len(), "ingested");
        inputs.row_errors.extend(ingested.row_errors);
        inputs.component_counters = Some(ingested.records);
    }

    Ok(inputs)
}

/// Digest of uploads and parameters.
pub fn cache_key(uploads: &Uploads, config: &PlanConfig) -> Result<String, PlanError> {
    let mut hasher = Sha256::new();
    for (tag, upload) in [
        ("fleet_list", &uploads.fleet_list),
        ("cost_data", &uploads.cost_data),
        ("counter_data", &uploads.counter_data),
        ("linked_strategy", &uploads.linked_strategy),
        ("component_counter_data", &uploads.component_counter_data),
    ] {
        hasher.update(tag.as_bytes());
        match upload {
            Some(u) => {
                hasher.update([1u8]);
                // The extension decides how bytes are decoded.
                let ext = Path::new(&u.name)
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("")
                    .to_ascii_lowercase();
                hasher.update(ext.as_bytes());
                hasher.update((u.bytes.len() as u64).to_le_bytes());
                hasher.update(&u.bytes);
            }
            None => hasher.update([0u8]),
        }
    }

    let params = serde_json::to_vec(config)
        .map_err(|e| PlanError::validation("Parameters", format!("Failed to serialize parameters: {e}")))?;
    hasher.update(&params);

    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect())
}

/// Outputs kept by `Planner::new`.
pub const DEFAULT_CACHE_CAPACITY: usize = 16;

/// Planning front-end with explicit memoization.
#[derive(Debug)]
pub struct Planner {
    cache: HashMap<String, Arc<PlanOutput>>,
    /// Keys from least to most recently used.
    recency: VecDeque<String>,
    capacity: usize,
}

impl Default for Planner {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl Planner {
    pub fn new() -> Self {
        Self::default()
    }

    /// A planner caching at most `capacity` outputs (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: HashMap::new(),
            recency: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Plan from raw uploads, reusing a cached output for identical requests.
    ///
    /// Failed runs are never cached.
    pub fn plan(&mut self, uploads: &Uploads, config: &PlanConfig) -> Result<Arc<PlanOutput>, PlanError> {
        let key = cache_key(uploads, config)?;
        if let Some(hit) = self.cache.get(&key).cloned() {
            debug!(key = %key, "plan cache hit");
            self.touch(&key);
            return Ok(hit);
        }

        let inputs = load_inputs(uploads)?;
        let output = Arc::new(run_plan(&inputs, config)?);
        self.insert(key, Arc::clone(&output));
        Ok(output)
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            if let Some(k) = self.recency.remove(pos) {
                self.recency.push_back(k);
            }
        }
    }

    fn insert(&mut self, key: String, output: Arc<PlanOutput>) {
        while self.cache.len() >= self.capacity {
            let Some(oldest) = self.recency.pop_front() else {
                break;
            };
            debug!(key = %oldest, "plan cache eviction");
            self.cache.remove(&oldest);
        }
        self.recency.push_back(key.clone());
        self.cache.insert(key, output);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.recency.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn uploads() -> Uploads {
        Uploads {
            fleet_list: Some(Upload::new("fleet.csv", "fleet,unit,replacement_cost\n793F,DT101,500000\n")),
            cost_data: Some(Upload::new(
                "costs.csv",
                "unit,category,work_order_type,cost,date\nDT101,PM02,Engine,300000,2023-06-01\n",
            )),
            counter_data: Some(Upload::new(
                "counters.csv",
                "unit,timestamp,hours\nDT101,2023-01-01,10000\nDT101,2024-01-01,50000\n",
            )),
            ..Uploads::default()
        }
    }

    fn config() -> PlanConfig {
        PlanConfig {
            fleet: Some("793F".to_string()),
            eol: NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
            ..PlanConfig::default()
        }
    }

    #[test]
    fn identical_requests_hit_the_cache() {
        let mut planner = Planner::new();
        let a = planner.plan(&uploads(), &config()).unwrap();
        let b = planner.plan(&uploads(), &config()).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(planner.len(), 1);
        assert_eq!(a.schedules[0].events.len(), 1);
    }

    #[test]
    fn changed_bytes_or_parameters_miss() {
        let mut planner = Planner::new();
        planner.plan(&uploads(), &config()).unwrap();

        let mut changed = uploads();
        changed.counter_data = Some(Upload::new(
            "counters.csv",
            "unit,timestamp,hours\nDT101,2023-01-01,10000\nDT101,2024-01-01,50001\n",
        ));
        planner.plan(&changed, &config()).unwrap();

        let eol_changed = PlanConfig {
            eol: NaiveDate::from_ymd_opt(2027, 6, 30).unwrap(),
            ..config()
        };
        planner.plan(&uploads(), &eol_changed).unwrap();

        assert_eq!(planner.len(), 3);
        planner.clear();
        assert!(planner.is_empty());
    }

    fn with_eol(year: i32) -> PlanConfig {
        PlanConfig {
            eol: NaiveDate::from_ymd_opt(year, 6, 30).unwrap(),
            ..config()
        }
    }

    #[test]
    fn cache_is_bounded_and_evicts_least_recently_used() {
        let mut planner = Planner::with_capacity(2);
        let a = planner.plan(&uploads(), &with_eol(2026)).unwrap();
        planner.plan(&uploads(), &with_eol(2027)).unwrap();

        // Using 2026 again makes 2027 the eviction candidate.
        let a_again = planner.plan(&uploads(), &with_eol(2026)).unwrap();
        assert!(Arc::ptr_eq(&a, &a_again));

        planner.plan(&uploads(), &with_eol(2028)).unwrap();
        assert_eq!(planner.len(), 2);

        let a_kept = planner.plan(&uploads(), &with_eol(2026)).unwrap();
        assert!(Arc::ptr_eq(&a, &a_kept));

        for year in 2029..2040 {
            planner.plan(&uploads(), &with_eol(year)).unwrap();
        }
        assert_eq!(planner.len(), planner.capacity());
    }

    #[test]
    fn zero_capacity_still_caches_the_latest_plan() {
        let mut planner = Planner::with_capacity(0);
        let a = planner.plan(&uploads(), &config()).unwrap();
        let b = planner.plan(&uploads(), &config()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(planner.len(), 1);
    }

    #[test]
    fn failures_are_not_cached() {
        let mut planner = Planner::new();
        let missing = Uploads {
            cost_data: None,
            ..uploads()
        };
        assert!(matches!(
            planner.plan(&missing, &config()),
            Err(PlanError::MissingInput(_))
        ));
        assert!(planner.is_empty());
    }

    #[test]
    fn key_depends_on_presence_and_extension() {
        let cfg = config();
        let base = cache_key(&uploads(), &cfg).unwrap();

        let mut renamed = uploads();
        if let Some(u) = renamed.fleet_list.as_mut() {
            u.name = "fleet.xlsx".to_string();
        }
        assert_ne!(base, cache_key(&renamed, &cfg).unwrap());

        let absent = Uploads {
            counter_data: None,
            ..uploads()
        };
        assert_ne!(base, cache_key(&absent, &cfg).unwrap());
        assert_eq!(base.len(), 64);

        let with_strategy = Uploads {
            linked_strategy: Some(Upload::new("strategy.csv", "unit,component\nDT101,Engine\n")),
            ..uploads()
        };
        assert_ne!(base, cache_key(&with_strategy, &cfg).unwrap());
    }

    #[test]
    fn optional_uploads_add_strategy_tables() {
        let full = Uploads {
            linked_strategy: Some(Upload::new(
                "strategy.csv",
                "unit,component,interval_hours\nDT101,Engine,20000\n",
            )),
            component_counter_data: Some(Upload::new(
                "components.csv",
                "unit,component,date,hours\nDT101,Engine,2024-01-01,12000\n",
            )),
            ..uploads()
        };

        let inputs = load_inputs(&full).unwrap();
        assert_eq!(inputs.strategy.as_ref().map(Vec::len), Some(1));
        assert_eq!(inputs.component_counters.as_ref().map(Vec::len), Some(1));

        let out = Planner::new().plan(&full, &config()).unwrap();
        assert_eq!(out.strategy_data[0].average_cost, Some(300_000.0));
        assert_eq!(out.component_intervals[0].hours_remaining, Some(8_000.0));
    }
}
