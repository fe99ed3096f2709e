//! The canonical record and the merge & provenance engine
//!
//! The record is owned exclusively by one coordinator for the lifetime of a
//! job and mutated only through [`Record::merge`]. Merging is computed on a
//! serialized copy and revalidated before it is handed back, so a failed
//! merge leaves the caller's record untouched (atomic per segment).

use crate::envelope::{FieldValue, UpdateEnvelope, NOT_FOUND, NOT_PROVIDED};
use crate::provenance::ProvenanceRow;
use crate::section::Section;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

fn sentinel() -> String {
    NOT_PROVIDED.to_string()
}

// ---------------------------------------------------------------------------
// Section states
// ---------------------------------------------------------------------------

/// The tree itself: species, dimensions, defects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TreeDescription {
    /// Common species name
    #[serde(default = "sentinel")]
    pub type_common: String,
    /// Scientific species name
    #[serde(default = "sentinel")]
    pub type_scientific: String,
    /// Height in feet (numeric-as-string)
    #[serde(default = "sentinel")]
    pub height_ft: String,
    /// Canopy width in feet (numeric-as-string)
    #[serde(default = "sentinel")]
    pub canopy_width_ft: String,
    /// Crown shape
    #[serde(default = "sentinel")]
    pub crown_shape: String,
    /// Diameter at breast height in inches (numeric-as-string)
    #[serde(default = "sentinel")]
    pub dbh_in: String,
    /// Observed structural defects
    #[serde(default)]
    pub defects: Vec<String>,
    /// Other observations about the tree
    #[serde(default)]
    pub general_observations: Vec<String>,
    /// Free-text narratives captured verbatim
    #[serde(default)]
    pub narratives: Vec<String>,
}

impl Default for TreeDescription {
    fn default() -> Self {
        TreeDescription {
            type_common: sentinel(),
            type_scientific: sentinel(),
            height_ft: sentinel(),
            canopy_width_ft: sentinel(),
            crown_shape: sentinel(),
            dbh_in: sentinel(),
            defects: Vec::new(),
            general_observations: Vec::new(),
            narratives: Vec::new(),
        }
    }
}

/// Site context around the tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AreaDescription {
    /// How busy the site is
    #[serde(default = "sentinel")]
    pub foot_traffic_level: String,
    /// Site context notes
    #[serde(default)]
    pub context: Vec<String>,
    /// How the site is used
    #[serde(default)]
    pub site_use: Vec<String>,
    /// Free-text narratives
    #[serde(default)]
    pub narratives: Vec<String>,
}

impl Default for AreaDescription {
    fn default() -> Self {
        AreaDescription {
            foot_traffic_level: sentinel(),
            context: Vec::new(),
            site_use: Vec::new(),
            narratives: Vec::new(),
        }
    }
}

/// One thing that could be struck
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetItem {
    /// Short label ("playset", "driveway")
    #[serde(default = "sentinel")]
    pub label: String,
    /// How close the target is to the tree
    #[serde(default = "sentinel")]
    pub proximity_note: String,
    /// How often the target is occupied
    #[serde(default = "sentinel")]
    pub occupied_frequency: String,
    /// Ways the target could be damaged
    #[serde(default)]
    pub damage_modes: Vec<String>,
}

impl Default for TargetItem {
    fn default() -> Self {
        TargetItem {
            label: sentinel(),
            proximity_note: sentinel(),
            occupied_frequency: sentinel(),
            damage_modes: Vec::new(),
        }
    }
}

/// Targets section
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Targets {
    /// Individual targets
    #[serde(default)]
    pub items: Vec<TargetItem>,
    /// Free-text narratives
    #[serde(default)]
    pub narratives: Vec<String>,
}

/// One assessed risk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RiskItem {
    /// What could happen
    #[serde(default = "sentinel")]
    pub description: String,
    /// Likelihood rating
    #[serde(default = "sentinel")]
    pub likelihood: String,
    /// Severity rating
    #[serde(default = "sentinel")]
    pub severity: String,
    /// Why the rating was assigned
    #[serde(default = "sentinel")]
    pub rationale: String,
}

impl Default for RiskItem {
    fn default() -> Self {
        RiskItem {
            description: sentinel(),
            likelihood: sentinel(),
            severity: sentinel(),
            rationale: sentinel(),
        }
    }
}

/// Risks section
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Risks {
    /// Individual risks
    #[serde(default)]
    pub items: Vec<RiskItem>,
    /// Free-text narratives
    #[serde(default)]
    pub narratives: Vec<String>,
}

/// One recommended line of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecommendationDetail {
    /// What is recommended and why
    #[serde(default = "sentinel")]
    pub narrative: String,
    /// Work scope
    #[serde(default = "sentinel")]
    pub scope: String,
    /// Limitations of the assessment
    #[serde(default = "sentinel")]
    pub limitations: String,
    /// Additional notes
    #[serde(default = "sentinel")]
    pub notes: String,
}

impl Default for RecommendationDetail {
    fn default() -> Self {
        RecommendationDetail {
            narrative: sentinel(),
            scope: sentinel(),
            limitations: sentinel(),
            notes: sentinel(),
        }
    }
}

/// Recommendations section
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Recommendations {
    /// Pruning work
    #[serde(default)]
    pub pruning: RecommendationDetail,
    /// Removal work
    #[serde(default)]
    pub removal: RecommendationDetail,
    /// Ongoing maintenance
    #[serde(default)]
    pub continued_maintenance: RecommendationDetail,
    /// Free-text narratives
    #[serde(default)]
    pub narratives: Vec<String>,
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// The canonical, mutable, per-job structured document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    /// Currently active section, used as fallback scope for unscoped text
    #[serde(default)]
    pub cursor: Option<Section>,
    /// Site context
    #[serde(default)]
    pub area_description: AreaDescription,
    /// The tree
    #[serde(default)]
    pub tree_description: TreeDescription,
    /// Strike targets
    #[serde(default)]
    pub targets: Targets,
    /// Assessed risks
    #[serde(default)]
    pub risks: Risks,
    /// Recommended work
    #[serde(default)]
    pub recommendations: Recommendations,
    /// Audit trail, appended by every merge
    #[serde(default)]
    pub provenance: Vec<ProvenanceRow>,
}

/// Field-application policy for one merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Normal capture: concrete values fill sentinel/absent scalars but never
    /// overwrite a provided scalar; lists always append
    PreferExisting,
    /// Corrections: concrete values replace scalars and supersede earlier
    /// provenance rows for the same section+path; lists still append
    LastWrite,
}

/// Audit identity for one merge call
#[derive(Debug, Clone)]
pub struct MergeOrigin {
    /// Correlation id of the turn
    pub turn_id: String,
    /// The exact segment text sent to the extractor
    pub segment_text: String,
    /// Extractor identity
    pub extractor: String,
    /// Unix seconds
    pub timestamp: u64,
}

/// Result of a successful merge
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The record with the envelope applied and provenance appended
    pub record: Record,
    /// Provenance rows emitted by this merge (including a synthetic
    /// "Not Found" row when nothing applied)
    pub rows: Vec<ProvenanceRow>,
    /// Dotted paths that changed
    pub applied_paths: Vec<String>,
}

impl MergeOutcome {
    /// True when at least one field applied
    pub fn captured(&self) -> bool {
        !self.applied_paths.is_empty()
    }
}

/// A merge rejected the envelope; the caller's record is unchanged
#[derive(Debug, Error)]
pub enum MergeError {
    /// Envelope path does not exist in the record schema
    #[error("unknown field path: {0}")]
    UnknownPath(String),

    /// Envelope value shape does not match the field (scalar vs list)
    #[error("type mismatch at {path}: {detail}")]
    TypeMismatch {
        /// Offending path
        path: String,
        /// What was wrong
        detail: String,
    },

    /// Appended elements failed record schema revalidation
    #[error("schema violation: {0}")]
    Schema(String),

    /// Internal serialization failure
    #[error("serialization error: {0}")]
    Serialize(String),
}

impl Record {
    /// Create an empty record (all scalars sentinel, all lists empty)
    pub fn new() -> Record {
        Record::default()
    }

    /// Apply one update envelope under the given policy
    ///
    /// Per-field rule: sentinel values are always skipped (no mutation, no
    /// provenance row). If zero fields apply, exactly one synthetic
    /// "Not Found" row is emitted carrying the segment text; otherwise one
    /// row per applied field and no "Not Found" row.
    pub fn merge(
        &self,
        section: Section,
        envelope: &UpdateEnvelope,
        policy: MergePolicy,
        origin: &MergeOrigin,
    ) -> Result<MergeOutcome, MergeError> {
        let mut data = serde_json::to_value(self).map_err(|e| MergeError::Serialize(e.to_string()))?;
        let mut trail: Vec<ProvenanceRow> = self.provenance.clone();
        let mut rows: Vec<ProvenanceRow> = Vec::new();

        for (path, value) in envelope.iter() {
            if !value.is_provided() {
                continue;
            }
            let root = path.split('.').next().unwrap_or("");
            if Section::parse(root).is_none() {
                return Err(MergeError::UnknownPath(path.to_string()));
            }
            let current = lookup(&data, path)
                .ok_or_else(|| MergeError::UnknownPath(path.to_string()))?
                .clone();

            if current.is_array() {
                let elems = match value {
                    FieldValue::List(elems) => elems.clone(),
                    FieldValue::Text(_) => {
                        return Err(MergeError::TypeMismatch {
                            path: path.to_string(),
                            detail: "scalar value sent to a list field".to_string(),
                        })
                    }
                    FieldValue::NotProvided => continue,
                };
                let mut merged = current.as_array().cloned().unwrap_or_default();
                merged.extend(elems.iter().cloned());
                set_by_path(&mut data, path, Value::Array(merged));
                let rendered =
                    serde_json::to_string(&elems).map_err(|e| MergeError::Serialize(e.to_string()))?;
                let row = self.row(section, path, &rendered, origin);
                trail.push(row.clone());
                rows.push(row);
            } else {
                let text = match value {
                    FieldValue::Text(s) => s.clone(),
                    FieldValue::List(_) => {
                        return Err(MergeError::TypeMismatch {
                            path: path.to_string(),
                            detail: "list value sent to a scalar field".to_string(),
                        })
                    }
                    FieldValue::NotProvided => continue,
                };
                if policy == MergePolicy::PreferExisting && json_is_provided(&current) {
                    continue;
                }
                if policy == MergePolicy::LastWrite {
                    trail.retain(|row| !(row.section == section && row.path == path));
                }
                set_by_path(&mut data, path, Value::String(text.clone()));
                let row = self.row(section, path, &text, origin);
                trail.push(row.clone());
                rows.push(row);
            }
        }

        if rows.is_empty() {
            let row = self.row(section, NOT_FOUND, NOT_FOUND, origin);
            trail.push(row.clone());
            rows.push(row);
        }

        data["provenance"] =
            serde_json::to_value(&trail).map_err(|e| MergeError::Serialize(e.to_string()))?;
        let record: Record =
            serde_json::from_value(data).map_err(|e| MergeError::Schema(e.to_string()))?;

        let applied_paths = rows
            .iter()
            .filter(|r| !r.is_not_found())
            .map(|r| r.path.clone())
            .collect();

        Ok(MergeOutcome {
            record,
            rows,
            applied_paths,
        })
    }

    fn row(&self, section: Section, path: &str, value: &str, origin: &MergeOrigin) -> ProvenanceRow {
        ProvenanceRow {
            turn_id: origin.turn_id.clone(),
            section,
            path: path.to_string(),
            value: value.to_string(),
            segment_text: origin.segment_text.clone(),
            extractor: origin.extractor.clone(),
            timestamp: origin.timestamp,
        }
    }

    /// Missing field paths grouped by section, for capture-progress displays
    pub fn whats_left(&self) -> BTreeMap<Section, Vec<String>> {
        let mut missing: BTreeMap<Section, Vec<String>> = BTreeMap::new();
        let data = match serde_json::to_value(self) {
            Ok(v) => v,
            Err(_) => return missing,
        };
        for section in Section::ALL {
            let mut paths = Vec::new();
            if let Some(obj) = data.get(section.as_str()) {
                collect_missing(section.as_str(), obj, &mut paths);
            }
            if !paths.is_empty() {
                paths.sort();
                missing.insert(section, paths);
            }
        }
        missing
    }
}

fn collect_missing(prefix: &str, value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                collect_missing(&format!("{}.{}", prefix, k), v, out);
            }
        }
        _ => {
            if !json_is_provided(value) {
                out.push(prefix.to_string());
            }
        }
    }
}

fn json_is_provided(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty() && s != NOT_PROVIDED,
        Value::Array(a) => !a.is_empty(),
        _ => true,
    }
}

fn lookup<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let mut cur = data;
    for part in path.split('.') {
        cur = cur.as_object()?.get(part)?;
    }
    Some(cur)
}

fn set_by_path(data: &mut Value, path: &str, value: Value) {
    let mut cur = data;
    let parts: Vec<&str> = path.split('.').collect();
    for part in &parts[..parts.len() - 1] {
        match cur.get_mut(*part) {
            Some(next) => cur = next,
            None => return,
        }
    }
    if let Some(obj) = cur.as_object_mut() {
        if let Some(last) = parts.last() {
            obj.insert((*last).to_string(), value);
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn origin() -> MergeOrigin {
        MergeOrigin {
            turn_id: "turn-prop".to_string(),
            segment_text: "prop".to_string(),
            extractor: "PropExtractor".to_string(),
            timestamp: 0,
        }
    }

    proptest! {
        /// Property: list fields only grow, and the prior content stays a prefix
        #[test]
        fn test_lists_only_grow(batches in proptest::collection::vec(
            proptest::collection::vec("[a-z ]{1,12}", 0..4), 1..6))
        {
            let mut record = Record::new();
            for batch in batches {
                let before = record.targets.narratives.clone();
                let elems: Vec<_> = batch.iter().map(|s| json!(s)).collect();
                let env = UpdateEnvelope::new()
                    .with("targets.narratives", FieldValue::list(elems));
                let out = record
                    .merge(Section::Targets, &env, MergePolicy::PreferExisting, &origin())
                    .expect("merge");
                record = out.record;
                prop_assert!(record.targets.narratives.len() >= before.len());
                prop_assert_eq!(&record.targets.narratives[..before.len()], &before[..]);
            }
        }

        /// Property: sentinel values are a no-op under either policy
        #[test]
        fn test_sentinel_is_noop(seed in "[a-z0-9 ]{0,20}", last_write in proptest::bool::ANY) {
            let record = Record::new();
            let policy = if last_write { MergePolicy::LastWrite } else { MergePolicy::PreferExisting };
            let primed = {
                let env = UpdateEnvelope::new()
                    .with("area_description.foot_traffic_level", FieldValue::text(&seed));
                record.merge(Section::AreaDescription, &env, policy, &origin()).expect("merge").record
            };
            let env = UpdateEnvelope::new()
                .with("area_description.foot_traffic_level", FieldValue::NotProvided)
                .with("area_description.site_use", FieldValue::list(vec![]));
            let out = primed.merge(Section::AreaDescription, &env, policy, &origin()).expect("merge");
            prop_assert_eq!(out.record.area_description, primed.area_description);
            prop_assert_eq!(out.rows.len(), 1);
            prop_assert!(out.rows[0].is_not_found());
        }
    }
}
