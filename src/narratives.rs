//! Control Narrative Aggregation
//!
//! Reads a component's `satisfies` list, following string entries into
//! other files, and merges each control citation with what the project's
//! standards know about the control. Every narrative part becomes one
//! [`ControlImplementation`] record.
//!
//! Evidence declared under `verifications` goes through the same include
//! walk and comes out as [`Evidence`] records.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_yaml::{Mapping, Value};

use crate::document::{load_document, scalar_string, SchemaType, COMPONENT_SCHEMA_VERSIONS};
use crate::error::{OpenControlError, Result};
use crate::ids::{get_matched_control, make_control_number_sort_key};
use crate::model::{
    control_url, Component, ControlImplementation, ControlRef, ControlSortKey, Evidence,
    FamilyRef, ImplementationSortKey, Resolution, StandardRef, Standards,
};

// =============================================================================
// Decoded file entries
// =============================================================================

/// An item of a `satisfies` or `verifications` list: either a record, or
/// the path of another file whose list is spliced in at this point
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Entry<T> {
    Include(String),
    Record(T),
}

/// A control citation with its narrative parts
#[derive(Debug, Clone, Deserialize)]
pub struct Citation {
    #[serde(deserialize_with = "scalar")]
    pub standard_key: String,
    #[serde(deserialize_with = "scalar")]
    pub control_key: String,
    #[serde(default, deserialize_with = "optional_scalar")]
    pub name: Option<String>,
    #[serde(default)]
    pub covered_by: Vec<Coverage>,
    #[serde(default)]
    pub narrative: Vec<NarrativePart>,
}

/// A link from a citation to a piece of evidence
#[derive(Debug, Clone, Deserialize)]
pub struct Coverage {
    #[serde(default, deserialize_with = "optional_scalar")]
    pub verification_key: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar")]
    pub component_key: Option<String>,
}

/// Narrative text for one control part
#[derive(Debug, Clone, Deserialize)]
pub struct NarrativePart {
    #[serde(default, deserialize_with = "optional_scalar")]
    pub key: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar")]
    pub implementation_status: Option<String>,
}

/// An evidence declaration
#[derive(Debug, Clone, Deserialize)]
pub struct Verification {
    #[serde(deserialize_with = "scalar")]
    pub key: String,
    #[serde(default, deserialize_with = "optional_scalar")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar")]
    pub path: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "optional_scalar")]
    pub verification_type: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar")]
    pub description: Option<String>,
}

fn scalar<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    scalar_string(&value).ok_or_else(|| serde::de::Error::custom("expected a string"))
}

fn optional_scalar<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(None),
        other => scalar_string(&other)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("expected a string")),
    }
}

// =============================================================================
// Include walk
// =============================================================================

/// Collect the records under `list_key` in `document`, splicing in the
/// lists of included files. Each record is paired with the file it came
/// from. `chain` holds the files currently being expanded, so a file that
/// includes itself, directly or not, is reported instead of recursing
/// forever.
fn collect_records<T: DeserializeOwned>(
    document: &Mapping,
    source_file: &Path,
    list_key: &str,
    chain: &mut Vec<PathBuf>,
    out: &mut Vec<(T, PathBuf)>,
) -> Result<()> {
    let Some(items) = document.get(list_key) else {
        return Ok(());
    };
    let items = match items {
        Value::Sequence(seq) => seq,
        Value::Null => return Ok(()),
        _ => {
            return Err(OpenControlError::InvalidDocument {
                schema_type: SchemaType::Component.label(),
                path: source_file.to_path_buf(),
                reason: format!("`{}` should be a list", list_key),
            })
        }
    };

    for (index, item) in items.iter().enumerate() {
        let entry: Entry<T> = serde_yaml::from_value(item.clone()).map_err(|e| {
            OpenControlError::InvalidDocument {
                schema_type: SchemaType::Component.label(),
                path: source_file.to_path_buf(),
                reason: format!("`{}` entry {}: {}", list_key, index + 1, e),
            }
        })?;

        match entry {
            Entry::Record(record) => out.push((record, source_file.to_path_buf())),
            Entry::Include(relative) => {
                let included = source_file
                    .parent()
                    .unwrap_or_else(|| Path::new(""))
                    .join(&relative);
                let identity = canonical_path(&included);
                if chain.contains(&identity) {
                    return Err(OpenControlError::IncludeCycle { path: included });
                }

                let inner = load_document(&included, SchemaType::Component, &[])?;
                chain.push(identity);
                collect_records(&inner, &included, list_key, chain, out)?;
                chain.pop();
            }
        }
    }

    Ok(())
}

fn component_records<T: DeserializeOwned>(
    component: &Component,
    list_key: &str,
) -> Result<Vec<(T, PathBuf)>> {
    let document = load_document(&component.file, SchemaType::Component, COMPONENT_SCHEMA_VERSIONS)?;
    let mut chain = vec![canonical_path(&component.file)];
    let mut records = Vec::new();
    collect_records(&document, &component.file, list_key, &mut chain, &mut records)?;
    Ok(records)
}

/// Filesystem identity of a file, or the path itself when it cannot be
/// resolved
pub(crate) fn canonical_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Every file that feeds the component's `satisfies` list: the component
/// file first, then included files in walk order, each listed once.
///
/// Files whose lists hold no narratives yet are included too, so this is
/// the set of files a new narrative may be written to.
pub fn component_source_files(component: &Component) -> Result<Vec<PathBuf>> {
    let document = load_document(&component.file, SchemaType::Component, COMPONENT_SCHEMA_VERSIONS)?;
    let mut chain = vec![canonical_path(&component.file)];
    let mut files = vec![component.file.clone()];
    collect_includes(&document, &component.file, &mut chain, &mut files)?;
    Ok(files)
}

fn collect_includes(
    document: &Mapping,
    source_file: &Path,
    chain: &mut Vec<PathBuf>,
    files: &mut Vec<PathBuf>,
) -> Result<()> {
    let Some(Value::Sequence(items)) = document.get("satisfies") else {
        return Ok(());
    };

    for relative in items.iter().filter_map(Value::as_str) {
        let included = source_file
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(relative);
        let identity = canonical_path(&included);
        if chain.contains(&identity) {
            return Err(OpenControlError::IncludeCycle { path: included });
        }

        let inner = load_document(&included, SchemaType::Component, &[])?;
        if !files.iter().any(|f| canonical_path(f) == identity) {
            files.push(included.clone());
        }
        chain.push(identity);
        collect_includes(&inner, &included, chain, files)?;
        chain.pop();
    }

    Ok(())
}

// =============================================================================
// Aggregation
// =============================================================================

/// Every narrative part the component declares, merged with catalog data.
///
/// Records come out in file order; callers sort by `sort_key` as needed.
pub fn load_component_controls(
    component: &Component,
    standards: &Standards,
) -> Result<Vec<ControlImplementation>> {
    let citations: Vec<(Citation, PathBuf)> = component_records(component, "satisfies")?;

    let mut records = Vec::new();
    for (citation, source_file) in &citations {
        records.extend(flatten_citation(component, standards, citation, source_file));
    }

    tracing::debug!(component = %component.id, count = records.len(), "aggregated narratives");
    Ok(records)
}

/// Build the records for one citation, one per narrative part.
pub fn flatten_citation(
    component: &Component,
    standards: &Standards,
    citation: &Citation,
    source_file: &Path,
) -> Vec<ControlImplementation> {
    let (standard, family, control) = resolve_citation(component, standards, citation);

    let evidence: Vec<String> = citation
        .covered_by
        .iter()
        .filter_map(|coverage| {
            if let Some(other) = &coverage.component_key {
                tracing::warn!(
                    component = %component.id,
                    control = %citation.control_key,
                    other_component = %other,
                    "skipping evidence from another component"
                );
                return None;
            }
            coverage.verification_key.clone()
        })
        .collect();

    citation
        .narrative
        .iter()
        .map(|part| ControlImplementation {
            component: component.clone(),
            standard: standard.clone(),
            family: family.clone(),
            control: control.clone(),
            control_part: part.key.clone(),
            sort_key: ImplementationSortKey {
                control: control.sort_key.clone(),
                part: make_control_number_sort_key(part.key.as_deref()),
            },
            narrative: part.text.clone().unwrap_or_default(),
            implementation_status: part.implementation_status.clone().unwrap_or_default(),
            evidence: evidence.clone(),
            source_file: source_file.to_path_buf(),
        })
        .collect()
}

/// Merge a citation with catalog metadata.
///
/// An exact catalog hit overlays the catalog's name, family and
/// description. Otherwise a parent control found by
/// [`get_matched_control`] fills in the family and description; the name
/// stays the citation's own `name`, or its raw key.
fn resolve_citation(
    component: &Component,
    standards: &Standards,
    citation: &Citation,
) -> (StandardRef, FamilyRef, ControlRef) {
    let standard_key = citation.standard_key.as_str();
    let control_key = citation.control_key.as_str();

    let mut standard_ref = StandardRef {
        id: standard_key.to_string(),
        name: standard_key.to_string(),
        known: false,
    };
    let mut family = FamilyRef::stub(control_key);
    let mut control = ControlRef {
        id: control_key.to_string(),
        number: control_key.to_string(),
        name: citation.name.clone().unwrap_or_else(|| control_key.to_string()),
        family: None,
        description: None,
        sort_key: ControlSortKey::new(standard_key, control_key),
        url: control_url(&component.project_url, standard_key, control_key),
        resolution: Resolution::Stub,
    };

    let Some(standard) = standards.get(standard_key) else {
        return (standard_ref, family, control);
    };
    standard_ref.name = standard.name.clone();
    standard_ref.known = true;

    if let Some(cataloged) = standard.controls.get(control_key) {
        control.name = cataloged.name.clone();
        control.family = Some(cataloged.family.clone());
        control.description = Some(cataloged.description.clone());
        control.resolution = Resolution::Cataloged;
    } else {
        let matched = get_matched_control(control_key, standard);
        if let Some(parent) = standard.controls.get(&matched) {
            tracing::warn!(
                component = %component.id,
                citation = %control_key,
                matched = %matched,
                "nonstandard control citation matched to parent control"
            );
            control.family.get_or_insert_with(|| parent.family.clone());
            control
                .description
                .get_or_insert_with(|| parent.description.clone());
            control.resolution = Resolution::Matched { control_id: matched };
        }
    }

    if let Some(family_key) = control.family.as_deref().filter(|f| !f.is_empty()) {
        match standard.families.get(family_key) {
            Some(cataloged) => family.overlay(cataloged),
            None => family = FamilyRef::unresolved(family_key),
        }
    }

    (standard_ref, family, control)
}

/// Evidence the component declares under `verifications`.
pub fn load_component_evidence(component: &Component) -> Result<Vec<Evidence>> {
    let verifications: Vec<(Verification, PathBuf)> = component_records(component, "verifications")?;

    Ok(verifications
        .into_iter()
        .map(|(v, source_file)| Evidence {
            name: v.name.unwrap_or_else(|| v.key.clone()),
            key: v.key,
            path: v.path,
            evidence_type: v.verification_type,
            description: v.description,
            component: component.clone(),
            source_file,
        })
        .collect())
}
