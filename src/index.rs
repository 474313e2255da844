//! Project-wide Control Index
//!
//! Views built across all components of a project: the control listing
//! with certification filtering, the per-control detail, evidence lists,
//! side-by-side component comparison, and the groupings and statistics
//! shown for a single component.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::catalog::{load_certified_controls, load_component, load_components, load_standards};
use crate::error::{OpenControlError, Result};
use crate::model::{
    CatalogControl, Component, ControlImplementation, ControlRef, Evidence, FamilyRef,
    ImplementationSortKey, Project, Standard, StandardRef, Standards,
};
use crate::narratives::{load_component_controls, load_component_evidence};

/// Status label used when a narrative gives no implementation status
pub const UNSPECIFIED_STATUS: &str = "Not specified";

// =============================================================================
// Control listing
// =============================================================================

/// A control in the project listing with the components implementing it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlSummary {
    pub control: ControlRef,
    pub family: FamilyRef,
    /// Ids of components with at least one narrative for the control
    pub components: BTreeSet<String>,
}

/// One standard's controls in the project listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandardControls {
    pub standard: StandardRef,
    pub controls: Vec<ControlSummary>,
}

/// Every control in play for a project.
///
/// Starts from what components actually implement, so nonstandard
/// citations always appear, then adds catalog controls that are either
/// certified or belong to a standard no certification mentions. Standards
/// come out sorted by name and controls by natural control number.
pub fn list_all_controls(project: &Project) -> Result<Vec<StandardControls>> {
    let standards = load_standards(project)?;
    let certified = load_certified_controls(project)?;
    let certified_standards = certified.standards();

    let mut listing: BTreeMap<String, (StandardRef, BTreeMap<String, ControlSummary>)> =
        BTreeMap::new();

    for component in load_components(project)? {
        for implementation in load_component_controls(&component, &standards)? {
            let (_, controls) = listing
                .entry(implementation.standard.id.clone())
                .or_insert_with(|| (implementation.standard.clone(), BTreeMap::new()));
            controls
                .entry(implementation.control.id.clone())
                .or_insert_with(|| ControlSummary {
                    control: implementation.control.clone(),
                    family: implementation.family.clone(),
                    components: BTreeSet::new(),
                })
                .components
                .insert(component.id.clone());
        }
    }

    for standard in standards.values() {
        let uncertified = !certified_standards.contains(standard.id.as_str());
        for control in standard.controls.values() {
            if !uncertified && !certified.contains(&standard.id, &control.id) {
                continue;
            }
            let (_, controls) = listing
                .entry(standard.id.clone())
                .or_insert_with(|| (known_standard(standard), BTreeMap::new()));
            controls
                .entry(control.id.clone())
                .or_insert_with(|| ControlSummary {
                    control: ControlRef::from_catalog(
                        control,
                        project.control_url(&standard.id, &control.id),
                    ),
                    family: catalog_family(standard, control),
                    components: BTreeSet::new(),
                });
        }
    }

    let mut result: Vec<StandardControls> = listing
        .into_values()
        .map(|(standard, controls)| {
            let mut controls: Vec<ControlSummary> = controls.into_values().collect();
            controls.sort_by(|a, b| a.control.sort_key.cmp(&b.control.sort_key));
            StandardControls { standard, controls }
        })
        .collect();
    result.sort_by(|a, b| {
        a.standard
            .name
            .cmp(&b.standard.name)
            .then_with(|| a.standard.id.cmp(&b.standard.id))
    });

    tracing::debug!(project = %project.id, standards = result.len(), "listed controls");
    Ok(result)
}

fn known_standard(standard: &Standard) -> StandardRef {
    StandardRef {
        id: standard.id.clone(),
        name: standard.name.clone(),
        known: true,
    }
}

fn catalog_family(standard: &Standard, control: &CatalogControl) -> FamilyRef {
    let mut family = FamilyRef::stub(&control.id);
    match standard.families.get(&control.family) {
        Some(cataloged) => family.overlay(cataloged),
        None if !control.family.is_empty() => family = FamilyRef::unresolved(&control.family),
        None => {}
    }
    family
}

// =============================================================================
// Control detail
// =============================================================================

/// One component's narratives for a control
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentNarratives {
    pub component: Component,
    pub implementations: Vec<ControlImplementation>,
}

/// Everything the project says about one control
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlDetail {
    pub standard: StandardRef,
    pub family: FamilyRef,
    pub control: ControlRef,
    /// Grid view: components by name, their narratives by sort key
    pub by_component: Vec<ComponentNarratives>,
    /// Combined view: whole-control text first, then by part and component
    pub narratives: Vec<ControlImplementation>,
}

/// Gather every narrative for `(standard_key, control_key)` across the
/// project's components.
///
/// A cataloged control with no narratives still has a detail view; an
/// uncataloged control that nothing implements is `NotFound`.
pub fn control_detail(project: &Project, standard_key: &str, control_key: &str) -> Result<ControlDetail> {
    let standards = load_standards(project)?;

    let mut by_component = Vec::new();
    for component in load_components(project)? {
        let mut implementations: Vec<ControlImplementation> =
            load_component_controls(&component, &standards)?
                .into_iter()
                .filter(|ci| ci.standard.id == standard_key && ci.control.id == control_key)
                .collect();
        if implementations.is_empty() {
            continue;
        }
        implementations.sort_by(|a, b| a.sort_key.cmp(&b.sort_key));
        by_component.push(ComponentNarratives {
            component,
            implementations,
        });
    }
    by_component.sort_by(|a, b| a.component.name.cmp(&b.component.name));

    let (standard, family, control) = match by_component.first() {
        Some(first) => {
            let ci = &first.implementations[0];
            (ci.standard.clone(), ci.family.clone(), ci.control.clone())
        }
        None => {
            let standard = standards
                .get(standard_key)
                .ok_or_else(|| OpenControlError::not_found("standard", standard_key))?;
            let control = standard.controls.get(control_key).ok_or_else(|| {
                OpenControlError::not_found("control", format!("{} {}", standard_key, control_key))
            })?;
            (
                known_standard(standard),
                catalog_family(standard, control),
                ControlRef::from_catalog(control, project.control_url(standard_key, control_key)),
            )
        }
    };

    let mut narratives: Vec<ControlImplementation> = by_component
        .iter()
        .flat_map(|group| group.implementations.iter().cloned())
        .collect();
    narratives.sort_by(|a, b| {
        (a.control_part.is_some(), &a.sort_key.part, &a.component.name).cmp(&(
            b.control_part.is_some(),
            &b.sort_key.part,
            &b.component.name,
        ))
    });

    Ok(ControlDetail {
        standard,
        family,
        control,
        by_component,
        narratives,
    })
}

// =============================================================================
// Evidence
// =============================================================================

/// Every component's evidence, components in name order
pub fn list_all_evidence(project: &Project) -> Result<Vec<Evidence>> {
    let mut components = load_components(project)?;
    components.sort_by(|a, b| a.name.cmp(&b.name));

    let mut evidence = Vec::new();
    for component in &components {
        evidence.extend(load_component_evidence(component)?);
    }
    Ok(evidence)
}

// =============================================================================
// Component comparison
// =============================================================================

/// A control part implemented by at least one compared component
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonRow {
    /// `"<standard> <control>"`, with `" part <key>"` for a part
    pub key: String,
    pub standard_key: String,
    pub control_key: String,
    pub control_part: Option<String>,
}

/// One compared component's narratives by row key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparedComponent {
    pub component: Component,
    pub implementations: BTreeMap<String, ControlImplementation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentComparison {
    /// Union of every compared component's control parts, in sort order
    pub rows: Vec<ComparisonRow>,
    /// Components in the order they were selected
    pub components: Vec<ComparedComponent>,
}

fn comparison_key(ci: &ControlImplementation) -> String {
    match &ci.control_part {
        Some(part) => format!("{} {} part {}", ci.standard.id, ci.control.id, part),
        None => format!("{} {}", ci.standard.id, ci.control.id),
    }
}

/// Line up the narratives of components, possibly from different
/// projects, by control part.
///
/// Each selection is a project and a component id in it. A component
/// citing the same part twice is shown with its first narrative.
pub fn component_comparison(selected: &[(&Project, &str)]) -> Result<ComponentComparison> {
    let mut rows: BTreeMap<String, (ImplementationSortKey, ComparisonRow)> = BTreeMap::new();
    let mut components = Vec::with_capacity(selected.len());

    for (project, component_id) in selected {
        let component = load_component(project, component_id)?;
        let standards = load_standards(project)?;

        let mut implementations = BTreeMap::new();
        for ci in load_component_controls(&component, &standards)? {
            let key = comparison_key(&ci);
            rows.entry(key.clone()).or_insert_with(|| {
                (
                    ci.sort_key.clone(),
                    ComparisonRow {
                        key: key.clone(),
                        standard_key: ci.standard.id.clone(),
                        control_key: ci.control.id.clone(),
                        control_part: ci.control_part.clone(),
                    },
                )
            });
            implementations.entry(key).or_insert(ci);
        }
        components.push(ComparedComponent {
            component,
            implementations,
        });
    }

    let mut rows: Vec<(ImplementationSortKey, ComparisonRow)> = rows.into_values().collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.key.cmp(&b.1.key)));

    Ok(ComponentComparison {
        rows: rows.into_iter().map(|(_, row)| row).collect(),
        components,
    })
}

// =============================================================================
// Single-component views
// =============================================================================

/// A component's narratives under one control family
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyGroup {
    pub standard: StandardRef,
    pub family: FamilyRef,
    pub implementations: Vec<ControlImplementation>,
}

/// Group records by (standard, family).
///
/// Groups are ordered by standard name then family sort key; records
/// within a group by their sort key.
pub fn component_families(implementations: &[ControlImplementation]) -> Vec<FamilyGroup> {
    let mut groups: BTreeMap<(String, String), FamilyGroup> = BTreeMap::new();
    for ci in implementations {
        groups
            .entry((ci.standard.id.clone(), ci.family.id.clone()))
            .or_insert_with(|| FamilyGroup {
                standard: ci.standard.clone(),
                family: ci.family.clone(),
                implementations: Vec::new(),
            })
            .implementations
            .push(ci.clone());
    }

    let mut groups: Vec<FamilyGroup> = groups.into_values().collect();
    for group in &mut groups {
        group.implementations.sort_by(|a, b| a.sort_key.cmp(&b.sort_key));
    }
    groups.sort_by(|a, b| {
        (&a.standard.name, &a.family.sort_key).cmp(&(&b.standard.name, &b.family.sort_key))
    });
    groups
}

/// A cataloged control offered when adding a narrative
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub standard: StandardRef,
    pub family: FamilyRef,
    pub control: ControlRef,
}

/// Every cataloged control across `standards`, in control sort order
pub fn control_catalog(project: &Project, standards: &Standards) -> Vec<CatalogEntry> {
    let mut entries: Vec<CatalogEntry> = standards
        .values()
        .flat_map(|standard| {
            standard.controls.values().map(move |control| CatalogEntry {
                standard: known_standard(standard),
                family: catalog_family(standard, control),
                control: ControlRef::from_catalog(
                    control,
                    project.control_url(&standard.id, &control.id),
                ),
            })
        })
        .collect();
    entries.sort_by(|a, b| a.control.sort_key.cmp(&b.control.sort_key));
    entries
}

/// Files holding a component's narratives, its definition file first
pub fn narrative_source_files(
    component: &Component,
    implementations: &[ControlImplementation],
) -> Vec<PathBuf> {
    let others: BTreeSet<&PathBuf> = implementations
        .iter()
        .map(|ci| &ci.source_file)
        .filter(|f| **f != component.file)
        .collect();

    std::iter::once(component.file.clone())
        .chain(others.into_iter().cloned())
        .collect()
}

/// Size and status totals for a set of narratives
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImplementationStatistics {
    /// Distinct (standard, control) pairs
    pub control_count: usize,
    pub control_part_count: usize,
    pub control_family_count: usize,
    pub total_words: usize,
    pub average_words_per_part: f64,
    /// Record count per status; an empty status counts as "Not specified"
    pub status_counts: BTreeMap<String, usize>,
}

fn word_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\w+").expect("word pattern is valid"))
}

fn word_count(text: &str) -> usize {
    word_runs().find_iter(text).count()
}

pub fn implementation_statistics(implementations: &[ControlImplementation]) -> ImplementationStatistics {
    let controls: BTreeSet<(&str, &str)> = implementations
        .iter()
        .map(|ci| (ci.standard.id.as_str(), ci.control.id.as_str()))
        .collect();
    let families: BTreeSet<(&str, &str)> = implementations
        .iter()
        .map(|ci| (ci.standard.id.as_str(), ci.family.id.as_str()))
        .collect();

    let mut status_counts = BTreeMap::new();
    let mut total_words = 0;
    for ci in implementations {
        total_words += word_count(&ci.narrative);
        let status = if ci.implementation_status.is_empty() {
            UNSPECIFIED_STATUS
        } else {
            ci.implementation_status.as_str()
        };
        *status_counts.entry(status.to_string()).or_insert(0) += 1;
    }

    ImplementationStatistics {
        control_count: controls.len(),
        control_part_count: implementations.len(),
        control_family_count: families.len(),
        total_words,
        average_words_per_part: total_words as f64 / implementations.len().max(1) as f64,
        status_counts,
    }
}
