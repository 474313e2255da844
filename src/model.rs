//! Records for projects, components, standards and control narratives
//!
//! Every record is rebuilt from the YAML files on each lookup. Nothing here
//! is cached or persisted apart from the narrative fields the mutation
//! engine writes back.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::Serialize;

use crate::ids::{make_control_number_sort_key, url_segment, NumberSortKey};

// =============================================================================
// Projects and components
// =============================================================================

/// The organization a project belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Organization {
    /// URL-safe identifier (abbreviation prefix plus name hash)
    pub id: String,
    pub name: String,
    pub abbreviation: String,
}

/// One compliance system, read from its `opencontrol.yaml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    /// URL-safe identifier (name prefix plus manifest path hash)
    pub id: String,
    pub organization: Organization,
    pub title: String,
    pub description: Option<String>,
    pub source_repository: Option<String>,
    pub authorization_id: Option<String>,
    /// Project root directory
    pub path: PathBuf,
    /// The root manifest file
    pub manifest_path: PathBuf,
    /// Base URL for the project's pages
    pub url: String,
}

impl Project {
    /// URL of the page listing every contribution to one control
    pub fn control_url(&self, standard_key: &str, control_key: &str) -> String {
        control_url(&self.url, standard_key, control_key)
    }
}

pub(crate) fn control_url(project_url: &str, standard_key: &str, control_key: &str) -> String {
    format!(
        "{}/controls/{}/{}",
        project_url,
        url_segment(standard_key),
        url_segment(control_key)
    )
}

/// A part of the system that implements controls
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Component {
    pub id: String,
    pub project_id: String,
    pub project_url: String,
    pub name: String,
    /// Directory holding the component definition
    pub path: PathBuf,
    /// The component definition file itself
    pub file: PathBuf,
    pub url: String,
}

// =============================================================================
// Standards and certifications
// =============================================================================

/// Sort key of a control: standard first, then natural control number
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ControlSortKey {
    pub standard: String,
    pub number: NumberSortKey,
}

impl ControlSortKey {
    pub fn new(standard_key: &str, control_key: &str) -> Self {
        Self {
            standard: standard_key.to_string(),
            number: make_control_number_sort_key(Some(control_key)),
        }
    }
}

/// A control as cataloged in a standard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogControl {
    pub id: String,
    pub number: String,
    pub name: String,
    pub family: String,
    pub description: String,
    pub sort_key: ControlSortKey,
}

impl CatalogControl {
    pub fn new(
        standard_key: &str,
        id: &str,
        name: impl Into<String>,
        family: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.to_string(),
            number: id.to_string(),
            name: name.into(),
            family: family.into(),
            description: description.into(),
            sort_key: ControlSortKey::new(standard_key, id),
        }
    }
}

/// A control family as cataloged in a standard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Family {
    pub id: String,
    pub abbrev: String,
    pub name: String,
    pub sort_key: String,
}

impl Family {
    pub fn new(id: &str, name: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            abbrev: id.to_string(),
            name: name.into(),
            sort_key: id.to_string(),
        }
    }
}

/// A control catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Standard {
    pub id: String,
    pub name: String,
    pub controls: BTreeMap<String, CatalogControl>,
    pub families: BTreeMap<String, Family>,
}

impl Standard {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            controls: BTreeMap::new(),
            families: BTreeMap::new(),
        }
    }
}

/// Standards loaded for a project, keyed by standard id
pub type Standards = BTreeMap<String, Standard>;

/// Union of every certification's (standard, control) selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CertifiedControls(BTreeSet<(String, String)>);

impl CertifiedControls {
    pub fn insert(&mut self, standard_key: impl Into<String>, control_key: impl Into<String>) {
        self.0.insert((standard_key.into(), control_key.into()));
    }

    pub fn contains(&self, standard_key: &str, control_key: &str) -> bool {
        self.0
            .contains(&(standard_key.to_string(), control_key.to_string()))
    }

    /// Standards that have at least one certified control
    pub fn standards(&self) -> BTreeSet<&str> {
        self.0.iter().map(|(s, _)| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(s, c)| (s.as_str(), c.as_str()))
    }
}

// =============================================================================
// Control implementations
// =============================================================================

/// The standard a narrative cites, as far as it is known
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandardRef {
    pub id: String,
    pub name: String,
    /// Whether the standard was found among the project's standards
    pub known: bool,
}

/// The control family a narrative falls under
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyRef {
    pub id: String,
    pub abbrev: String,
    pub name: String,
    pub sort_key: String,
    /// Whether the family was found in the standard's catalog
    pub resolved: bool,
}

impl FamilyRef {
    /// Stub derived from the control key: `AC-2` gives family `AC`
    pub fn stub(control_key: &str) -> Self {
        Self::unresolved(control_key.split('-').next().unwrap_or(control_key))
    }

    /// Family known only by its id
    pub fn unresolved(id: &str) -> Self {
        let id = id.to_string();
        Self {
            abbrev: id.clone(),
            name: id.clone(),
            sort_key: id.clone(),
            id,
            resolved: false,
        }
    }

    pub(crate) fn overlay(&mut self, family: &Family) {
        self.id = family.id.clone();
        self.abbrev = family.abbrev.clone();
        self.name = family.name.clone();
        self.sort_key = family.sort_key.clone();
        self.resolved = true;
    }
}

/// How a cited control was tied to the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// The citation is itself a cataloged control
    Cataloged,
    /// The citation was matched to a parent control (e.g. `AC-2 (a)` to `AC-2`)
    Matched { control_id: String },
    /// Nothing in the catalog; only what the component file says is known
    Stub,
}

/// The control a narrative cites
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlRef {
    pub id: String,
    pub number: String,
    /// Display name; the raw key when nothing better is known
    pub name: String,
    pub family: Option<String>,
    pub description: Option<String>,
    pub sort_key: ControlSortKey,
    pub url: String,
    pub resolution: Resolution,
}

impl ControlRef {
    /// Reference built from a catalog entry alone, for controls no
    /// component implements yet
    pub fn from_catalog(control: &CatalogControl, url: String) -> Self {
        Self {
            id: control.id.clone(),
            number: control.number.clone(),
            name: control.name.clone(),
            family: Some(control.family.clone()),
            description: Some(control.description.clone()),
            sort_key: control.sort_key.clone(),
            url,
            resolution: Resolution::Cataloged,
        }
    }
}

/// Sort key of a narrative record: control first, then natural part key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ImplementationSortKey {
    pub control: ControlSortKey,
    pub part: NumberSortKey,
}

/// One narrative for one control part within one component
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlImplementation {
    pub component: Component,
    pub standard: StandardRef,
    pub family: FamilyRef,
    pub control: ControlRef,
    /// Part key, `None` for the control as a whole
    pub control_part: Option<String>,
    pub sort_key: ImplementationSortKey,
    pub narrative: String,
    /// Empty string when the file gives no status
    pub implementation_status: String,
    /// Verification keys of evidence covering this control
    pub evidence: Vec<String>,
    /// File the narrative was read from and is written back to
    pub source_file: PathBuf,
}

impl ControlImplementation {
    /// Whether this record is for `(standard, control, part)`
    pub fn is_for(&self, standard_key: &str, control_key: &str, part: Option<&str>) -> bool {
        self.standard.id == standard_key
            && self.control.id == control_key
            && self.control_part.as_deref() == part
    }
}

/// A piece of evidence declared by a component
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evidence {
    pub key: String,
    pub name: String,
    pub path: Option<String>,
    #[serde(rename = "type")]
    pub evidence_type: Option<String>,
    pub description: Option<String>,
    pub component: Component,
    pub source_file: PathBuf,
}
