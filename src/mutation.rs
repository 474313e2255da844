//! Narrative Mutation
//!
//! Edits narrative text and implementation status in component files.
//! Every write reads the whole file into memory, changes it there, encodes
//! the full document and only then replaces the file, so a failure never
//! leaves a half-written file behind.
//!
//! Key order survives a rewrite. Comments do not: the YAML library drops
//! them when the document is decoded. Indentation is not kept either. The
//! encoder writes block lists at their parent key's column, so a file
//! written as `satisfies:\n  - standard_key: ...` comes back as
//! `satisfies:\n- standard_key: ...` after its first edit.

use std::fmt;
use std::fs;
use std::path::{Component as PathComponent, Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::catalog::{
    load_component, load_components, load_manifest, load_project, load_standards, COMPONENT_FILE,
    MANIFEST_FILE,
};
use crate::document::{
    get_string, load_document, write_document, SchemaType, COMPONENT_SCHEMA_VERSIONS,
    SYSTEM_SCHEMA_VERSIONS,
};
use crate::error::{OpenControlError, Result};
use crate::model::{Component, ControlImplementation, Project};
use crate::narratives::{canonical_path, component_source_files, load_component_controls};

// =============================================================================
// Text normalization
// =============================================================================

fn trailing_space_before_newline() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+\n").expect("whitespace pattern is valid"))
}

/// Normalize narrative text before it is written.
///
/// Trims the ends and drops whitespace before line breaks. Returns `None`
/// for text that is empty afterwards. Multi-line text ends with exactly one
/// newline; single-line text never does. Applying it twice changes nothing.
pub fn clean_text(text: &str) -> Option<String> {
    let text = trailing_space_before_newline().replace_all(text.trim(), "\n");
    if text.is_empty() {
        return None;
    }
    if text.contains('\n') {
        Some(format!("{}\n", text))
    } else {
        Some(text.into_owned())
    }
}

// =============================================================================
// Edits
// =============================================================================

/// The editable fields of one narrative part and where it lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeEdit {
    pub standard_key: String,
    pub control_key: String,
    #[serde(default)]
    pub control_part: Option<String>,
    pub narrative: String,
    /// Empty clears the status
    #[serde(default)]
    pub implementation_status: String,
    /// File to rewrite; new narratives default to the component file
    #[serde(default)]
    pub source_file: Option<PathBuf>,
}

impl From<&ControlImplementation> for NarrativeEdit {
    fn from(ci: &ControlImplementation) -> Self {
        Self {
            standard_key: ci.standard.id.clone(),
            control_key: ci.control.id.clone(),
            control_part: ci.control_part.clone(),
            narrative: ci.narrative.clone(),
            implementation_status: ci.implementation_status.clone(),
            source_file: Some(ci.source_file.clone()),
        }
    }
}

impl NarrativeEdit {
    fn describe(&self) -> String {
        match &self.control_part {
            Some(part) => format!("{} {} part {}", self.standard_key, self.control_key, part),
            None => format!("{} {}", self.standard_key, self.control_key),
        }
    }
}

/// Whether an edit changes an existing narrative or adds a new one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    Update,
    New,
}

impl FromStr for EditMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "update" => Ok(EditMode::Update),
            "new" => Ok(EditMode::New),
            other => Err(format!("unknown edit mode `{}` (expected `update` or `new`)", other)),
        }
    }
}

impl fmt::Display for EditMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditMode::Update => write!(f, "update"),
            EditMode::New => write!(f, "new"),
        }
    }
}

// =============================================================================
// Document surgery
// =============================================================================

fn citation_matches(entry: &Value, standard_key: &str, control_key: &str) -> bool {
    entry.as_mapping().map_or(false, |m| {
        get_string(m, "standard_key").as_deref() == Some(standard_key)
            && get_string(m, "control_key").as_deref() == Some(control_key)
    })
}

fn part_matches(part: &Value, control_part: Option<&str>) -> bool {
    part.as_mapping()
        .map_or(false, |m| get_string(m, "key").as_deref() == control_part)
}

/// Write text and status into a narrative part mapping. Absent keys, not
/// empty strings, represent "no value".
fn apply_fields(part: &mut Mapping, edit: &NarrativeEdit) {
    match clean_text(&edit.narrative) {
        Some(text) => {
            part.insert(Value::from("text"), Value::from(text));
        }
        None => {
            part.shift_remove("text");
        }
    }
    match clean_text(&edit.implementation_status) {
        Some(status) => {
            part.insert(Value::from("implementation_status"), Value::from(status));
        }
        None => {
            part.shift_remove("implementation_status");
        }
    }
}

/// The list stored under `key`, created empty when the key is absent or null
fn sequence_mut<'a>(
    mapping: &'a mut Mapping,
    key: &str,
    path: &Path,
    schema_type: SchemaType,
) -> Result<&'a mut Vec<Value>> {
    if matches!(mapping.get(key), None | Some(Value::Null)) {
        mapping.insert(Value::from(key), Value::Sequence(Vec::new()));
    }
    mapping
        .get_mut(key)
        .and_then(Value::as_sequence_mut)
        .ok_or_else(|| OpenControlError::InvalidDocument {
            schema_type: schema_type.label(),
            path: path.to_path_buf(),
            reason: format!("`{}` should be a list", key),
        })
}

/// Rewrite the text and status of an existing narrative part.
///
/// Returns `Ok(false)` when the file no longer holds a matching part, which
/// happens when the caller's view of the file is stale.
pub fn update_control_narrative(edit: &NarrativeEdit) -> Result<bool> {
    let path = edit
        .source_file
        .as_deref()
        .ok_or_else(|| OpenControlError::InvalidEdit("no source file to update".to_string()))?;
    let mut document = load_document(path, SchemaType::Component, &[])?;

    let Some(Value::Sequence(satisfies)) = document.get_mut("satisfies") else {
        return Ok(false);
    };

    let part = satisfies
        .iter_mut()
        .filter(|entry| citation_matches(entry, &edit.standard_key, &edit.control_key))
        .filter_map(|entry| match entry.get_mut("narrative") {
            Some(Value::Sequence(parts)) => Some(parts),
            _ => None,
        })
        .flat_map(|parts| parts.iter_mut())
        .find(|part| part_matches(part, edit.control_part.as_deref()))
        .and_then(Value::as_mapping_mut);

    let Some(part) = part else {
        tracing::debug!(path = %path.display(), narrative = %edit.describe(), "narrative not found for update");
        return Ok(false);
    };
    apply_fields(part, edit);

    write_document(path, SchemaType::Component, &document)?;
    tracing::debug!(path = %path.display(), narrative = %edit.describe(), "updated narrative");
    Ok(true)
}

/// Append a new narrative part, creating the control citation if the file
/// has none for this control yet.
///
/// Fails with `InvalidEdit` if `source_file` is neither the component file
/// nor a file it includes, and with `ConflictOnAdd` if the part already
/// exists in the file.
pub fn add_control_narrative(component: &Component, edit: &NarrativeEdit) -> Result<()> {
    let path = edit.source_file.clone().unwrap_or_else(|| component.file.clone());
    let target = canonical_path(&path);
    let owned = component_source_files(component)?
        .iter()
        .any(|file| canonical_path(file) == target);
    if !owned {
        return Err(OpenControlError::InvalidEdit(format!(
            "File `{}` is not part of component `{}`.",
            path.display(),
            component.id
        )));
    }

    let expected: &[&str] = if target == canonical_path(&component.file) {
        COMPONENT_SCHEMA_VERSIONS
    } else {
        &[]
    };
    let mut document = load_document(&path, SchemaType::Component, expected)?;

    let satisfies = sequence_mut(&mut document, "satisfies", &path, SchemaType::Component)?;
    let index = match satisfies
        .iter()
        .position(|entry| citation_matches(entry, &edit.standard_key, &edit.control_key))
    {
        Some(index) => index,
        None => {
            let mut citation = Mapping::new();
            citation.insert(Value::from("standard_key"), Value::from(edit.standard_key.as_str()));
            citation.insert(Value::from("control_key"), Value::from(edit.control_key.as_str()));
            satisfies.push(Value::Mapping(citation));
            satisfies.len() - 1
        }
    };
    let citation = satisfies[index].as_mapping_mut().ok_or_else(|| OpenControlError::InvalidDocument {
        schema_type: SchemaType::Component.label(),
        path: path.clone(),
        reason: format!("citation for {} is not a mapping", edit.describe()),
    })?;

    let parts = sequence_mut(citation, "narrative", &path, SchemaType::Component)?;
    if parts.iter().any(|part| part_matches(part, edit.control_part.as_deref())) {
        return Err(OpenControlError::ConflictOnAdd {
            standard: edit.standard_key.clone(),
            control: edit.control_key.clone(),
            part: edit.control_part.clone(),
            path,
        });
    }

    let mut part = Mapping::new();
    if let Some(key) = &edit.control_part {
        part.insert(Value::from("key"), Value::from(key.as_str()));
    }
    apply_fields(&mut part, edit);
    parts.push(Value::Mapping(part));

    write_document(&path, SchemaType::Component, &document)?;
    tracing::debug!(path = %path.display(), narrative = %edit.describe(), "added narrative");
    Ok(())
}

// =============================================================================
// Project-level operations
// =============================================================================

/// Save a user's edit to a component's narrative and return the record as
/// it now reads from disk.
pub fn save_narrative(
    project: &Project,
    component_id: &str,
    edit: &NarrativeEdit,
    mode: EditMode,
) -> Result<ControlImplementation> {
    if edit.narrative.trim().is_empty() {
        return Err(OpenControlError::InvalidEdit("Narrative cannot be empty.".to_string()));
    }

    let component = load_component(project, component_id)?;
    let standards = load_standards(project)?;
    let part = edit.control_part.as_deref();
    let existing = load_component_controls(&component, &standards)?
        .into_iter()
        .find(|ci| ci.is_for(&edit.standard_key, &edit.control_key, part));

    match (mode, existing) {
        (EditMode::New, Some(existing)) => {
            return Err(OpenControlError::ConflictOnAdd {
                standard: edit.standard_key.clone(),
                control: edit.control_key.clone(),
                part: edit.control_part.clone(),
                path: existing.source_file,
            })
        }
        (EditMode::Update, Some(existing)) => {
            let edit = NarrativeEdit {
                source_file: Some(existing.source_file),
                ..edit.clone()
            };
            if !update_control_narrative(&edit)? {
                return Err(OpenControlError::not_found("narrative", edit.describe()));
            }
        }
        (EditMode::Update, None) => {
            return Err(OpenControlError::not_found("narrative", edit.describe()));
        }
        (EditMode::New, None) => add_control_narrative(&component, edit)?,
    }

    load_component_controls(&component, &standards)?
        .into_iter()
        .find(|ci| ci.is_for(&edit.standard_key, &edit.control_key, part))
        .ok_or_else(|| OpenControlError::not_found("narrative", edit.describe()))
}

/// Create a component directory inside the project and register it in the
/// project manifest.
pub fn create_component(project: &Project, path: &str, name: &str) -> Result<Component> {
    let name = name.trim();
    if name.is_empty() {
        return Err(OpenControlError::InvalidEdit("Component name cannot be empty.".to_string()));
    }
    let relative = Path::new(path.trim());
    let is_plain_relative = !relative.as_os_str().is_empty()
        && relative
            .components()
            .all(|c| matches!(c, PathComponent::Normal(_) | PathComponent::CurDir));
    if !is_plain_relative {
        return Err(OpenControlError::InvalidEdit(format!(
            "Component path `{}` must be a relative path inside the project.",
            path
        )));
    }
    let directory = project.path.join(relative);
    if directory.exists() {
        return Err(OpenControlError::InvalidEdit(format!(
            "Component path `{}` already exists.",
            path
        )));
    }

    let mut manifest = load_manifest(project)?;

    let file = directory.join(COMPONENT_FILE);
    fs::create_dir_all(&directory).map_err(|source| OpenControlError::Io {
        schema_type: SchemaType::Component.label(),
        path: directory.clone(),
        source,
    })?;
    let mut definition = Mapping::new();
    definition.insert(Value::from("schema_version"), Value::from(COMPONENT_SCHEMA_VERSIONS[0]));
    definition.insert(Value::from("name"), Value::from(name));
    definition.insert(Value::from("satisfies"), Value::Sequence(Vec::new()));
    write_document(&file, SchemaType::Component, &definition)?;

    let declared = relative.to_string_lossy().replace('\\', "/");
    sequence_mut(&mut manifest, "components", &project.manifest_path, SchemaType::System)?
        .push(Value::from(declared));
    write_document(&project.manifest_path, SchemaType::System, &manifest)?;
    tracing::info!(project = %project.id, path = %path, "created component");

    load_components(project)?
        .into_iter()
        .find(|c| c.file == file)
        .ok_or_else(|| OpenControlError::not_found("component", path))
}

/// Scaffold a new project: `directory` is created if needed and gets a
/// manifest with no components, standards or certifications yet.
///
/// Blank `organization_name` and `description` are left out of the
/// manifest. Fails with `InvalidEdit` if the name is blank or the
/// directory already holds a manifest.
pub fn create_project(
    directory: &Path,
    name: &str,
    organization_name: &str,
    description: &str,
) -> Result<Project> {
    let name = name.trim();
    if name.is_empty() {
        return Err(OpenControlError::InvalidEdit("The system name cannot be empty.".to_string()));
    }
    if directory.as_os_str().is_empty() {
        return Err(OpenControlError::InvalidEdit("The repository path cannot be empty.".to_string()));
    }
    let manifest_path = directory.join(MANIFEST_FILE);
    if manifest_path.exists() {
        return Err(OpenControlError::InvalidEdit(format!(
            "`{}` already holds a project.",
            directory.display()
        )));
    }

    fs::create_dir_all(directory).map_err(|source| OpenControlError::Io {
        schema_type: SchemaType::System.label(),
        path: directory.to_path_buf(),
        source,
    })?;

    let mut metadata = Mapping::new();
    if let Some(description) = clean_text(description) {
        metadata.insert(Value::from("description"), Value::from(description));
    }
    let organization_name = organization_name.trim();
    if !organization_name.is_empty() {
        let mut organization = Mapping::new();
        organization.insert(Value::from("name"), Value::from(organization_name));
        metadata.insert(Value::from("organization"), Value::Mapping(organization));
    }

    let mut manifest = Mapping::new();
    manifest.insert(Value::from("schema_version"), Value::from(SYSTEM_SCHEMA_VERSIONS[0]));
    manifest.insert(Value::from("name"), Value::from(name));
    if !metadata.is_empty() {
        manifest.insert(Value::from("metadata"), Value::Mapping(metadata));
    }
    for key in ["components", "standards", "certifications"] {
        manifest.insert(Value::from(key), Value::Sequence(Vec::new()));
    }
    write_document(&manifest_path, SchemaType::System, &manifest)?;
    tracing::info!(path = %directory.display(), name = %name, "created project");

    load_project(directory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const COMPONENT: &str = "\
schema_version: 3.0.0
name: Drupal
satisfies:
  - standard_key: NIST-800-53
    control_key: AC-2
    covered_by:
      - verification_key: screenshot
    narrative:
      - key: a
        text: |
          Accounts are reviewed.
          Quarterly.
        implementation_status: partial
      - key: b
        text: Disabled after 90 days.
";

    fn sample_project(root: &Path) -> Project {
        fs::write(
            root.join("opencontrol.yaml"),
            "schema_version: 1.0.0\nname: Mutation\ncomponents:\n  - components/Drupal\nstandards:\n  - standards/NIST.yaml\n",
        )
        .unwrap();
        fs::create_dir_all(root.join("standards")).unwrap();
        fs::write(
            root.join("standards/NIST.yaml"),
            "name: NIST-800-53\nAC-2:\n  name: Account Management\n  family: AC\n  description: Manage accounts.\n",
        )
        .unwrap();
        fs::create_dir_all(root.join("components/Drupal")).unwrap();
        fs::write(root.join("components/Drupal/component.yaml"), COMPONENT).unwrap();
        load_project(root).unwrap()
    }

    fn narratives(project: &Project) -> Vec<ControlImplementation> {
        let component = &load_components(project).unwrap()[0];
        let standards = load_standards(project).unwrap();
        load_component_controls(component, &standards).unwrap()
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  one line  "), Some("one line".to_string()));
        assert_eq!(clean_text("a   \n  b\n\n"), Some("a\n  b\n".to_string()));
        assert_eq!(clean_text(" \n\t "), None);
        assert_eq!(clean_text(""), None);

        let once = clean_text("first \nsecond  \n").unwrap();
        assert_eq!(clean_text(&once), Some(once.clone()));
    }

    #[test]
    fn test_unchanged_update_round_trips() {
        let dir = tempdir().unwrap();
        let project = sample_project(dir.path());
        let before = narratives(&project);

        for ci in &before {
            assert!(update_control_narrative(&NarrativeEdit::from(ci)).unwrap());
        }

        let after = narratives(&project);
        let texts = |records: &[ControlImplementation]| {
            records.iter().map(|ci| ci.narrative.clone()).collect::<Vec<_>>()
        };
        assert_eq!(texts(&before), texts(&after));
        assert_eq!(after[0].narrative, "Accounts are reviewed.\nQuarterly.\n");
        assert_eq!(after[0].evidence, vec!["screenshot".to_string()]);

        let text = fs::read_to_string(dir.path().join("components/Drupal/component.yaml")).unwrap();
        let order: Vec<usize> = ["schema_version", "name", "satisfies"]
            .iter()
            .map(|k| text.find(k).unwrap())
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]));
        // Block lists are re-indented to their parent key's column.
        assert!(text.contains("satisfies:\n- standard_key: NIST-800-53\n"));
    }

    #[test]
    fn test_empty_status_removes_key() {
        let dir = tempdir().unwrap();
        let project = sample_project(dir.path());
        let record = &narratives(&project)[0];

        let edit = NarrativeEdit {
            implementation_status: String::new(),
            ..NarrativeEdit::from(record)
        };
        assert!(update_control_narrative(&edit).unwrap());

        let text = fs::read_to_string(&record.source_file).unwrap();
        assert!(!text.contains("implementation_status"));
        assert_eq!(narratives(&project)[0].implementation_status, "");
    }

    #[test]
    fn test_update_missing_part_is_false() {
        let dir = tempdir().unwrap();
        let project = sample_project(dir.path());
        let record = &narratives(&project)[0];
        let edit = NarrativeEdit {
            control_part: Some("z".to_string()),
            ..NarrativeEdit::from(record)
        };
        assert!(!update_control_narrative(&edit).unwrap());
    }

    #[test]
    fn test_add_narratives_and_conflict() {
        let dir = tempdir().unwrap();
        let project = sample_project(dir.path());
        let component = &load_components(&project).unwrap()[0];

        let new_part = NarrativeEdit {
            standard_key: "NIST-800-53".to_string(),
            control_key: "AC-2".to_string(),
            control_part: Some("c".to_string()),
            narrative: "Logged.".to_string(),
            implementation_status: "complete".to_string(),
            source_file: None,
        };
        add_control_narrative(component, &new_part).unwrap();

        let new_control = NarrativeEdit {
            control_key: "AC-3".to_string(),
            control_part: None,
            implementation_status: String::new(),
            ..new_part.clone()
        };
        add_control_narrative(component, &new_control).unwrap();

        let records = narratives(&project);
        assert_eq!(records.len(), 4);
        assert!(records.iter().any(|ci| ci.is_for("NIST-800-53", "AC-2", Some("c"))
            && ci.implementation_status == "complete"));
        assert!(records.iter().any(|ci| ci.is_for("NIST-800-53", "AC-3", None)));

        let err = add_control_narrative(component, &new_part).unwrap_err();
        assert!(matches!(err, OpenControlError::ConflictOnAdd { .. }));
    }

    #[test]
    fn test_add_rejects_file_outside_component() {
        let dir = tempdir().unwrap();
        let project = sample_project(dir.path());
        let component_id = load_components(&project).unwrap()[0].id.clone();
        let stray = dir.path().join("components/stray.yaml");
        let original = "satisfies:\n  - standard_key: NIST-800-53\n    control_key: AC-1\n";
        fs::write(&stray, original).unwrap();

        let edit = NarrativeEdit {
            standard_key: "NIST-800-53".to_string(),
            control_key: "AC-2".to_string(),
            control_part: Some("z".to_string()),
            narrative: "Written elsewhere.".to_string(),
            implementation_status: String::new(),
            source_file: Some(stray.clone()),
        };
        let err = save_narrative(&project, &component_id, &edit, EditMode::New).unwrap_err();
        assert!(matches!(err, OpenControlError::InvalidEdit(_)));
        assert_eq!(fs::read_to_string(&stray).unwrap(), original);
        assert_eq!(narratives(&project).len(), 2);
    }

    #[test]
    fn test_status_is_normalized() {
        let dir = tempdir().unwrap();
        let project = sample_project(dir.path());
        let record = &narratives(&project)[1];

        let edit = NarrativeEdit {
            implementation_status: "  complete \n".to_string(),
            ..NarrativeEdit::from(record)
        };
        assert!(update_control_narrative(&edit).unwrap());
        assert_eq!(narratives(&project)[1].implementation_status, "complete");

        let blank = NarrativeEdit {
            implementation_status: " \n\t".to_string(),
            ..NarrativeEdit::from(record)
        };
        assert!(update_control_narrative(&blank).unwrap());
        let text = fs::read_to_string(&record.source_file).unwrap();
        assert_eq!(text.matches("implementation_status").count(), 1);
    }

    #[test]
    fn test_save_narrative_modes() {
        let dir = tempdir().unwrap();
        let project = sample_project(dir.path());
        let component_id = load_components(&project).unwrap()[0].id.clone();

        let mut edit = NarrativeEdit {
            standard_key: "NIST-800-53".to_string(),
            control_key: "AC-2".to_string(),
            control_part: Some("b".to_string()),
            narrative: "  Disabled after 30 days.  ".to_string(),
            implementation_status: "complete".to_string(),
            source_file: None,
        };
        let saved = save_narrative(&project, &component_id, &edit, EditMode::Update).unwrap();
        assert_eq!(saved.narrative, "Disabled after 30 days.");
        assert_eq!(saved.implementation_status, "complete");

        let err = save_narrative(&project, &component_id, &edit, EditMode::New).unwrap_err();
        assert!(matches!(err, OpenControlError::ConflictOnAdd { .. }));

        edit.control_part = Some("d".to_string());
        assert!(save_narrative(&project, &component_id, &edit, EditMode::Update)
            .unwrap_err()
            .is_not_found());
        let added = save_narrative(&project, &component_id, &edit, EditMode::New).unwrap();
        assert_eq!(added.control.name, "Account Management");

        edit.narrative = "   ".to_string();
        let err = save_narrative(&project, &component_id, &edit, EditMode::Update).unwrap_err();
        assert!(matches!(err, OpenControlError::InvalidEdit(_)));
    }

    #[test]
    fn test_create_component() {
        let dir = tempdir().unwrap();
        let project = sample_project(dir.path());

        let created = create_component(&project, "components/AWS", "Amazon Web Services").unwrap();
        assert_eq!(created.name, "Amazon Web Services");
        assert_eq!(created.id, "AWS");
        assert!(dir.path().join("components/AWS/component.yaml").is_file());
        assert_eq!(load_components(&project).unwrap().len(), 2);

        assert!(create_component(&project, "components/AWS", "Again").is_err());
        assert!(create_component(&project, "../outside", "Out").is_err());
        assert!(create_component(&project, "components/New", " ").is_err());
    }

    #[test]
    fn test_create_project() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("new-system");

        let project = create_project(&root, " Payroll ", "Department of Examples", "Pays people.").unwrap();
        assert_eq!(project.title, "Payroll");
        assert_eq!(project.organization.name, "Department of Examples");
        assert_eq!(project.description.as_deref(), Some("Pays people."));
        assert!(load_components(&project).unwrap().is_empty());
        assert!(load_standards(&project).unwrap().is_empty());

        let created = create_component(&project, "components/App", "App").unwrap();
        assert_eq!(load_components(&project).unwrap(), vec![created]);

        let err = create_project(&root, "Again", "", "").unwrap_err();
        assert!(matches!(err, OpenControlError::InvalidEdit(_)));
        assert!(create_project(&dir.path().join("other"), "  ", "", "").is_err());

        let bare = create_project(&dir.path().join("bare"), "Bare", "", "").unwrap();
        assert_eq!(bare.organization.name, "No Organization");
        assert_eq!(bare.description, None);
    }

    #[test]
    fn test_edit_mode_parses() {
        assert_eq!("update".parse::<EditMode>(), Ok(EditMode::Update));
        assert_eq!("new".parse::<EditMode>(), Ok(EditMode::New));
        assert!("delete".parse::<EditMode>().is_err());
        assert_eq!(EditMode::New.to_string(), "new");
    }
}
