//! Project, Component and Standard Catalog Reader
//!
//! Walks a project's `opencontrol.yaml` manifest to find its components,
//! standards and certifications. Nothing is cached: every call re-reads the
//! files it needs.

use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};

use crate::document::{
    get_mapping, get_string, get_string_list, load_document, scalar_string, SchemaType,
    COMPONENT_SCHEMA_VERSIONS, SYSTEM_SCHEMA_VERSIONS,
};
use crate::error::{OpenControlError, Result};
use crate::ids::{common_base, component_id, organization_id, project_id, url_segment};
use crate::model::{
    CatalogControl, CertifiedControls, Component, Family, Organization, Project, Standard,
    Standards,
};

/// File name of the manifest at a project root (and in standards directories)
pub const MANIFEST_FILE: &str = "opencontrol.yaml";

/// File name of a component definition inside a component directory
pub const COMPONENT_FILE: &str = "component.yaml";

/// Schema versions understood for a standards directory manifest
const STANDARDS_SCHEMA_VERSIONS: &[&str] = &["1.0.0"];

const DEFAULT_ORGANIZATION: &str = "No Organization";

/// Load the project rooted at `path`.
///
/// `path` may be the project directory or the manifest file itself.
pub fn load_project(path: impl AsRef<Path>) -> Result<Project> {
    let (root, manifest_path) = manifest_location(path.as_ref());
    let manifest = load_document(&manifest_path, SchemaType::System, SYSTEM_SCHEMA_VERSIONS)?;

    let name = get_string(&manifest, "name")
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| last_segment(&root));

    let metadata = get_mapping(&manifest, "metadata");
    let meta_string = |key: &str| metadata.and_then(|m| get_string(m, key));
    let organization = metadata.and_then(|m| get_mapping(m, "organization"));
    let organization_name = organization
        .and_then(|o| get_string(o, "name"))
        .unwrap_or_else(|| DEFAULT_ORGANIZATION.to_string());
    let organization_abbrev = organization
        .and_then(|o| get_string(o, "abbreviation"))
        .unwrap_or_else(|| organization_name.clone());

    let organization = Organization {
        id: organization_id(&organization_abbrev, &organization_name),
        name: organization_name,
        abbreviation: organization_abbrev,
    };
    let id = project_id(&name, &manifest_path);
    let url = format!(
        "/organizations/{}/projects/{}",
        url_segment(&organization.id),
        url_segment(&id)
    );

    Ok(Project {
        id,
        organization,
        title: name,
        description: meta_string("description"),
        source_repository: meta_string("repository"),
        authorization_id: meta_string("authorization_id"),
        path: root,
        manifest_path,
        url,
    })
}

fn manifest_location(path: &Path) -> (PathBuf, PathBuf) {
    if path.is_file() {
        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        (root, path.to_path_buf())
    } else {
        (path.to_path_buf(), path.join(MANIFEST_FILE))
    }
}

pub(crate) fn load_manifest(project: &Project) -> Result<Mapping> {
    load_document(&project.manifest_path, SchemaType::System, SYSTEM_SCHEMA_VERSIONS)
}

fn last_segment(path: &Path) -> String {
    path.components()
        .last()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .unwrap_or_default()
}

// =============================================================================
// Components
// =============================================================================

/// List the project's components in manifest order.
pub fn load_components(project: &Project) -> Result<Vec<Component>> {
    let manifest = load_manifest(project)?;
    let declared = get_string_list(&manifest, "components");
    let declared_paths: Vec<PathBuf> = declared.iter().map(PathBuf::from).collect();
    let base = common_base(&declared_paths);

    let mut components = Vec::with_capacity(declared.len());
    for component_path in &declared {
        let (dir, file) = component_location(&project.path.join(component_path));
        let definition = load_document(&file, SchemaType::Component, COMPONENT_SCHEMA_VERSIONS)?;

        let name = get_string(&definition, "name")
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| {
                let stem = Path::new(component_path)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned());
                match stem.as_deref() {
                    Some(s) if s != "component" => s.to_string(),
                    _ => last_segment(&dir),
                }
            });
        let id = component_id(&name, component_path, base.as_deref());
        let url = format!("{}/components/{}", project.url, url_segment(&id));

        components.push(Component {
            id,
            project_id: project.id.clone(),
            project_url: project.url.clone(),
            name,
            path: dir,
            file,
            url,
        });
    }

    tracing::debug!(project = %project.id, count = components.len(), "loaded components");
    Ok(components)
}

fn component_location(path: &Path) -> (PathBuf, PathBuf) {
    if path.is_dir() {
        (path.to_path_buf(), path.join(COMPONENT_FILE))
    } else {
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        (dir, path.to_path_buf())
    }
}

/// Find one component by id. A linear scan, which is fine for the
/// dozens-to-hundreds of components a project has.
pub fn load_component(project: &Project, id: &str) -> Result<Component> {
    load_components(project)?
        .into_iter()
        .find(|c| c.id == id)
        .ok_or_else(|| OpenControlError::not_found("component", id))
}

// =============================================================================
// Standards
// =============================================================================

/// Load every standard the manifest references, keyed by standard id.
///
/// A reference may be a standard file or a directory with its own
/// `opencontrol.yaml` listing standard files.
pub fn load_standards(project: &Project) -> Result<Standards> {
    let manifest = load_manifest(project)?;
    let mut standards = Standards::new();

    for reference in get_string_list(&manifest, "standards") {
        let location = project.path.join(&reference);
        if location.is_dir() {
            let listing_path = location.join(MANIFEST_FILE);
            let listing =
                load_document(&listing_path, SchemaType::Standards, STANDARDS_SCHEMA_VERSIONS)?;
            for file in get_string_list(&listing, "standards") {
                let standard = load_standard(&location.join(file))?;
                standards.insert(standard.id.clone(), standard);
            }
        } else {
            let standard = load_standard(&location)?;
            standards.insert(standard.id.clone(), standard);
        }
    }

    tracing::debug!(project = %project.id, count = standards.len(), "loaded standards");
    Ok(standards)
}

/// Load a single control catalog file.
pub fn load_standard(path: &Path) -> Result<Standard> {
    let document = load_document(path, SchemaType::Standard, &[])?;
    Ok(parse_standard(&document, path))
}

fn parse_standard(document: &Mapping, path: &Path) -> Standard {
    let file_stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let declared_name = get_string(document, "name").filter(|n| !n.is_empty());
    let id = declared_name.clone().unwrap_or(file_stem);
    let mut standard = Standard::new(id.clone(), declared_name.unwrap_or_else(|| id.clone()));

    for (key, value) in document {
        let Some(key) = scalar_string(key) else { continue };
        let Some(entry) = value.as_mapping() else { continue };
        if key == "name" {
            continue;
        }

        let entry_name = get_string(entry, "name").unwrap_or_else(|| key.clone());
        match get_string(entry, "type").as_deref() {
            Some("family") => {
                standard.families.insert(key.clone(), Family::new(&key, entry_name));
            }
            Some(other) => {
                tracing::debug!(standard = %id, entry = %key, kind = other, "skipping typed entry");
            }
            None => {
                let family = get_string(entry, "family")
                    .unwrap_or_else(|| key.split('-').next().unwrap_or(&key).to_string());
                let description = get_string(entry, "description").unwrap_or_default();
                standard.controls.insert(
                    key.clone(),
                    CatalogControl::new(&id, &key, entry_name, family, description),
                );
            }
        }
    }

    standard
}

// =============================================================================
// Certifications
// =============================================================================

/// Union of the (standard, control) pairs selected by every certification.
///
/// Standards named here need not be loaded; the set only filters.
pub fn load_certified_controls(project: &Project) -> Result<CertifiedControls> {
    let manifest = load_manifest(project)?;
    let mut certified = CertifiedControls::default();

    for reference in get_string_list(&manifest, "certifications") {
        let path = project.path.join(&reference);
        let certification = load_document(&path, SchemaType::Certification, &[])?;
        let Some(selected) = get_mapping(&certification, "standards") else {
            continue;
        };
        for (standard_key, controls) in selected {
            let Some(standard_key) = scalar_string(standard_key) else { continue };
            for control_key in certification_controls(controls) {
                certified.insert(standard_key.clone(), control_key);
            }
        }
    }

    Ok(certified)
}

fn certification_controls(controls: &Value) -> Vec<String> {
    match controls {
        Value::Sequence(seq) => seq.iter().filter_map(scalar_string).collect(),
        Value::Mapping(map) => map.keys().filter_map(scalar_string).collect(),
        _ => Vec::new(),
    }
}

// =============================================================================
// Project registry
// =============================================================================

/// The set of project directories this process serves
#[derive(Debug, Clone, Default)]
pub struct ProjectRegistry {
    paths: Vec<PathBuf>,
}

impl ProjectRegistry {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Load every registered project, in registration order
    pub fn projects(&self) -> Result<Vec<Project>> {
        self.paths.iter().map(load_project).collect()
    }

    /// Components of every registered project, sorted by name
    pub fn all_components(&self) -> Result<Vec<Component>> {
        let mut components = Vec::new();
        for project in self.projects()? {
            components.extend(load_components(&project)?);
        }
        components.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.url.cmp(&b.url)));
        Ok(components)
    }

    /// Find a project by organization id and project id
    pub fn find(&self, organization_id: &str, project_id: &str) -> Result<Project> {
        for path in &self.paths {
            let project = load_project(path)?;
            if project.organization.id == organization_id && project.id == project_id {
                return Ok(project);
            }
        }
        Err(OpenControlError::not_found(
            "project",
            format!("{}/{}", organization_id, project_id),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const MANIFEST: &str = "\
schema_version: 1.0.0
name: Agency App
metadata:
  description: An application
  repository: https://example.com/repo.git
  organization:
    name: Department of Examples
    abbreviation: DoE
components:
  - components/Drupal
  - components/AWS
standards:
  - standards/nist.yaml
certifications:
  - certifications/low.yaml
";

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn sample_project(root: &Path) {
        write(root, "opencontrol.yaml", MANIFEST);
        write(root, "components/Drupal/component.yaml", "schema_version: 3.0.0\nname: Drupal\nsatisfies: []\n");
        write(root, "components/AWS/component.yaml", "schema_version: 3.0.0\nname: Amazon Web Services\n");
        write(
            root,
            "standards/nist.yaml",
            "name: NIST-800-53\nAC:\n  type: family\n  name: Access Control\nAC-2:\n  name: Account Management\n  family: AC\n  description: Manage accounts.\nAC-10:\n  name: Concurrent Session Control\n  family: AC\n  description: Limit sessions.\n",
        );
        write(root, "certifications/low.yaml", "name: Low\nstandards:\n  NIST-800-53:\n    - AC-2\n  OTHER:\n    X-1: {}\n");
    }

    #[test]
    fn test_load_project_metadata() {
        let dir = tempdir().unwrap();
        sample_project(dir.path());

        let project = load_project(dir.path()).unwrap();
        assert_eq!(project.title, "Agency App");
        assert!(project.id.starts_with("Agency App-"));
        assert_eq!(project.organization.abbreviation, "DoE");
        assert!(project.organization.id.starts_with("DoE-"));
        assert_eq!(project.description.as_deref(), Some("An application"));
        assert_eq!(project.source_repository.as_deref(), Some("https://example.com/repo.git"));
        assert!(project.url.starts_with("/organizations/DoE-"));

        // Same project through the manifest path.
        let again = load_project(dir.path().join(MANIFEST_FILE)).unwrap();
        assert_eq!(again.id, project.id);
    }

    #[test]
    fn test_project_without_organization() {
        let dir = tempdir().unwrap();
        write(dir.path(), "opencontrol.yaml", "schema_version: 1.0.0\nname: Bare\n");
        let project = load_project(dir.path()).unwrap();
        assert_eq!(project.organization.name, "No Organization");
        assert_eq!(project.organization.abbreviation, "No Organization");
        assert!(load_components(&project).unwrap().is_empty());
        assert!(load_standards(&project).unwrap().is_empty());
    }

    #[test]
    fn test_components_in_manifest_order() {
        let dir = tempdir().unwrap();
        sample_project(dir.path());
        let project = load_project(dir.path()).unwrap();

        let components = load_components(&project).unwrap();
        let ids: Vec<_> = components.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["Drupal", "AWS"]);
        assert_eq!(components[1].name, "Amazon Web Services");
        assert_eq!(components[0].file, dir.path().join("components/Drupal/component.yaml"));
        assert_eq!(components[1].url, format!("{}/components/AWS", project.url));
    }

    #[test]
    fn test_load_component_not_found() {
        let dir = tempdir().unwrap();
        sample_project(dir.path());
        let project = load_project(dir.path()).unwrap();

        assert_eq!(load_component(&project, "AWS").unwrap().name, "Amazon Web Services");
        let err = load_component(&project, "GCP").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_bad_component_version_fails_listing() {
        let dir = tempdir().unwrap();
        sample_project(dir.path());
        write(dir.path(), "components/AWS/component.yaml", "schema_version: 2.0.0\nname: AWS\n");
        let project = load_project(dir.path()).unwrap();
        assert!(matches!(
            load_components(&project),
            Err(OpenControlError::UnsupportedSchema { .. })
        ));
    }

    #[test]
    fn test_standards_split_families_and_controls() {
        let dir = tempdir().unwrap();
        sample_project(dir.path());
        let project = load_project(dir.path()).unwrap();

        let standards = load_standards(&project).unwrap();
        let nist = &standards["NIST-800-53"];
        assert_eq!(nist.name, "NIST-800-53");
        assert_eq!(nist.families.len(), 1);
        assert_eq!(nist.families["AC"].name, "Access Control");
        assert_eq!(nist.controls.len(), 2);
        assert_eq!(nist.controls["AC-2"].name, "Account Management");
        assert!(nist.controls["AC-2"].sort_key < nist.controls["AC-10"].sort_key);
    }

    #[test]
    fn test_standard_name_falls_back_to_file_stem() {
        let dir = tempdir().unwrap();
        write(dir.path(), "hipaa-draft.yaml", "164.308:\n  name: Administrative safeguards\n  family: '164'\n  description: d\n");
        let standard = load_standard(&dir.path().join("hipaa-draft.yaml")).unwrap();
        assert_eq!(standard.id, "hipaa-draft");
        assert!(standard.controls.contains_key("164.308"));
    }

    #[test]
    fn test_standards_directory_layout() {
        let dir = tempdir().unwrap();
        write(dir.path(), "opencontrol.yaml", "schema_version: 1.0.0\nname: P\nstandards:\n  - standards\n");
        write(dir.path(), "standards/opencontrol.yaml", "schema_version: 1.0.0\nstandards:\n  - a.yaml\n  - b.yaml\n");
        write(dir.path(), "standards/a.yaml", "name: A\nA-1:\n  name: One\n  family: A\n  description: d\n");
        write(dir.path(), "standards/b.yaml", "B-1:\n  name: One\n  family: B\n  description: d\n");

        let project = load_project(dir.path()).unwrap();
        let standards = load_standards(&project).unwrap();
        assert_eq!(standards.keys().collect::<Vec<_>>(), vec!["A", "b"]);
    }

    #[test]
    fn test_certified_controls_union() {
        let dir = tempdir().unwrap();
        sample_project(dir.path());
        let project = load_project(dir.path()).unwrap();

        let certified = load_certified_controls(&project).unwrap();
        assert_eq!(certified.len(), 2);
        assert!(certified.contains("NIST-800-53", "AC-2"));
        assert!(certified.contains("OTHER", "X-1"));
        assert!(!certified.contains("NIST-800-53", "AC-10"));
    }

    #[test]
    fn test_registry_find() {
        let dir = tempdir().unwrap();
        sample_project(dir.path());
        let project = load_project(dir.path()).unwrap();

        let registry = ProjectRegistry::new(vec![dir.path().to_path_buf()]);
        assert_eq!(registry.projects().unwrap().len(), 1);
        let found = registry.find(&project.organization.id, &project.id).unwrap();
        assert_eq!(found, project);
        assert!(registry.find("nobody", &project.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_registry_all_components() {
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        sample_project(first.path());
        write(
            second.path(),
            "opencontrol.yaml",
            "schema_version: 1.0.0\nname: Second\ncomponents:\n  - ./Backup\n",
        );
        write(second.path(), "Backup/component.yaml", "schema_version: 3.0.0\nname: Backups\n");

        let registry = ProjectRegistry::new(vec![first.path().to_path_buf(), second.path().to_path_buf()]);
        let components = registry.all_components().unwrap();
        let names: Vec<&str> = components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Amazon Web Services", "Backups", "Drupal"]);
        assert_ne!(components[0].project_id, components[1].project_id);
    }
}
