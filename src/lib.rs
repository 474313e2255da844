//! Control Narratives
//!
//! Reads OpenControl compliance projects from disk, merges each component's
//! control narratives with the control catalogs of the project's standards,
//! and writes narrative edits back into the component YAML files.
//!
//! ## Features
//!
//! - **Project Catalog**: manifest, components, standards and certifications
//! - **Narrative Aggregation**: `satisfies` entries with file includes,
//!   merged with catalog metadata and flattened to one record per part
//! - **Control Index**: project-wide control listing filtered by
//!   certification, per-control detail, component comparison, statistics
//! - **Mutation**: in-place narrative edits that keep key order, new
//!   components and new projects
//!
//! ## Project Layout
//!
//! ```text
//! agency-ssp/
//! ├── opencontrol.yaml          # system manifest (schema_version 1.0.0)
//! ├── components/
//! │   ├── Drupal/
//! │   │   ├── component.yaml    # schema_version 3.0.0
//! │   │   └── AC-policy.yaml    # included from component.yaml
//! │   └── AWS/
//! │       └── component.yaml
//! ├── standards/
//! │   └── NIST-SP-800-53-rev4.yaml
//! └── certifications/
//!     └── FedRAMP-low.yaml
//! ```
//!
//! Nothing is cached: every call re-reads the files it needs.

pub mod catalog;
pub mod config;
pub mod document;
pub mod error;
pub mod ids;
pub mod index;
pub mod model;
pub mod mutation;
pub mod narratives;

pub use catalog::{
    load_certified_controls, load_component, load_components, load_project, load_standard,
    load_standards, ProjectRegistry,
};
pub use config::WorkbenchConfig;
pub use document::SchemaType;
pub use error::{OpenControlError, Result};
pub use ids::{get_matched_control, make_control_number_sort_key, NumberSortKey};
pub use index::{
    component_comparison, component_families, control_catalog, control_detail,
    implementation_statistics, list_all_controls, list_all_evidence, narrative_source_files,
    ComponentComparison, ControlDetail, ImplementationStatistics, StandardControls,
};
pub use model::{
    CertifiedControls, Component, ControlImplementation, ControlRef, Evidence, FamilyRef,
    Organization, Project, Resolution, Standard, StandardRef, Standards,
};
pub use mutation::{
    add_control_narrative, clean_text, create_component, create_project, save_narrative,
    update_control_narrative, EditMode, NarrativeEdit,
};
pub use narratives::{component_source_files, load_component_controls, load_component_evidence};
