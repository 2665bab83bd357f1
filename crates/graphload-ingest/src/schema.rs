//! Schema initialization.
//!
//! The store has no "create if missing" for classes or properties, so every
//! step is attempted and an "already exists" answer is treated as success.
//! Re-running an import against a prepared database is therefore safe.

use crate::error::Result;
use crate::report::SchemaReport;
use crate::triple::Role;
use graphload_client::{ClientError, GraphStore, Identifier, PropertyType};
use tracing::{debug, info};

/// Classes an import writes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaPlan {
    pub source_class: Identifier,
    pub target_class: Identifier,
    pub edge_class: Identifier,
    /// String property holding each record's identifying URI.
    pub uri_property: Identifier,
}

impl SchemaPlan {
    pub fn new(
        source_class: &str,
        target_class: &str,
        edge_class: &str,
    ) -> std::result::Result<Self, ClientError> {
        Ok(Self {
            source_class: Identifier::new(source_class)?,
            target_class: Identifier::new(target_class)?,
            edge_class: Identifier::new(edge_class)?,
            uri_property: Identifier::new("uri")?,
        })
    }

    /// Subjects and objects land in the same vertex class.
    pub fn shares_vertex_class(&self) -> bool {
        self.source_class == self.target_class
    }

    pub fn class_for(&self, role: Role) -> &Identifier {
        match role {
            Role::Source => &self.source_class,
            Role::Target => &self.target_class,
        }
    }
}

fn ensure(
    report: &mut SchemaReport,
    label: String,
    result: std::result::Result<(), ClientError>,
) -> Result<()> {
    match result {
        Ok(()) => {
            debug!(%label, "created");
            report.created.push(label);
            Ok(())
        }
        Err(err) if err.is_already_exists() => {
            debug!(%label, "already present");
            report.already_present.push(label);
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

/// Ensure both vertex classes, the edge class, and a string `uri` property
/// on each of them.
pub fn initialize_schema<S: GraphStore + ?Sized>(store: &mut S, plan: &SchemaPlan) -> Result<SchemaReport> {
    let mut report = SchemaReport::default();

    ensure(
        &mut report,
        format!("vertex class {}", plan.source_class),
        store.create_vertex_class(&plan.source_class),
    )?;
    ensure(
        &mut report,
        format!("vertex class {}", plan.target_class),
        store.create_vertex_class(&plan.target_class),
    )?;
    ensure(
        &mut report,
        format!("edge class {}", plan.edge_class),
        store.create_edge_class(&plan.edge_class),
    )?;

    let mut property_classes = vec![&plan.source_class];
    if !plan.shares_vertex_class() {
        property_classes.push(&plan.target_class);
    }
    property_classes.push(&plan.edge_class);
    for class in property_classes {
        ensure(
            &mut report,
            format!("property {class}.{}", plan.uri_property),
            store.create_property(class, &plan.uri_property, PropertyType::String),
        )?;
    }

    info!(
        created = report.created.len(),
        already_present = report.already_present.len(),
        "schema ready"
    );
    Ok(report)
}
