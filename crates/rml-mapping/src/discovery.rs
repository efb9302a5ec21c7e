//! Finds mapping executions declared in a pipeline document.

use oxigraph::model::{NamedNodeRef, NamedOrBlankNode};
use tracing::warn;

use rml_core::error::{Result, RmlError};
use rml_core::types::SourceOverrides;

use crate::store::{as_resource, term_value, GraphStore};
use crate::vocab::{rdf, rmlc};

/// One `rmlc:ExecRML` instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub subject: NamedOrBlankNode,
    /// Channel node the engine reads from.
    pub input: NamedOrBlankNode,
    /// Channel node the engine writes to.
    pub output: NamedOrBlankNode,
    /// Location of the mapping document.
    pub mapping: String,
    /// Explicit engine artifact location.
    pub jar_file: Option<String>,
    pub overrides: SourceOverrides,
}

impl Binding {
    /// Short label used in log lines.
    pub fn label(&self) -> String {
        self.subject.to_string()
    }
}

/// All well-formed bindings in `store`. Malformed ones are logged and skipped.
pub fn discover_bindings(store: &GraphStore) -> Result<Vec<Binding>> {
    let mut bindings = Vec::new();
    for subject in store.subjects(rdf::TYPE, rmlc::EXEC_RML.into())? {
        match binding_for(store, &subject) {
            Ok(binding) => bindings.push(binding),
            Err(e) => warn!(subject = %subject, error = %e, "Skipping malformed mapping execution"),
        }
    }
    Ok(bindings)
}

/// Read the binding rooted at `subject`.
pub fn binding_for(store: &GraphStore, subject: &NamedOrBlankNode) -> Result<Binding> {
    let input = channel_node(store, subject, rmlc::INPUT)?;
    let output = channel_node(store, subject, rmlc::OUTPUT)?;
    let mapping = value(store, subject, rmlc::MAPPING_FILE)?
        .ok_or_else(|| RmlError::Binding(format!("{subject} is missing {}", rmlc::MAPPING_FILE)))?;

    Ok(Binding {
        subject: subject.clone(),
        input,
        output,
        mapping,
        jar_file: value(store, subject, rmlc::JAR_FILE)?,
        overrides: SourceOverrides {
            reference_formulation: value(store, subject, rmlc::REFERENCE_FORMULATION)?,
            iterator: value(store, subject, rmlc::ITERATOR)?,
        },
    })
}

/// A typed channel node hanging off `subject`.
fn channel_node(
    store: &GraphStore,
    subject: &NamedOrBlankNode,
    predicate: NamedNodeRef<'_>,
) -> Result<NamedOrBlankNode> {
    let node = store
        .object(subject.as_ref(), predicate)?
        .as_ref()
        .and_then(as_resource)
        .ok_or_else(|| RmlError::Binding(format!("{subject} is missing {predicate}")))?;
    if store.object(node.as_ref(), rdf::TYPE)?.is_none() {
        return Err(RmlError::Binding(format!("channel {node} has no rdf:type")));
    }
    Ok(node)
}

fn value(
    store: &GraphStore,
    subject: &NamedOrBlankNode,
    predicate: NamedNodeRef<'_>,
) -> Result<Option<String>> {
    Ok(store
        .object(subject.as_ref(), predicate)?
        .as_ref()
        .and_then(term_value))
}
