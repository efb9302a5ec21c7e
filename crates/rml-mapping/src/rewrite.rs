//! Logical source rewriting.
//!
//! A mapping document names exactly one `rr:TriplesMap`. Rewriting strips
//! whatever source (and legacy target) description it carries and attaches a
//! fresh anonymous logical source that points the engine at a resolved
//! channel.

use std::collections::HashSet;
use std::path::Path;

use oxigraph::model::{BlankNode, Literal, NamedNode, NamedNodeRef, NamedOrBlankNode};
use tracing::debug;

use rml_core::error::{Result, RmlError};
use rml_core::types::{ChannelConfig, SourceOverrides};

use crate::store::{as_resource, GraphStore};
use crate::vocab::{csvw, ql, rdf, rml, rmls, rr};

/// `.tsv` dialect delimiter: a real tab character, not the escaped `\t` pair.
const TAB: &str = "\t";

/// The concrete shape a logical source takes in the mapping graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceShape {
    /// Tree-shaped documents read from a path with an iterator (JSON, XML).
    Iterated {
        formulation: NamedNode,
        iterator: String,
        path: String,
    },
    /// Delimited files described by a `csvw:Table`.
    Table { path: String, tab_delimited: bool },
    /// A Kafka topic described by an `rmls:KafkaStream`.
    Stream {
        formulation: NamedNode,
        iterator: String,
        topic: String,
        broker: String,
        group_id: String,
    },
}

impl SourceShape {
    /// Decide the source shape for a channel. Explicit overrides win over
    /// anything inferred from the channel itself.
    pub fn for_channel(channel: &ChannelConfig, overrides: &SourceOverrides) -> Result<Self> {
        let forced = overrides
            .reference_formulation
            .as_deref()
            .map(|iri| {
                NamedNode::new(iri).map_err(|e| {
                    RmlError::UnsupportedSource(format!("invalid reference formulation {iri}: {e}"))
                })
            })
            .transpose()?;

        match channel {
            ChannelConfig::File { path, .. } => file_shape(path, forced, overrides),
            ChannelConfig::Topic {
                broker,
                topic_name,
                consumer_group_id,
            } => {
                let formulation = forced.unwrap_or_else(|| ql::JSON_PATH.into_owned());
                let iterator = overrides
                    .iterator
                    .clone()
                    .unwrap_or_else(|| default_iterator(formulation.as_ref(), "$").to_string());
                Ok(SourceShape::Stream {
                    formulation,
                    iterator,
                    topic: topic_name.clone(),
                    broker: broker.clone(),
                    group_id: consumer_group_id.clone(),
                })
            }
            other => Err(RmlError::UnsupportedChannel(format!(
                "the mapping engine cannot read from a {} channel ({other})",
                other.kind()
            ))),
        }
    }
}

fn file_shape(
    path: &str,
    forced: Option<NamedNode>,
    overrides: &SourceOverrides,
) -> Result<SourceShape> {
    let extension = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let iterated = |formulation: NamedNode, fallback: &str| {
        let iterator = overrides
            .iterator
            .clone()
            .unwrap_or_else(|| default_iterator(formulation.as_ref(), fallback).to_string());
        SourceShape::Iterated {
            formulation,
            iterator,
            path: path.to_string(),
        }
    };

    // A tree-shaped or CSV override decides the branch on its own.
    if let Some(f) = forced.as_ref() {
        if f.as_ref() == ql::JSON_PATH || f.as_ref() == ql::XPATH {
            return Ok(iterated(f.clone(), "$"));
        }
        if f.as_ref() == ql::CSV {
            return Ok(SourceShape::Table {
                path: path.to_string(),
                tab_delimited: extension == "tsv",
            });
        }
    }

    match extension.as_str() {
        "json" => Ok(iterated(
            forced.unwrap_or_else(|| ql::JSON_PATH.into_owned()),
            "$",
        )),
        "xml" => Ok(iterated(forced.unwrap_or_else(|| ql::XPATH.into_owned()), "/")),
        "csv" => Ok(SourceShape::Table {
            path: path.to_string(),
            tab_delimited: false,
        }),
        "tsv" => Ok(SourceShape::Table {
            path: path.to_string(),
            tab_delimited: true,
        }),
        _ => Err(RmlError::UnsupportedSource(format!(
            "could not deduce a source shape from file name {path}"
        ))),
    }
}

fn default_iterator<'a>(formulation: NamedNodeRef<'_>, fallback: &'a str) -> &'a str {
    if formulation == ql::JSON_PATH {
        "$"
    } else if formulation == ql::XPATH {
        "/"
    } else {
        fallback
    }
}

/// Point the single triples map in `store` at `channel`.
///
/// Returns the freshly minted logical source node. Nothing is mutated when
/// the document does not hold exactly one triples map or the channel cannot
/// be expressed as a logical source.
pub fn rewrite_logical_source(
    store: &GraphStore,
    channel: &ChannelConfig,
    overrides: &SourceOverrides,
) -> Result<BlankNode> {
    let mapping = single_triples_map(store)?;
    let shape = SourceShape::for_channel(channel, overrides)?;

    let mut visited = HashSet::new();

    let old_sources = store.remove_matching(Some(mapping.as_ref()), Some(rml::LOGICAL_SOURCE), None)?;
    for quad in &old_sources {
        if let Some(node) = as_resource(&quad.object) {
            delete_subtree(store, node, &mut visited)?;
        }
    }

    let old_targets = store.remove_matching(None, Some(rml::LOGICAL_TARGET), None)?;
    for quad in &old_targets {
        if let Some(node) = as_resource(&quad.object) {
            delete_subtree(store, node, &mut visited)?;
        }
    }

    debug!(
        mapping = %mapping,
        removed_sources = old_sources.len(),
        removed_targets = old_targets.len(),
        "Cleared logical source"
    );

    let logical_source = store.mint_blank()?;
    store.add(mapping.clone(), rml::LOGICAL_SOURCE, logical_source.clone())?;
    emit_shape(store, &logical_source, &shape)?;

    debug!(mapping = %mapping, shape = ?shape, "Attached logical source");
    Ok(logical_source)
}

/// The one resource typed `rr:TriplesMap`.
pub fn single_triples_map(store: &GraphStore) -> Result<NamedOrBlankNode> {
    let mut mappings = store.subjects(rdf::TYPE, rr::TRIPLES_MAP.into())?;
    if mappings.len() != 1 {
        return Err(RmlError::Cardinality {
            what: "rr:TriplesMap".into(),
            expected: 1,
            found: mappings.len(),
        });
    }
    Ok(mappings.remove(0))
}

/// Delete every statement reachable from `root` by following objects.
///
/// `visited` guards against cycles among anonymous nodes and is shared by all
/// deletions in a single rewrite.
fn delete_subtree(
    store: &GraphStore,
    root: NamedOrBlankNode,
    visited: &mut HashSet<NamedOrBlankNode>,
) -> Result<()> {
    let mut pending = vec![root];
    while let Some(node) = pending.pop() {
        if !visited.insert(node.clone()) {
            continue;
        }
        for quad in store.remove_matching(Some(node.as_ref()), None, None)? {
            if let Some(next) = as_resource(&quad.object) {
                pending.push(next);
            }
        }
    }
    Ok(())
}

fn emit_shape(store: &GraphStore, ls: &BlankNode, shape: &SourceShape) -> Result<()> {
    match shape {
        SourceShape::Iterated {
            formulation,
            iterator,
            path,
        } => {
            store.add(ls.clone(), rml::SOURCE, Literal::new_simple_literal(path))?;
            store.add(ls.clone(), rml::REFERENCE_FORMULATION, formulation.clone())?;
            store.add(ls.clone(), rml::ITERATOR, Literal::new_simple_literal(iterator))?;
        }
        SourceShape::Table {
            path,
            tab_delimited,
        } => {
            let table = store.mint_blank()?;
            store.add(ls.clone(), rml::SOURCE, table.clone())?;
            store.add(table.clone(), rdf::TYPE, csvw::TABLE.into_owned())?;
            store.add(table.clone(), csvw::URL, Literal::new_simple_literal(path))?;
            store.add(ls.clone(), rml::REFERENCE_FORMULATION, ql::CSV.into_owned())?;

            if *tab_delimited {
                let dialect = store.mint_blank()?;
                store.add(table.clone(), csvw::DIALECT, dialect.clone())?;
                store.add(dialect.clone(), rdf::TYPE, csvw::DIALECT_CLASS.into_owned())?;
                store.add(dialect, csvw::DELIMITER, Literal::new_simple_literal(TAB))?;
            }
        }
        SourceShape::Stream {
            formulation,
            iterator,
            topic,
            broker,
            group_id,
        } => {
            let stream = store.mint_blank()?;
            store.add(ls.clone(), rml::REFERENCE_FORMULATION, formulation.clone())?;
            store.add(ls.clone(), rml::ITERATOR, Literal::new_simple_literal(iterator))?;
            store.add(ls.clone(), rml::SOURCE, stream.clone())?;
            store.add(stream.clone(), rdf::TYPE, rmls::KAFKA_STREAM.into_owned())?;
            store.add(stream.clone(), rmls::TOPIC, Literal::new_simple_literal(topic))?;
            store.add(stream.clone(), rmls::BROKER, Literal::new_simple_literal(broker))?;
            store.add(stream, rmls::GROUP_ID, Literal::new_simple_literal(group_id))?;
        }
    }
    Ok(())
}
