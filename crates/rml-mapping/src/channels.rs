//! Typed channel configs from connector-architecture channel descriptions.

use oxigraph::model::{NamedNodeRef, NamedOrBlankNodeRef, Term};

use rml_core::error::{Result, RmlError};
use rml_core::types::ChannelConfig;

use crate::store::{as_resource, term_value, GraphStore};
use crate::vocab::{conn, rdf};

/// Resolve the channel described by `node` into a [`ChannelConfig`].
pub fn resolve_channel(store: &GraphStore, node: NamedOrBlankNodeRef<'_>) -> Result<ChannelConfig> {
    let types = store.objects(node, rdf::TYPE)?;
    if types.is_empty() {
        return Err(RmlError::UnsupportedChannel(format!("{node} has no rdf:type")));
    }

    if has_type(&types, &[conn::FILE_READER_CHANNEL, conn::FILE_WRITER_CHANNEL]) {
        return file_channel(store, node);
    }
    if has_type(&types, &[conn::KAFKA_READER_CHANNEL, conn::KAFKA_WRITER_CHANNEL]) {
        return kafka_channel(store, node);
    }
    if has_type(&types, &[conn::WS_READER_CHANNEL, conn::WS_WRITER_CHANNEL]) {
        return Ok(ChannelConfig::WebSocket {
            url: required(store, node, conn::WS_URI)?,
        });
    }
    if has_type(&types, &[conn::HTTP_READER_CHANNEL, conn::HTTP_WRITER_CHANNEL]) {
        return Ok(ChannelConfig::Http {
            endpoint: required(store, node, conn::HTTP_ENDPOINT)?,
            method: optional(store, node, conn::HTTP_METHOD)?.unwrap_or_else(|| "GET".into()),
        });
    }

    let names: Vec<String> = types.iter().map(|t| t.to_string()).collect();
    Err(RmlError::UnsupportedChannel(format!(
        "{node} has unsupported type {}",
        names.join(", ")
    )))
}

fn has_type(types: &[Term], candidates: &[NamedNodeRef<'static>]) -> bool {
    types.iter().any(|t| match t {
        Term::NamedNode(n) => candidates.iter().any(|c| *c == n.as_ref()),
        _ => false,
    })
}

fn file_channel(store: &GraphStore, node: NamedOrBlankNodeRef<'_>) -> Result<ChannelConfig> {
    Ok(ChannelConfig::File {
        path: required(store, node, conn::FILE_PATH)?,
        on_replace: parse_bool(optional(store, node, conn::FILE_ON_REPLACE)?.as_deref())?,
        encoding: optional(store, node, conn::FILE_ENCODING)?,
        read_first_content: parse_bool(
            optional(store, node, conn::FILE_READ_FIRST_CONTENT)?.as_deref(),
        )?,
    })
}

fn kafka_channel(store: &GraphStore, node: NamedOrBlankNodeRef<'_>) -> Result<ChannelConfig> {
    let broker = nested(store, node, conn::KAFKA_BROKER, conn::BROKER_HOSTS)?
        .ok_or_else(|| missing(node, conn::KAFKA_BROKER))?;
    let topic_name = nested(store, node, conn::KAFKA_TOPIC, conn::TOPIC_NAME)?
        .ok_or_else(|| missing(node, conn::KAFKA_TOPIC))?;
    // Writers have no consumer group.
    let consumer_group_id =
        nested(store, node, conn::KAFKA_CONSUMER, conn::GROUP_ID)?.unwrap_or_default();

    Ok(ChannelConfig::Topic {
        broker,
        topic_name,
        consumer_group_id,
    })
}

/// Value of `inner` on the node that `outer` points at.
fn nested(
    store: &GraphStore,
    node: NamedOrBlankNodeRef<'_>,
    outer: NamedNodeRef<'_>,
    inner: NamedNodeRef<'_>,
) -> Result<Option<String>> {
    match store.object(node, outer)?.as_ref().and_then(as_resource) {
        Some(holder) => optional(store, holder.as_ref(), inner),
        None => Ok(None),
    }
}

fn optional(
    store: &GraphStore,
    node: NamedOrBlankNodeRef<'_>,
    predicate: NamedNodeRef<'_>,
) -> Result<Option<String>> {
    Ok(store.object(node, predicate)?.as_ref().and_then(term_value))
}

fn required(
    store: &GraphStore,
    node: NamedOrBlankNodeRef<'_>,
    predicate: NamedNodeRef<'_>,
) -> Result<String> {
    optional(store, node, predicate)?.ok_or_else(|| missing(node, predicate))
}

fn missing(node: NamedOrBlankNodeRef<'_>, predicate: NamedNodeRef<'_>) -> RmlError {
    RmlError::Binding(format!("{node} is missing {predicate}"))
}

/// Lenient boolean parsing for channel flags. Absent means `false`.
pub fn parse_bool(value: Option<&str>) -> Result<bool> {
    let Some(raw) = value else {
        return Ok(false);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" | "" => Ok(false),
        other => Err(RmlError::Binding(format!("not a boolean: {other}"))),
    }
}
