//! In-memory statement store for one mapping document, backed by oxigraph.

use oxigraph::io::{RdfFormat, RdfParser, RdfSerializer};
use oxigraph::model::{
    BlankNode, GraphName, NamedNodeRef, NamedOrBlankNode, NamedOrBlankNodeRef, Quad, Term,
    TermRef,
};
use oxigraph::store::Store;

use rml_core::error::{Result, RmlError};

use crate::vocab;

/// Mutable set of statements for a single mapping document.
///
/// Cloning is cheap and shares the underlying statements.
#[derive(Clone)]
pub struct GraphStore {
    inner: Store,
}

impl GraphStore {
    /// Create an empty in-memory store.
    pub fn new() -> Result<Self> {
        let inner = Store::new().map_err(|e| graph_err("failed to create store", e))?;
        Ok(Self { inner })
    }

    /// Insert a triple into the default graph.
    pub fn add(
        &self,
        subject: impl Into<NamedOrBlankNode>,
        predicate: NamedNodeRef<'_>,
        object: impl Into<Term>,
    ) -> Result<()> {
        let quad = Quad::new(
            subject,
            predicate.into_owned(),
            object,
            GraphName::DefaultGraph,
        );
        self.insert(&quad)?;
        Ok(())
    }

    /// Insert a single statement. Returns `false` if it was already present.
    pub fn insert(&self, quad: &Quad) -> Result<bool> {
        self.inner
            .insert(quad)
            .map_err(|e| graph_err("insert failed", e))
    }

    /// Bulk insert.
    pub fn extend(&self, quads: impl IntoIterator<Item = Quad>) -> Result<()> {
        for quad in quads {
            self.insert(&quad)?;
        }
        Ok(())
    }

    /// Remove a single statement. Returns `false` if it was not present.
    pub fn remove(&self, quad: &Quad) -> Result<bool> {
        self.inner
            .remove(quad)
            .map_err(|e| graph_err("remove failed", e))
    }

    /// All statements matching the pattern, across every graph.
    pub fn quads(
        &self,
        subject: Option<NamedOrBlankNodeRef<'_>>,
        predicate: Option<NamedNodeRef<'_>>,
        object: Option<TermRef<'_>>,
    ) -> Result<Vec<Quad>> {
        self.inner
            .quads_for_pattern(subject, predicate, object, None)
            .map(|q| q.map_err(|e| graph_err("pattern lookup failed", e)))
            .collect()
    }

    /// Delete every statement matching the pattern and return what was removed.
    pub fn remove_matching(
        &self,
        subject: Option<NamedOrBlankNodeRef<'_>>,
        predicate: Option<NamedNodeRef<'_>>,
        object: Option<TermRef<'_>>,
    ) -> Result<Vec<Quad>> {
        let matched = self.quads(subject, predicate, object)?;
        for quad in &matched {
            self.remove(quad)?;
        }
        Ok(matched)
    }

    /// Subjects of `?s <predicate> <object>`.
    pub fn subjects(
        &self,
        predicate: NamedNodeRef<'_>,
        object: TermRef<'_>,
    ) -> Result<Vec<NamedOrBlankNode>> {
        let mut out: Vec<NamedOrBlankNode> = Vec::new();
        for quad in self.quads(None, Some(predicate), Some(object))? {
            if !out.contains(&quad.subject) {
                out.push(quad.subject);
            }
        }
        Ok(out)
    }

    /// Objects of `<subject> <predicate> ?o`.
    pub fn objects(
        &self,
        subject: NamedOrBlankNodeRef<'_>,
        predicate: NamedNodeRef<'_>,
    ) -> Result<Vec<Term>> {
        Ok(self
            .quads(Some(subject), Some(predicate), None)?
            .into_iter()
            .map(|q| q.object)
            .collect())
    }

    /// First object of `<subject> <predicate> ?o`, if any.
    pub fn object(
        &self,
        subject: NamedOrBlankNodeRef<'_>,
        predicate: NamedNodeRef<'_>,
    ) -> Result<Option<Term>> {
        Ok(self.objects(subject, predicate)?.into_iter().next())
    }

    /// Mint an anonymous node that no statement in this store mentions yet.
    pub fn mint_blank(&self) -> Result<BlankNode> {
        loop {
            let node = BlankNode::default();
            let as_subject = self.quads(Some(node.as_ref().into()), None, None)?;
            let as_object = self.quads(None, None, Some(node.as_ref().into()))?;
            if as_subject.is_empty() && as_object.is_empty() {
                return Ok(node);
            }
        }
    }

    pub fn len(&self) -> Result<usize> {
        self.inner.len().map_err(|e| graph_err("count failed", e))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Every statement in the store.
    pub fn all_quads(&self) -> Result<Vec<Quad>> {
        self.quads(None, None, None)
    }

    /// Parse Turtle into the store, statement by statement.
    ///
    /// Blank node labels are renamed so documents loaded into the same store
    /// never share anonymous nodes by accident. Statements parsed before a
    /// syntax error stay in the store.
    pub fn load_turtle(&self, data: &[u8], base_iri: Option<&str>) -> Result<usize> {
        let mut parser = RdfParser::from_format(RdfFormat::Turtle).rename_blank_nodes();
        if let Some(base) = base_iri {
            parser = parser
                .with_base_iri(base)
                .map_err(|e| graph_err("invalid base IRI", e))?;
        }

        let mut count = 0;
        for quad in parser.for_reader(data) {
            let quad = quad.map_err(|e| graph_err("parse failed", e))?;
            self.insert(&quad)?;
            count += 1;
        }
        Ok(count)
    }

    /// Serialize the default graph as Turtle.
    pub fn to_turtle(&self) -> Result<String> {
        let mut serializer = RdfSerializer::from_format(RdfFormat::Turtle);
        for (prefix, iri) in vocab::PREFIXES {
            serializer = serializer
                .with_prefix(*prefix, *iri)
                .map_err(|e| graph_err("invalid prefix", e))?;
        }

        let mut writer = serializer.for_writer(Vec::new());
        for quad in self.all_quads()? {
            if quad.graph_name.is_default_graph() {
                writer.serialize_quad(&quad)?;
            }
        }
        let bytes = writer.finish()?;
        String::from_utf8(bytes).map_err(|e| graph_err("serializer produced invalid UTF-8", e))
    }
}

/// View a statement object as something that can own statements.
pub fn as_resource(term: &Term) -> Option<NamedOrBlankNode> {
    match term {
        Term::NamedNode(n) => Some(n.clone().into()),
        Term::BlankNode(b) => Some(b.clone().into()),
        _ => None,
    }
}

/// Lexical value of a literal or IRI object.
pub fn term_value(term: &Term) -> Option<String> {
    match term {
        Term::Literal(l) => Some(l.value().to_string()),
        Term::NamedNode(n) => Some(n.as_str().to_string()),
        _ => None,
    }
}

fn graph_err(context: &str, e: impl std::fmt::Display) -> RmlError {
    RmlError::Graph(format!("{context}: {e}"))
}
