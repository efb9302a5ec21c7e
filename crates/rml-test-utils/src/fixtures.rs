//! Turtle documents used across test suites.

/// A mapping whose logical source is a CSV table with a dialect, plus a
/// legacy logical target. 17 statements.
pub const MAPPING_WITH_CSV_SOURCE: &str = r#"
@prefix rr: <http://www.w3.org/ns/r2rml#> .
@prefix rml: <http://semweb.mmlab.be/ns/rml#> .
@prefix ql: <http://semweb.mmlab.be/ns/ql#> .
@prefix csvw: <http://www.w3.org/ns/csvw#> .
@prefix ex: <http://example.org/> .

ex:PersonMap a rr:TriplesMap ;
    rml:logicalSource [
        rml:source [
            a csvw:Table ;
            csvw:url "old.csv" ;
            csvw:dialect [ csvw:delimiter ";" ]
        ] ;
        rml:referenceFormulation ql:CSV
    ] ;
    rml:logicalTarget [ ex:target [ ex:path "out.nt" ] ] ;
    rr:subjectMap [ rr:template "http://example.org/person/{id}" ] ;
    rr:predicateObjectMap [
        rr:predicate ex:name ;
        rr:objectMap [ rml:reference "name" ]
    ] .
"#;

/// Statements of [`MAPPING_WITH_CSV_SOURCE`] that survive a rewrite.
pub const MAPPING_WITH_CSV_SOURCE_KEPT: usize = 7;

/// Maps named with IRIs relative to the document, as most hand-written
/// mappings are. Only parses with a base IRI.
pub const MAPPING_WITH_RELATIVE_IRIS: &str = r#"
@prefix rr: <http://www.w3.org/ns/r2rml#> .
@prefix rml: <http://semweb.mmlab.be/ns/rml#> .
@prefix ql: <http://semweb.mmlab.be/ns/ql#> .

<#PersonMap> a rr:TriplesMap ;
    rml:logicalSource <#PersonSource> ;
    rr:subjectMap [ rr:template "http://example.org/person/{id}" ] .

<#PersonSource> rml:source "people.json" ;
    rml:referenceFormulation ql:JSONPath ;
    rml:iterator "$.people[*]" .
"#;

pub const MAPPING_WITHOUT_SOURCE: &str = r#"
@prefix rr: <http://www.w3.org/ns/r2rml#> .
@prefix ex: <http://example.org/> .

ex:Map a rr:TriplesMap ;
    rr:subjectMap [ rr:template "http://example.org/{id}" ] .
"#;

/// Anonymous nodes under the logical source reference each other.
pub const MAPPING_WITH_CYCLIC_SOURCE: &str = r#"
@prefix rr: <http://www.w3.org/ns/r2rml#> .
@prefix rml: <http://semweb.mmlab.be/ns/rml#> .
@prefix ex: <http://example.org/> .

ex:Map a rr:TriplesMap ; rml:logicalSource _:a .
_:a ex:next _:b .
_:b ex:next _:a .
"#;

pub const NO_TRIPLES_MAP: &str = r#"
@prefix ex: <http://example.org/> .
ex:thing ex:label "not a mapping" .
"#;

pub const TWO_TRIPLES_MAPS: &str = r#"
@prefix rr: <http://www.w3.org/ns/r2rml#> .
@prefix rml: <http://semweb.mmlab.be/ns/rml#> .
@prefix ex: <http://example.org/> .

ex:A a rr:TriplesMap ; rml:logicalSource [ rml:source "a.json" ] .
ex:B a rr:TriplesMap ; rml:logicalSource [ rml:source "b.json" ] .
"#;

/// A pipeline document with one mapping execution. Relative IRIs resolve
/// against the document location.
pub const PIPELINE: &str = r#"
@prefix rmlc: <https://w3id.org/conn/rml#> .
@prefix : <https://w3id.org/conn#> .

<#exec> a rmlc:ExecRML ;
    rmlc:input <#in> ;
    rmlc:output <#out> ;
    rmlc:mappingFile <mapping.ttl> ;
    rmlc:jarFile "/opt/rml/streamer.jar" ;
    rmlc:iterator "$.people[*]" ;
    rmlc:referenceFormulation <http://semweb.mmlab.be/ns/ql#JSONPath> .

<#in> a :FileReaderChannel ; :filePath "people.json" .
<#out> a :FileWriterChannel ; :filePath "people.nt" .
"#;
