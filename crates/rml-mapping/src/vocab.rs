//! IRIs of the vocabularies read and written by the runner.

use oxigraph::model::NamedNodeRef;

pub use oxigraph::model::vocab::rdf;

pub mod rr {
    use super::NamedNodeRef;

    pub const NS: &str = "http://www.w3.org/ns/r2rml#";
    pub const TRIPLES_MAP: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/r2rml#TriplesMap");
}

pub mod rml {
    use super::NamedNodeRef;

    pub const NS: &str = "http://semweb.mmlab.be/ns/rml#";
    pub const LOGICAL_SOURCE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://semweb.mmlab.be/ns/rml#logicalSource");
    pub const LOGICAL_TARGET: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://semweb.mmlab.be/ns/rml#logicalTarget");
    pub const SOURCE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://semweb.mmlab.be/ns/rml#source");
    pub const REFERENCE_FORMULATION: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://semweb.mmlab.be/ns/rml#referenceFormulation");
    pub const ITERATOR: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://semweb.mmlab.be/ns/rml#iterator");
}

pub mod ql {
    use super::NamedNodeRef;

    pub const NS: &str = "http://semweb.mmlab.be/ns/ql#";
    pub const JSON_PATH: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://semweb.mmlab.be/ns/ql#JSONPath");
    pub const XPATH: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://semweb.mmlab.be/ns/ql#XPath");
    pub const CSV: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://semweb.mmlab.be/ns/ql#CSV");
}

pub mod csvw {
    use super::NamedNodeRef;

    pub const NS: &str = "http://www.w3.org/ns/csvw#";
    pub const TABLE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/csvw#Table");
    pub const URL: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/csvw#url");
    pub const DIALECT: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/csvw#dialect");
    pub const DIALECT_CLASS: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/csvw#Dialect");
    pub const DELIMITER: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/csvw#delimiter");
}

/// RMLStreamer's stream source vocabulary.
pub mod rmls {
    use super::NamedNodeRef;

    pub const NS: &str = "http://semweb.mmlab.be/ns/rmls#";
    pub const KAFKA_STREAM: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://semweb.mmlab.be/ns/rmls#KafkaStream");
    pub const TOPIC: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://semweb.mmlab.be/ns/rmls#topic");
    pub const BROKER: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://semweb.mmlab.be/ns/rmls#broker");
    pub const GROUP_ID: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://semweb.mmlab.be/ns/rmls#groupId");
}

pub mod owl {
    use super::NamedNodeRef;

    pub const IMPORTS: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#imports");
}

/// Connector architecture channel vocabulary.
pub mod conn {
    use super::NamedNodeRef;

    pub const NS: &str = "https://w3id.org/conn#";

    pub const FILE_READER_CHANNEL: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/conn#FileReaderChannel");
    pub const FILE_WRITER_CHANNEL: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/conn#FileWriterChannel");
    pub const FILE_PATH: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/conn#filePath");
    pub const FILE_ON_REPLACE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/conn#fileOnReplace");
    pub const FILE_ENCODING: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/conn#fileEncoding");
    pub const FILE_READ_FIRST_CONTENT: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/conn#fileReadFirstContent");

    pub const KAFKA_READER_CHANNEL: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/conn#KafkaReaderChannel");
    pub const KAFKA_WRITER_CHANNEL: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/conn#KafkaWriterChannel");
    pub const KAFKA_BROKER: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/conn#kafkaBroker");
    pub const BROKER_HOSTS: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/conn#brokerHosts");
    pub const KAFKA_TOPIC: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/conn#kafkaTopic");
    pub const TOPIC_NAME: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/conn#topicName");
    pub const KAFKA_CONSUMER: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/conn#kafkaConsumer");
    pub const GROUP_ID: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/conn#groupId");

    pub const WS_READER_CHANNEL: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/conn#WsReaderChannel");
    pub const WS_WRITER_CHANNEL: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/conn#WsWriterChannel");
    pub const WS_URI: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/conn#wsUri");

    pub const HTTP_READER_CHANNEL: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/conn#HttpReaderChannel");
    pub const HTTP_WRITER_CHANNEL: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/conn#HttpWriterChannel");
    pub const HTTP_ENDPOINT: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/conn#httpEndpoint");
    pub const HTTP_METHOD: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/conn#httpMethod");
}

/// Pipeline processor vocabulary for mapping executions.
pub mod rmlc {
    use super::NamedNodeRef;

    pub const NS: &str = "https://w3id.org/conn/rml#";
    pub const EXEC_RML: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/conn/rml#ExecRML");
    pub const INPUT: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/conn/rml#input");
    pub const OUTPUT: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/conn/rml#output");
    pub const MAPPING_FILE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/conn/rml#mappingFile");
    pub const JAR_FILE: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/conn/rml#jarFile");
    pub const ITERATOR: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/conn/rml#iterator");
    pub const REFERENCE_FORMULATION: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("https://w3id.org/conn/rml#referenceFormulation");
}

/// Prefixes used when writing mapping documents back out.
pub const PREFIXES: &[(&str, &str)] = &[
    ("rr", rr::NS),
    ("rml", rml::NS),
    ("ql", ql::NS),
    ("csvw", csvw::NS),
    ("rmls", rmls::NS),
];
