#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("schema {0} is not defined")]
    UnknownNamespace(String),
    #[error("type prefix {0:?} is not bound to a schema namespace")]
    UnknownPrefix(String),
    #[error("type {name} is not defined in schema {ns}")]
    UnknownType { ns: String, name: String },
    #[error("type {0} is not atomic and cannot be used as a base")]
    NotAtomic(String),
    #[error("invalid facet pattern {pattern:?}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: Box<fancy_regex::Error>,
    },
    #[error("more than one schema with namespace {0}")]
    DuplicateSchema(String),
}
