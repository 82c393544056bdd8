use bindery_schema::SchemaError;
use bindery_xpath::Error as XPathError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("cannot compile {expr:?}")]
    Compile {
        expr: String,
        #[source]
        source: XPathError,
    },
    #[error("bind {0:?} not found")]
    BindingNotFound(String),
    #[error("evaluation of {expr:?} failed")]
    Evaluation {
        expr: String,
        #[source]
        source: XPathError,
    },
    #[error(transparent)]
    SchemaLookup(#[from] SchemaError),
    #[error("two binds affect node {node}: {first} and {second}")]
    Binding { node: String, first: String, second: String },
    #[error("instance {id:?} is not well-formed")]
    Instance {
        id: String,
        #[source]
        source: XPathError,
    },
    #[error("model {0:?} not found")]
    UnknownModel(String),
    #[error("element {0:?} not found")]
    UnknownElement(String),
    #[error("flush did not settle after {iterations} iterations")]
    FlushDiverged { iterations: usize },
}

impl EngineError {
    pub(crate) fn evaluation(expr: &str, source: XPathError) -> Self {
        Self::Evaluation { expr: expr.to_string(), source }
    }

    /// XPath error code of the underlying failure, if any.
    pub fn xpath_code(&self) -> Option<bindery_xpath::ErrorCode> {
        match self {
            Self::Compile { source, .. } | Self::Evaluation { source, .. } | Self::Instance { source, .. } => {
                Some(source.code)
            }
            _ => None,
        }
    }
}

/// Errors surfacing without an expression attached (host functions, direct
/// `Expression` use) keep their static/dynamic split.
impl From<XPathError> for EngineError {
    fn from(source: XPathError) -> Self {
        if source.is_static() {
            Self::Compile { expr: String::new(), source }
        } else {
            Self::Evaluation { expr: String::new(), source }
        }
    }
}
