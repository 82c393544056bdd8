//! XPath 1.0 over a mutable XML instance tree, with dependency recording.
//!
//! ```
//! use bindery_xpath::{ExprContext, Expression, FunctionRegistry, NamespaceResolver, parse_document};
//!
//! let doc = parse_document("<data><item>1</item><item>2</item></data>").unwrap();
//! let ns = NamespaceResolver::new();
//! let functions = FunctionRegistry::with_defaults();
//! let expr = Expression::compile("sum(//item) * 2", &ns, &functions).unwrap();
//! let ctx = ExprContext::new(&doc, &ns, &functions);
//! assert_eq!(expr.evaluate_number(&ctx).unwrap(), 6.0);
//! ```
pub mod cache;
pub mod compiler;
pub mod consts;
pub mod context;
pub mod deps;
pub mod error;
mod evaluator;
pub mod functions;
pub mod model;
pub mod namespaces;
pub mod parser;
pub mod value;

pub use cache::{CacheStats, ExpressionCache};
pub use compiler::Expression;
pub use context::{ExprContext, HostEnvironment};
pub use deps::{
    DepElement, DepSetId, DepSetIds, DependencyRecorder, DependencySet, DependencySink, DependencyTags, ElementId,
    ModelId,
};
pub use error::{Error, ErrorCode};
pub use functions::{DefaultArg, FunctionRegistry};
pub use model::{ExpandedName, Node, NodeKind, QName, parse_document};
pub use namespaces::NamespaceResolver;
pub use parser::XPathParser;
pub use value::{NodeSet, Value};
