//! Type registry for model item types.
//!
//! A [`SchemaRegistry`] holds one [`Schema`] per namespace; each schema maps
//! local names to [`Type`]s. Atomic types carry the usual XML Schema facets
//! and validate lexical values; list and union types compose them.
//!
//! ```
//! use bindery_schema::SchemaRegistry;
//!
//! let registry = SchemaRegistry::with_builtins().unwrap();
//! let positive = registry.get_type("xsd:positiveInteger").unwrap();
//! assert!(positive.validate("1"));
//! assert!(!positive.validate("0"));
//! ```
mod builtin;
pub mod error;
pub mod registry;
pub mod types;

pub use error::SchemaError;
pub use registry::{Schema, SchemaRegistry};
pub use types::{AtomicType, ListType, Type, TypeRef, UnionType, ValueClass, WhiteSpace};

pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";
pub const XFORMS_NS: &str = "http://www.w3.org/2002/xforms";
pub const XSLTFORMS_NS: &str = "http://www.agencexml.com/xsltforms";
