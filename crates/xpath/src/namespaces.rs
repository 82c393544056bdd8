use std::collections::BTreeMap;

use crate::consts::{XFORMS_NS, XML_NS, XSD_NS, XSLTFORMS_NS};

/// Prefix → namespace URI table consulted while compiling and (for late
/// re-resolution) while evaluating expressions.
///
/// Ordered so that the table itself can participate in cache keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NamespaceResolver {
    bindings: BTreeMap<String, String>,
}

impl NamespaceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver pre-populated with the prefixes forms conventionally use.
    pub fn with_defaults() -> Self {
        let mut ns = Self::new();
        ns.register("xml", XML_NS);
        ns.register("xsd", XSD_NS);
        ns.register("xf", XFORMS_NS);
        ns.register("xforms", XFORMS_NS);
        ns.register("xsltforms", XSLTFORMS_NS);
        ns
    }

    pub fn register(&mut self, prefix: &str, uri: &str) {
        self.bindings.insert(prefix.to_string(), uri.to_string());
    }

    pub fn lookup(&self, prefix: &str) -> Option<&str> {
        self.bindings.get(prefix).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
