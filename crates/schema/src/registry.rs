use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::SchemaError;
use crate::types::{Type, TypeRef};
use crate::{XFORMS_NS, XSD_NS, XSLTFORMS_NS};

/// Types declared under one namespace, plus that schema's own prefix
/// aliases (consulted before the registry-wide table).
#[derive(Debug, Clone)]
pub struct Schema {
    ns: String,
    name: Option<String>,
    types: FxHashMap<String, TypeRef>,
    prefixes: FxHashMap<String, String>,
}

impl Schema {
    pub fn new(ns: &str) -> Self {
        Self { ns: ns.to_string(), name: None, types: FxHashMap::default(), prefixes: FxHashMap::default() }
    }

    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: &str, ns: &str) -> Self {
        self.prefixes.insert(prefix.to_string(), ns.to_string());
        self
    }

    pub fn namespace(&self) -> &str {
        &self.ns
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Insert or replace a type; returns the shared handle.
    pub fn define(&mut self, ty: impl Into<Type>) -> TypeRef {
        let ty: TypeRef = Rc::new(ty.into());
        self.types.insert(ty.name().to_string(), Rc::clone(&ty));
        ty
    }

    pub fn get(&self, name: &str) -> Option<&TypeRef> {
        self.types.get(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: FxHashMap<String, Schema>,
    prefixes: FxHashMap<String, String>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        let mut prefixes = FxHashMap::default();
        for (prefix, ns) in [("xsd_", XSD_NS), ("xsd", XSD_NS), ("xforms", XFORMS_NS), ("xsltforms", XSLTFORMS_NS)] {
            prefixes.insert(prefix.to_string(), ns.to_string());
        }
        Self { schemas: FxHashMap::default(), prefixes }
    }
}

impl SchemaRegistry {
    /// Registry with the global aliases but no schemas.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the XML Schema, XForms and XSLTForms built-in types.
    pub fn with_builtins() -> Result<Self, SchemaError> {
        let mut registry = Self::new();
        crate::builtin::install(&mut registry)?;
        Ok(registry)
    }

    pub fn register_prefix(&mut self, prefix: &str, ns: &str) {
        self.prefixes.insert(prefix.to_string(), ns.to_string());
    }

    pub fn prefix_namespace(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(String::as_str)
    }

    pub fn add_schema(&mut self, schema: Schema) -> Result<(), SchemaError> {
        if self.schemas.contains_key(&schema.ns) {
            return Err(SchemaError::DuplicateSchema(schema.ns));
        }
        tracing::debug!(ns = %schema.ns, types = schema.len(), "schema registered");
        self.schemas.insert(schema.ns.clone(), schema);
        Ok(())
    }

    pub fn schema(&self, ns: &str) -> Option<&Schema> {
        self.schemas.get(ns)
    }

    /// The schema for `ns`, created empty on first use.
    pub fn schema_mut(&mut self, ns: &str) -> &mut Schema {
        self.schemas.entry(ns.to_string()).or_insert_with(|| Schema::new(ns))
    }

    pub fn get_type_ns(&self, ns: &str, name: &str) -> Result<TypeRef, SchemaError> {
        let schema = self.schemas.get(ns).ok_or_else(|| SchemaError::UnknownNamespace(ns.to_string()))?;
        schema
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownType { ns: ns.to_string(), name: name.to_string() })
    }

    /// Resolve `prefix:name` through the global alias table. Unprefixed
    /// names are looked up in the XML Schema namespace.
    pub fn get_type(&self, qname: &str) -> Result<TypeRef, SchemaError> {
        match qname.split_once(':') {
            Some((prefix, local)) => {
                let ns = self.prefix_namespace(prefix).ok_or_else(|| SchemaError::UnknownPrefix(prefix.to_string()))?;
                self.get_type_ns(ns, local)
            }
            None => self.get_type_ns(XSD_NS, qname),
        }
    }

    /// Resolve `qname` as written inside the schema for `ns`: that schema's
    /// prefixes first, then the global ones; unprefixed names are local.
    pub fn get_type_in(&self, ns: &str, qname: &str) -> Result<TypeRef, SchemaError> {
        let schema = self.schemas.get(ns).ok_or_else(|| SchemaError::UnknownNamespace(ns.to_string()))?;
        match qname.split_once(':') {
            Some((prefix, local)) => match schema.prefixes.get(prefix) {
                Some(target) => self.get_type_ns(target, local),
                None => self.get_type(qname),
            },
            None => self.get_type_ns(ns, qname),
        }
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }
}
