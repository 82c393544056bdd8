//! Registries shared by every model and element of one form.
use std::rc::Rc;

use bindery_schema::{SchemaRegistry, TypeRef};
use bindery_xpath::{DepSetId, DepSetIds, DependencyTags, Expression, ExpressionCache, FunctionRegistry, NamespaceResolver};

use crate::error::EngineError;
use crate::host;

/// Owns the schema table, the compiled-expression cache, the function
/// library (with host functions installed), the namespace prefixes, the
/// dependency set-id allocator and the dependency tag side table.
///
/// Register prefixes and extension functions before compiling expressions
/// that reference them.
#[derive(Debug)]
pub struct FormContext {
    schemas: SchemaRegistry,
    cache: ExpressionCache,
    functions: FunctionRegistry,
    namespaces: NamespaceResolver,
    set_ids: DepSetIds,
    tags: DependencyTags,
    string_type: TypeRef,
}

impl FormContext {
    pub fn new() -> Result<Self, EngineError> {
        let schemas = SchemaRegistry::with_builtins()?;
        let string_type = schemas.get_type("xsd:string")?;
        let mut functions = FunctionRegistry::with_defaults();
        host::register(&mut functions);
        Ok(Self {
            schemas,
            cache: ExpressionCache::new(),
            functions,
            namespaces: NamespaceResolver::with_defaults(),
            set_ids: DepSetIds::default(),
            tags: DependencyTags::new(),
            string_type,
        })
    }

    pub fn register_prefix(&mut self, prefix: &str, uri: &str) {
        tracing::debug!(prefix, uri, "namespace prefix registered");
        self.namespaces.register(prefix, uri);
        self.schemas.register_prefix(prefix, uri);
    }

    /// Compile through the cache using the current prefix table.
    pub fn compile(&self, source: &str) -> Result<Rc<Expression>, EngineError> {
        self.cache
            .get_or_compile(source, &self.namespaces, &self.functions)
            .map_err(|source_err| EngineError::Compile { expr: source.to_string(), source: source_err })
    }

    pub fn resolve_type(&self, qname: &str) -> Result<TypeRef, EngineError> {
        Ok(self.schemas.get_type(qname)?)
    }

    /// `xsd:string`, the type of nodes no bind assigns one to.
    pub fn default_type(&self) -> &TypeRef {
        &self.string_type
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    pub fn schemas_mut(&mut self) -> &mut SchemaRegistry {
        &mut self.schemas
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Extension point for host functions.
    pub fn functions_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.functions
    }

    pub fn namespaces(&self) -> &NamespaceResolver {
        &self.namespaces
    }

    pub fn cache(&self) -> &ExpressionCache {
        &self.cache
    }

    pub fn tags(&self) -> &DependencyTags {
        &self.tags
    }

    pub(crate) fn mint_set_id(&self) -> DepSetId {
        self.set_ids.mint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_functions_compile() {
        let forms = FormContext::new().unwrap();
        for source in ["instance('a')", "index('r')", "nodeindex('c')", "is-valid(.)", "instance()"] {
            forms.compile(source).unwrap();
        }
    }

    #[test]
    fn compile_errors_keep_the_source() {
        let forms = FormContext::new().unwrap();
        match forms.compile("1 +") {
            Err(EngineError::Compile { expr, .. }) => assert_eq!(expr, "1 +"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn registered_prefixes_reach_types_and_expressions() {
        let mut forms = FormContext::new().unwrap();
        forms.register_prefix("xs", bindery_schema::XSD_NS);
        assert_eq!(forms.resolve_type("xs:integer").unwrap().name(), "integer");
        forms.compile("/xs:data").unwrap();
    }
}
