use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::compiler::Expression;
use crate::error::Error;
use crate::functions::FunctionRegistry;
use crate::namespaces::NamespaceResolver;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    source: String,
    prefixes: NamespaceResolver,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Memo of compiled expressions keyed by source text and prefix table.
///
/// Entries are never invalidated; failed compilations are not stored.
#[derive(Debug, Default)]
pub struct ExpressionCache {
    entries: RefCell<FxHashMap<CacheKey, Rc<Expression>>>,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl ExpressionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compile(
        &self,
        source: &str,
        ns: &NamespaceResolver,
        functions: &FunctionRegistry,
    ) -> Result<Rc<Expression>, Error> {
        let key = CacheKey { source: source.to_string(), prefixes: ns.clone() };
        if let Some(expr) = self.entries.borrow().get(&key) {
            self.hits.set(self.hits.get() + 1);
            tracing::trace!(source, "expression cache hit");
            return Ok(Rc::clone(expr));
        }
        self.misses.set(self.misses.get() + 1);
        let expr = Rc::new(Expression::compile(source, ns, functions)?);
        self.entries.borrow_mut().insert(key, Rc::clone(&expr));
        Ok(expr)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats { hits: self.hits.get(), misses: self.misses.get(), entries: self.entries.borrow().len() }
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}
