//! Function registry and the built-in function library.
//!
//! Functions are keyed by [`ExpandedName`]. Core XPath and XForms functions
//! live in no namespace; hosts add their own through
//! [`FunctionRegistry::register_ns`].
use core::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::context::ExprContext;
use crate::error::Error;
use crate::model::ExpandedName;
use crate::value::Value;

mod boolean;
mod datetime;
mod digest;
mod nodes;
mod numeric;
mod strings;

pub type Arity = usize;

pub type FunctionImpl = Rc<dyn Fn(&ExprContext<'_>, &[Value]) -> Result<Value, Error>>;

/// Substitution applied when a function is called without arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefaultArg {
    #[default]
    None,
    /// The context node itself.
    ContextNode,
    /// A node-set holding only the context node.
    ContextNodeSet,
    /// The string-value of the context node.
    ContextString,
}

#[derive(Clone)]
pub struct FunctionDef {
    pub min_arity: Arity,
    pub max_arity: Option<Arity>,
    pub default_arg: DefaultArg,
    pub func: FunctionImpl,
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDef")
            .field("min_arity", &self.min_arity)
            .field("max_arity", &self.max_arity)
            .field("default_arg", &self.default_arg)
            .finish_non_exhaustive()
    }
}

impl FunctionDef {
    pub fn accepts(&self, argc: Arity) -> bool {
        argc >= self.min_arity && self.max_arity.is_none_or(|max| argc <= max)
    }
}

#[derive(Default, Clone)]
pub struct FunctionRegistry {
    fns: FxHashMap<ExpandedName, FunctionDef>,
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry").field("functions", &self.fns.len()).finish()
    }
}

impl FunctionRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the core XPath 1.0 and XForms function library.
    pub fn with_defaults() -> Self {
        let mut reg = Self::new();
        nodes::register(&mut reg);
        strings::register(&mut reg);
        boolean::register(&mut reg);
        numeric::register(&mut reg);
        datetime::register(&mut reg);
        digest::register(&mut reg);
        reg
    }

    /// Register (or replace) a function. `max_arity = None` is variadic.
    pub fn register(
        &mut self,
        name: ExpandedName,
        min_arity: Arity,
        max_arity: Option<Arity>,
        default_arg: DefaultArg,
        func: FunctionImpl,
    ) {
        self.fns.insert(name, FunctionDef { min_arity, max_arity, default_arg, func });
    }

    /// Convenience: register a no-namespace function with a plain closure.
    pub fn register_fn<F>(&mut self, local: &str, min_arity: Arity, max_arity: Option<Arity>, f: F)
    where
        F: 'static + Fn(&ExprContext<'_>, &[Value]) -> Result<Value, Error>,
    {
        self.register(ExpandedName::new(None, local), min_arity, max_arity, DefaultArg::None, Rc::new(f));
    }

    /// Like [`register_fn`](Self::register_fn), substituting `default_arg`
    /// for an empty argument list.
    pub fn register_defaulted<F>(
        &mut self,
        local: &str,
        min_arity: Arity,
        max_arity: Option<Arity>,
        default_arg: DefaultArg,
        f: F,
    ) where
        F: 'static + Fn(&ExprContext<'_>, &[Value]) -> Result<Value, Error>,
    {
        self.register(ExpandedName::new(None, local), min_arity, max_arity, default_arg, Rc::new(f));
    }

    /// Extension point: register a function in a namespace.
    pub fn register_ns<F>(&mut self, ns_uri: &str, local: &str, min_arity: Arity, max_arity: Option<Arity>, f: F)
    where
        F: 'static + Fn(&ExprContext<'_>, &[Value]) -> Result<Value, Error>,
    {
        self.register(ExpandedName::new(Some(ns_uri), local), min_arity, max_arity, DefaultArg::None, Rc::new(f));
    }

    pub fn contains(&self, name: &ExpandedName) -> bool {
        self.fns.contains_key(name)
    }

    pub fn get(&self, name: &ExpandedName) -> Option<&FunctionDef> {
        self.fns.get(name)
    }

    pub fn len(&self) -> usize {
        self.fns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fns.is_empty()
    }

    /// Dispatch a call: substitute the default argument, check arity, run.
    pub fn call(&self, name: &ExpandedName, ctx: &ExprContext<'_>, mut args: Vec<Value>) -> Result<Value, Error> {
        let def = self.get(name).ok_or_else(|| {
            Error::from_code(crate::error::ErrorCode::XPST0017, format!("unknown function {name}()"))
        })?;
        if args.is_empty() {
            match def.default_arg {
                DefaultArg::None => {}
                DefaultArg::ContextNode | DefaultArg::ContextNodeSet => {
                    args.push(Value::NodeSet(vec![ctx.node().clone()]));
                }
                DefaultArg::ContextString => args.push(Value::String(ctx.node().string_value())),
            }
        }
        if !def.accepts(args.len()) {
            return Err(Error::wrong_arity(&name.to_string(), args.len()));
        }
        (def.func)(ctx, &args)
    }
}

/// Argument `i` as string, empty when absent.
pub(crate) fn arg_string(args: &[Value], i: usize) -> String {
    args.get(i).map(Value::string_value).unwrap_or_default()
}

pub(crate) fn arg_number(args: &[Value], i: usize) -> f64 {
    args.get(i).map_or(f64::NAN, Value::number_value)
}

pub(crate) fn arg_nodeset<'v>(args: &'v [Value], i: usize, function: &str) -> Result<&'v [crate::model::Node], Error> {
    match args.get(i) {
        Some(Value::NodeSet(nodes)) => Ok(nodes),
        Some(other) => Err(Error::type_error(format!(
            "{function}() expects a node-set, got {}",
            other.type_name()
        ))),
        None => Err(Error::wrong_arity(function, i)),
    }
}
