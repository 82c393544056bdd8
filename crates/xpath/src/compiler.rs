//! Namespace and function resolution of a parsed expression.
//!
//! Compilation happens once per (source, prefix table); the resulting
//! [`Expression`] is immutable and shared through the expression cache.
use crate::consts::XML_NS;
use crate::context::ExprContext;
use crate::error::{Error, ErrorCode};
use crate::functions::FunctionRegistry;
use crate::model::{ExpandedName, Node};
use crate::namespaces::NamespaceResolver;
use crate::parser::XPathParser;
use crate::parser::ast::{self, Axis, BinaryOp, KindTest};
use crate::value::{NodeSet, Value};

/// Namespace of a name test, as far as compile time could tell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NsBinding {
    /// Unprefixed name.
    Default,
    Uri(String),
    /// Prefix unknown at compile time; resolved again when evaluated.
    Unresolved(String),
}

impl NsBinding {
    fn of(prefix: Option<&str>, ns: &NamespaceResolver) -> Self {
        match prefix {
            None => NsBinding::Default,
            Some("xml") => NsBinding::Uri(XML_NS.to_string()),
            Some(p) => match ns.lookup(p) {
                Some(uri) => NsBinding::Uri(uri.to_string()),
                None => NsBinding::Unresolved(p.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Test {
    Kind(KindTest),
    ProcessingInstruction(Option<String>),
    Principal,
    PrincipalInNamespace(NsBinding),
    Name { ns: NsBinding, local: String },
}

#[derive(Debug, Clone)]
pub(crate) struct Step {
    pub axis: Axis,
    pub test: Test,
    pub predicates: Vec<Op>,
}

#[derive(Debug, Clone)]
pub(crate) struct Location {
    pub absolute: bool,
    pub steps: Vec<Step>,
    /// Top-level location of an expression: its own result nodes are not
    /// recorded as dependencies.
    pub is_root: bool,
}

#[derive(Debug, Clone)]
pub(crate) enum Op {
    Literal(String),
    Number(f64),
    Location(Location),
    Filter { primary: Box<Op>, predicates: Vec<Op> },
    Path { filter: Box<Op>, path: Location },
    Union(Box<Op>, Box<Op>),
    Binary { op: BinaryOp, left: Box<Op>, right: Box<Op> },
    Negate(Box<Op>),
    Call { name: ExpandedName, args: Vec<Op> },
}

/// A compiled XPath 1.0 expression.
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    root: Op,
}

impl Expression {
    /// Parse and resolve `source`. Function names must be known to
    /// `functions`; element name prefixes may stay unresolved.
    pub fn compile(source: &str, ns: &NamespaceResolver, functions: &FunctionRegistry) -> Result<Self, Error> {
        let ast = XPathParser::parse_to_ast(source)?;
        let compiler = Compiler { ns, functions };
        let mut root = compiler.expr(&ast)?;
        if let Op::Location(loc) = &mut root {
            loc.is_root = true;
        }
        Ok(Self { source: source.to_string(), root })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn root(&self) -> &Op {
        &self.root
    }

    /// Whether the expression is a bare location path (a "binding" path).
    pub fn is_location_path(&self) -> bool {
        matches!(self.root, Op::Location(_))
    }

    pub fn evaluate_nodes(&self, ctx: &ExprContext<'_>) -> Result<NodeSet, Error> {
        self.evaluate(ctx)?.into_nodeset()
    }

    /// First node of the result, if any.
    pub fn evaluate_node(&self, ctx: &ExprContext<'_>) -> Result<Option<Node>, Error> {
        Ok(self.evaluate_nodes(ctx)?.into_iter().next())
    }

    pub fn evaluate_string(&self, ctx: &ExprContext<'_>) -> Result<String, Error> {
        Ok(self.evaluate(ctx)?.string_value())
    }

    pub fn evaluate_boolean(&self, ctx: &ExprContext<'_>) -> Result<bool, Error> {
        Ok(self.evaluate(ctx)?.boolean_value())
    }

    pub fn evaluate_number(&self, ctx: &ExprContext<'_>) -> Result<f64, Error> {
        Ok(self.evaluate(ctx)?.number_value())
    }
}

struct Compiler<'a> {
    ns: &'a NamespaceResolver,
    functions: &'a FunctionRegistry,
}

impl Compiler<'_> {
    fn expr(&self, e: &ast::Expr) -> Result<Op, Error> {
        Ok(match e {
            ast::Expr::Literal(s) => Op::Literal(s.clone()),
            ast::Expr::Number(n) => Op::Number(*n),
            ast::Expr::Location(path) => Op::Location(self.location(path)?),
            ast::Expr::Filter { primary, predicates } => Op::Filter {
                primary: Box::new(self.expr(primary)?),
                predicates: self.exprs(predicates)?,
            },
            ast::Expr::Path { filter, path } => {
                Op::Path { filter: Box::new(self.expr(filter)?), path: self.location(path)? }
            }
            ast::Expr::Union(a, b) => Op::Union(Box::new(self.expr(a)?), Box::new(self.expr(b)?)),
            ast::Expr::Binary { op, left, right } => {
                Op::Binary { op: *op, left: Box::new(self.expr(left)?), right: Box::new(self.expr(right)?) }
            }
            ast::Expr::Negate(inner) => Op::Negate(Box::new(self.expr(inner)?)),
            ast::Expr::FunctionCall { prefix, local, args } => {
                let name = self.function_name(prefix.as_deref(), local)?;
                Op::Call { name, args: self.exprs(args)? }
            }
        })
    }

    fn exprs(&self, list: &[ast::Expr]) -> Result<Vec<Op>, Error> {
        list.iter().map(|e| self.expr(e)).collect()
    }

    fn function_name(&self, prefix: Option<&str>, local: &str) -> Result<ExpandedName, Error> {
        let name = match prefix {
            None => ExpandedName::new(None, local),
            Some(p) => {
                let uri = self.ns.lookup(p).ok_or_else(|| {
                    Error::from_code(ErrorCode::XPST0081, format!("unknown namespace prefix {p:?} in {p}:{local}()"))
                })?;
                ExpandedName::new(Some(uri), local)
            }
        };
        if !self.functions.contains(&name) {
            return Err(Error::from_code(ErrorCode::XPST0017, format!("unknown function {name}()")));
        }
        Ok(name)
    }

    fn location(&self, path: &ast::LocationPath) -> Result<Location, Error> {
        let steps = path.steps.iter().map(|s| self.step(s)).collect::<Result<Vec<_>, _>>()?;
        Ok(Location { absolute: path.absolute, steps, is_root: false })
    }

    fn step(&self, step: &ast::Step) -> Result<Step, Error> {
        let test = match &step.test {
            ast::NodeTest::Kind(k) => Test::Kind(*k),
            ast::NodeTest::ProcessingInstruction(t) => Test::ProcessingInstruction(t.clone()),
            ast::NodeTest::Wildcard => Test::Principal,
            ast::NodeTest::PrefixWildcard(p) => Test::PrincipalInNamespace(NsBinding::of(Some(p), self.ns)),
            ast::NodeTest::Name { prefix, local } => {
                Test::Name { ns: NsBinding::of(prefix.as_deref(), self.ns), local: local.clone() }
            }
        };
        Ok(Step { axis: step.axis, test, predicates: self.exprs(&step.predicates)? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_function_is_a_compile_error() {
        let err = Expression::compile("frobnicate(1)", &NamespaceResolver::new(), &FunctionRegistry::with_defaults())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::XPST0017);
    }

    #[test]
    fn unresolved_element_prefix_compiles() {
        let expr = Expression::compile("q:item", &NamespaceResolver::new(), &FunctionRegistry::with_defaults())
            .unwrap();
        assert!(expr.is_location_path());
    }
}
