use pest::Parser;
use pest::iterators::Pair;

use crate::error::{Error, ErrorCode};

pub mod ast;

#[derive(pest_derive::Parser)]
#[grammar = "parser/xpath1.pest"]
pub struct XPathParser;

type Result<T> = core::result::Result<T, Error>;

fn malformed(pair: &Pair<Rule>) -> Error {
    Error::from_code(
        ErrorCode::XPST0003,
        format!("unexpected {:?} at offset {}", pair.as_rule(), pair.as_span().start()),
    )
}

fn missing(what: &str) -> Error {
    Error::from_code(ErrorCode::XPST0003, format!("incomplete expression: missing {what}"))
}

fn self_node() -> ast::Step {
    ast::Step { axis: ast::Axis::SelfAxis, test: ast::NodeTest::Kind(ast::KindTest::AnyNode), predicates: vec![] }
}

fn descendant_or_self_node() -> ast::Step {
    ast::Step {
        axis: ast::Axis::DescendantOrSelf,
        test: ast::NodeTest::Kind(ast::KindTest::AnyNode),
        predicates: vec![],
    }
}

impl XPathParser {
    /// Parse an XPath 1.0 expression into its AST.
    pub fn parse_to_ast(input: &str) -> Result<ast::Expr> {
        let mut pairs = Self::parse(Rule::xpath, input).map_err(|e| {
            Error::from_code(ErrorCode::XPST0003, format!("cannot parse {input:?}\n{e}"))
        })?;
        let root = pairs.next().ok_or_else(|| missing("expression"))?;
        let expr = root.into_inner().next().ok_or_else(|| missing("expression"))?;
        Self::build_expr(expr)
    }

    fn build_expr(pair: Pair<Rule>) -> Result<ast::Expr> {
        match pair.as_rule() {
            Rule::expr | Rule::paren_expr => {
                let inner = pair.into_inner().next().ok_or_else(|| missing("expression"))?;
                Self::build_expr(inner)
            }
            Rule::or_expr
            | Rule::and_expr
            | Rule::equality_expr
            | Rule::relational_expr
            | Rule::additive_expr
            | Rule::multiplicative_expr => Self::build_binary_chain(pair),
            Rule::unary_expr => Self::build_unary(pair),
            Rule::union_expr => Self::build_union(pair),
            Rule::path_expr => Self::build_path_expr(pair),
            Rule::filter_expr => Self::build_filter(pair),
            Rule::location_path => {
                let inner = pair.into_inner().next().ok_or_else(|| missing("location path"))?;
                Ok(ast::Expr::Location(Self::build_location_path(inner)?))
            }
            Rule::literal => Self::build_literal(pair),
            Rule::number => {
                let v = pair.as_str().parse::<f64>().map_err(|_| malformed(&pair))?;
                Ok(ast::Expr::Number(v))
            }
            Rule::function_call => Self::build_function_call(pair),
            _ => Err(malformed(&pair)),
        }
    }

    fn binary_op(pair: &Pair<Rule>) -> Result<ast::BinaryOp> {
        use ast::BinaryOp as B;
        Ok(match pair.as_rule() {
            Rule::K_OR => B::Or,
            Rule::K_AND => B::And,
            Rule::OP_EQ => B::Eq,
            Rule::OP_NE => B::Ne,
            Rule::OP_LT => B::Lt,
            Rule::OP_LTE => B::Le,
            Rule::OP_GT => B::Gt,
            Rule::OP_GTE => B::Ge,
            Rule::OP_PLUS => B::Add,
            Rule::OP_MINUS => B::Sub,
            Rule::OP_MUL => B::Mul,
            Rule::K_DIV => B::Div,
            Rule::K_MOD => B::Mod,
            _ => return Err(malformed(pair)),
        })
    }

    /// Left-associative fold of `operand (op operand)*`.
    fn build_binary_chain(pair: Pair<Rule>) -> Result<ast::Expr> {
        let mut inner = pair.into_inner();
        let first = inner.next().ok_or_else(|| missing("operand"))?;
        let mut expr = Self::build_expr(first)?;
        while let Some(op) = inner.next() {
            let op = Self::binary_op(&op)?;
            let right = inner.next().ok_or_else(|| missing("right operand"))?;
            expr = ast::Expr::Binary { op, left: Box::new(expr), right: Box::new(Self::build_expr(right)?) };
        }
        Ok(expr)
    }

    fn build_unary(pair: Pair<Rule>) -> Result<ast::Expr> {
        let mut negations = 0usize;
        let mut operand = None;
        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::OP_MINUS => negations += 1,
                _ => operand = Some(Self::build_expr(p)?),
            }
        }
        let mut expr = operand.ok_or_else(|| missing("operand"))?;
        for _ in 0..negations {
            expr = ast::Expr::Negate(Box::new(expr));
        }
        Ok(expr)
    }

    fn build_union(pair: Pair<Rule>) -> Result<ast::Expr> {
        let mut expr: Option<ast::Expr> = None;
        for p in pair.into_inner() {
            if p.as_rule() == Rule::OP_PIPE {
                continue;
            }
            let next = Self::build_expr(p)?;
            expr = Some(match expr {
                Some(left) => ast::Expr::Union(Box::new(left), Box::new(next)),
                None => next,
            });
        }
        expr.ok_or_else(|| missing("path"))
    }

    fn build_path_expr(pair: Pair<Rule>) -> Result<ast::Expr> {
        let mut inner = pair.into_inner();
        let head = inner.next().ok_or_else(|| missing("path"))?;
        if head.as_rule() == Rule::location_path {
            return Self::build_expr(head);
        }
        let filter = Self::build_expr(head)?;
        let Some(sep) = inner.next() else {
            return Ok(filter);
        };
        let rel = inner.next().ok_or_else(|| missing("relative path"))?;
        let mut steps = Vec::new();
        if Self::is_double_slash(&sep) {
            steps.push(descendant_or_self_node());
        }
        Self::collect_steps(rel, &mut steps)?;
        Ok(ast::Expr::Path { filter: Box::new(filter), path: ast::LocationPath { absolute: false, steps } })
    }

    fn build_filter(pair: Pair<Rule>) -> Result<ast::Expr> {
        let mut inner = pair.into_inner();
        let primary = Self::build_expr(inner.next().ok_or_else(|| missing("primary expression"))?)?;
        let predicates = inner.map(Self::build_predicate).collect::<Result<Vec<_>>>()?;
        if predicates.is_empty() {
            Ok(primary)
        } else {
            Ok(ast::Expr::Filter { primary: Box::new(primary), predicates })
        }
    }

    fn build_literal(pair: Pair<Rule>) -> Result<ast::Expr> {
        let content = pair.into_inner().next().map(|p| p.as_str().to_string()).unwrap_or_default();
        Ok(ast::Expr::Literal(content))
    }

    fn build_function_call(pair: Pair<Rule>) -> Result<ast::Expr> {
        let mut inner = pair.into_inner();
        let name = inner.next().ok_or_else(|| missing("function name"))?;
        let (prefix, local) = split_qname(name.as_str());
        let args = inner.map(Self::build_expr).collect::<Result<Vec<_>>>()?;
        Ok(ast::Expr::FunctionCall { prefix, local, args })
    }

    fn build_location_path(pair: Pair<Rule>) -> Result<ast::LocationPath> {
        match pair.as_rule() {
            Rule::absolute_location_path => {
                let mut inner = pair.into_inner();
                let head = inner.next().ok_or_else(|| missing("path"))?;
                let mut steps = Vec::new();
                if head.as_rule() == Rule::path_sep {
                    if Self::is_double_slash(&head) {
                        steps.push(descendant_or_self_node());
                    }
                    let rel = inner.next().ok_or_else(|| missing("relative path"))?;
                    Self::collect_steps(rel, &mut steps)?;
                }
                Ok(ast::LocationPath { absolute: true, steps })
            }
            Rule::relative_location_path => {
                let mut steps = Vec::new();
                Self::collect_steps(pair, &mut steps)?;
                Ok(ast::LocationPath { absolute: false, steps })
            }
            _ => Err(malformed(&pair)),
        }
    }

    fn is_double_slash(sep: &Pair<Rule>) -> bool {
        sep.as_str() == "//"
    }

    /// Flatten `step (sep step)*`, expanding `//` to `descendant-or-self::node()`.
    fn collect_steps(pair: Pair<Rule>, steps: &mut Vec<ast::Step>) -> Result<()> {
        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::step => steps.push(Self::build_step(p)?),
                Rule::path_sep => {
                    if Self::is_double_slash(&p) {
                        steps.push(descendant_or_self_node());
                    }
                }
                _ => return Err(malformed(&p)),
            }
        }
        Ok(())
    }

    fn build_step(pair: Pair<Rule>) -> Result<ast::Step> {
        let mut axis = ast::Axis::Child;
        let mut test = None;
        let mut predicates = Vec::new();
        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::abbrev_step => {
                    if p.as_str() == ".." {
                        return Ok(ast::Step { axis: ast::Axis::Parent, ..self_node() });
                    }
                    return Ok(self_node());
                }
                Rule::axis_specifier => {
                    let spec = p.into_inner().next().ok_or_else(|| missing("axis"))?;
                    axis = match spec.as_rule() {
                        Rule::OP_AT => ast::Axis::Attribute,
                        _ => ast::Axis::from_name(spec.as_str()).ok_or_else(|| malformed(&spec))?,
                    };
                }
                Rule::node_test => test = Some(Self::build_node_test(p)?),
                Rule::predicate => predicates.push(Self::build_predicate(p)?),
                _ => return Err(malformed(&p)),
            }
        }
        let test = test.ok_or_else(|| missing("node test"))?;
        Ok(ast::Step { axis, test, predicates })
    }

    fn build_node_test(pair: Pair<Rule>) -> Result<ast::NodeTest> {
        let inner = pair.into_inner().next().ok_or_else(|| missing("node test"))?;
        match inner.as_rule() {
            Rule::kind_test => {
                let kind = inner.into_inner().next().ok_or_else(|| missing("node type"))?;
                match kind.as_rule() {
                    Rule::pi_test => {
                        let target = match kind.into_inner().next() {
                            Some(lit) => match Self::build_literal(lit)? {
                                ast::Expr::Literal(s) => Some(s),
                                _ => None,
                            },
                            None => None,
                        };
                        Ok(ast::NodeTest::ProcessingInstruction(target))
                    }
                    Rule::node_type => Ok(ast::NodeTest::Kind(match kind.as_str() {
                        "text" => ast::KindTest::Text,
                        "comment" => ast::KindTest::Comment,
                        _ => ast::KindTest::AnyNode,
                    })),
                    _ => Err(malformed(&kind)),
                }
            }
            Rule::name_test => {
                let name = inner.into_inner().next().ok_or_else(|| missing("name"))?;
                match name.as_rule() {
                    Rule::wildcard => Ok(ast::NodeTest::Wildcard),
                    Rule::prefixed_wildcard => {
                        let prefix = name.as_str().trim_end_matches(":*");
                        Ok(ast::NodeTest::PrefixWildcard(prefix.to_string()))
                    }
                    Rule::qname => {
                        let (prefix, local) = split_qname(name.as_str());
                        Ok(ast::NodeTest::Name { prefix, local })
                    }
                    _ => Err(malformed(&name)),
                }
            }
            _ => Err(malformed(&inner)),
        }
    }

    fn build_predicate(pair: Pair<Rule>) -> Result<ast::Expr> {
        let inner = pair.into_inner().next().ok_or_else(|| missing("predicate"))?;
        Self::build_expr(inner)
    }
}

fn split_qname(s: &str) -> (Option<String>, String) {
    match s.split_once(':') {
        Some((p, l)) => (Some(p.to_string()), l.to_string()),
        None => (None, s.to_string()),
    }
}
