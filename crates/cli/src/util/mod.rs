use std::fmt::Write;

use anyhow::anyhow;
use bindery_engine::ActionEngine;
use bindery_xpath::{Node, NodeKind};

pub type CliResult<T> = anyhow::Result<T>;

/// Split `key=value` arguments.
pub fn parse_pairs(values: &[String], what: &str) -> CliResult<Vec<(String, String)>> {
    values
        .iter()
        .map(|value| {
            value
                .split_once('=')
                .map(|(key, rest)| (key.trim().to_owned(), rest.trim().to_owned()))
                .filter(|(key, _)| !key.is_empty())
                .ok_or_else(|| anyhow!("invalid {what} {value:?}, expected NAME=VALUE"))
        })
        .collect()
}

pub fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

/// Absolute location path of `node`, with positions among same-named
/// siblings where they disambiguate.
pub fn node_path(node: &Node) -> String {
    let mut steps = Vec::new();
    let mut current = Some(node.clone());
    while let Some(n) = current {
        match n.kind() {
            NodeKind::Document => break,
            NodeKind::Attribute => steps.push(format!("@{}", n.node_name())),
            NodeKind::Element => {
                let name = n.node_name();
                let same: Vec<Node> = n
                    .parent()
                    .map(|p| p.children().into_iter().filter(|c| c.is_element() && c.node_name() == name).collect())
                    .unwrap_or_default();
                match same.iter().position(|c| *c == n) {
                    Some(i) if same.len() > 1 => steps.push(format!("{name}[{}]", i + 1)),
                    _ => steps.push(name),
                }
            }
            _ => steps.push("node()".to_owned()),
        }
        current = n.parent();
    }
    steps.reverse();
    format!("/{}", steps.join("/"))
}

pub fn render_profile(engine: &ActionEngine) -> String {
    let report = engine.profiler().report();
    let mut output = String::new();
    let _ = writeln!(
        &mut output,
        "flushes: {} ({} iterations), builds: {}, refreshes: {}",
        report.flushes, report.flush_iterations, report.builds, report.refreshes
    );
    for expression in &report.expressions {
        let _ = writeln!(
            &mut output,
            "{:>10.3?} {:>6}x  {}",
            expression.total, expression.calls, expression.source
        );
    }
    output.trim_end().to_owned()
}
