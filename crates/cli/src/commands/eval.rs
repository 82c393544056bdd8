use std::fmt::Write;
use std::path::PathBuf;

use bindery_engine::{ActionEngine, EngineConfig};
use bindery_xpath::value::number_to_string;
use bindery_xpath::{Node, NodeKind, Value};
use clap::Args;
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

use crate::OutputFormat;
use crate::util::{CliResult, node_path};

#[derive(Args, Debug, Clone)]
pub struct EvalArgs {
    #[arg(value_name = "INSTANCE")]
    pub document: PathBuf,
    #[arg(value_name = "XPATH")]
    pub expression: String,
    /// Extra namespace binding, `prefix=uri`.
    #[arg(long = "namespace", value_name = "PREFIX=URI")]
    pub namespaces: Vec<String>,
    /// Extra instance reachable through `instance('name')`.
    #[arg(long = "instance", value_name = "NAME=PATH")]
    pub instances: Vec<String>,
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum EvalItem {
    Node { kind: String, path: String, value: String },
    Value {
        value: serde_json::Value,
        /// XPath string value, used for text output.
        #[serde(skip)]
        text: String,
    },
}

pub fn run(config: EngineConfig, args: &EvalArgs) -> CliResult<(String, ActionEngine)> {
    let (mut engine, _) = crate::load_engine(config, &args.document, &args.instances, &args.namespaces)?;
    engine.start()?;
    let value = engine.evaluate(&args.expression)?;
    let items = summarize(value);
    let output = match args.format {
        OutputFormat::Text => render_eval_text(&items),
        OutputFormat::Json => serde_json::to_string_pretty(&items)?,
    };
    Ok((output, engine))
}

pub(crate) fn summarize(value: Value) -> Vec<EvalItem> {
    let text = value.string_value();
    let value = match value {
        Value::NodeSet(nodes) => return nodes.iter().map(node_item).collect(),
        Value::String(s) => serde_json::Value::String(s),
        Value::Boolean(b) => serde_json::Value::Bool(b),
        Value::Number(n) => serde_json::Number::from_f64(n)
            .map_or_else(|| serde_json::Value::String(number_to_string(n)), serde_json::Value::Number),
    };
    vec![EvalItem::Value { value, text }]
}

fn node_item(node: &Node) -> EvalItem {
    let kind = match node.kind() {
        NodeKind::Document => "document",
        NodeKind::Element => "element",
        NodeKind::Attribute => "attribute",
        NodeKind::Text => "text",
        NodeKind::Comment => "comment",
        NodeKind::ProcessingInstruction => "processing-instruction",
    };
    EvalItem::Node { kind: kind.to_owned(), path: node_path(node), value: node.string_value() }
}

fn colorize_path(path: &str) -> String {
    path.if_supports_color(Stream::Stdout, |text| text.bold().fg_rgb::<79, 166, 255>().to_string()).to_string()
}

fn colorize_value(value: &str) -> String {
    value.if_supports_color(Stream::Stdout, |text| text.fg_rgb::<136, 192, 74>().to_string()).to_string()
}

pub(crate) fn render_eval_text(items: &[EvalItem]) -> String {
    let mut output = String::new();
    for item in items {
        match item {
            EvalItem::Node { path, value, .. } => {
                let quoted = serde_json::to_string(value).unwrap_or_else(|_| format!("{value:?}"));
                let _ = writeln!(&mut output, "{} = {}", colorize_path(path), colorize_value(&quoted));
            }
            EvalItem::Value { text, .. } => {
                let _ = writeln!(&mut output, "{}", colorize_value(text));
            }
        }
    }
    output.trim_end().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{strip_ansi, write_instance};
    use rstest::rstest;

    const ORDER: &str = r#"<order id="o1"><item>10</item><item>20.5</item></order>"#;

    fn args(document: PathBuf, expression: &str, format: OutputFormat) -> EvalArgs {
        EvalArgs { document, expression: expression.into(), namespaces: vec![], instances: vec![], format }
    }

    #[rstest]
    #[case("sum(item)", "30.5")]
    #[case("count(item) = 2", "true")]
    #[case("concat('#', @id)", "#o1")]
    fn scalar_results_print_plainly(#[case] expression: &str, #[case] expected: &str) {
        let file = write_instance(ORDER);
        let (output, _) = run(EngineConfig::default(), &args(file.path().into(), expression, OutputFormat::Text)).unwrap();
        assert_eq!(strip_ansi(&output), expected);
    }

    #[rstest]
    fn nodes_print_their_path_and_value() {
        let file = write_instance(ORDER);
        let (output, _) = run(EngineConfig::default(), &args(file.path().into(), "item | @id", OutputFormat::Text)).unwrap();
        let plain = strip_ansi(&output);
        assert!(plain.contains("/order/@id = \"o1\""));
        assert!(plain.contains("/order/item[2] = \"20.5\""));
    }

    #[rstest]
    fn json_output_tags_items() {
        let file = write_instance(ORDER);
        let (output, _) = run(EngineConfig::default(), &args(file.path().into(), "item[1]", OutputFormat::Json)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json[0]["type"], "Node");
        assert_eq!(json[0]["kind"], "element");
        assert_eq!(json[0]["value"], "10");
    }

    #[rstest]
    fn extra_instances_are_reachable() {
        let file = write_instance(ORDER);
        let rates = write_instance("<rates><eur>2</eur></rates>");
        let mut args = args(file.path().into(), "sum(item) * instance('rates')/eur", OutputFormat::Text);
        args.instances = vec![format!("rates={}", rates.path().display())];
        let (output, _) = run(EngineConfig::default(), &args).unwrap();
        assert_eq!(strip_ansi(&output), "61");
    }

    #[rstest]
    fn syntax_errors_name_the_expression() {
        let file = write_instance(ORDER);
        let err = run(EngineConfig::default(), &args(file.path().into(), "item[", OutputFormat::Text)).unwrap_err();
        assert!(err.to_string().contains("item["));
    }
}
