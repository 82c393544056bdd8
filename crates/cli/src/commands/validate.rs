use std::fmt::Write;
use std::path::PathBuf;

use anyhow::{anyhow, bail};
use bindery_engine::{ActionEngine, BindSpec, EngineConfig, ModelId};
use bindery_xpath::Node;
use clap::Args;
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

use crate::OutputFormat;
use crate::util::{CliResult, node_path, yes_no};

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[arg(value_name = "INSTANCE")]
    pub document: PathBuf,
    /// Bind as `NODESET;key=xpath;...` with keys type, required, relevant,
    /// readonly, constraint, calculate and id.
    #[arg(long = "bind", value_name = "SPEC")]
    pub binds: Vec<String>,
    #[arg(long = "namespace", value_name = "PREFIX=URI")]
    pub namespaces: Vec<String>,
    #[arg(long = "instance", value_name = "NAME=PATH")]
    pub instances: Vec<String>,
    /// List every node, not only bound or invalid ones.
    #[arg(long = "all")]
    pub all: bool,
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NodeReport {
    path: String,
    value: String,
    #[serde(rename = "type")]
    type_name: Option<String>,
    required: bool,
    readonly: bool,
    relevant: bool,
    valid: bool,
}

#[derive(Serialize, Debug)]
struct Summary<'a> {
    checked: usize,
    invalid: usize,
    nodes: &'a [NodeReport],
}

pub struct ValidateReport {
    pub output: String,
    pub engine: ActionEngine,
    pub invalid: usize,
}

pub(crate) fn parse_bind(spec: &str) -> CliResult<BindSpec> {
    let mut parts = spec.split(';');
    let nodeset = parts.next().map(str::trim).filter(|s| !s.is_empty()).ok_or_else(|| anyhow!("empty bind {spec:?}"))?;
    let mut bind = BindSpec::new(nodeset);
    for part in parts.map(str::trim).filter(|p| !p.is_empty()) {
        let (key, value) = part.split_once('=').ok_or_else(|| anyhow!("invalid bind property {part:?}"))?;
        let value = value.trim();
        bind = match key.trim() {
            "type" => bind.with_type(value),
            "required" => bind.with_required(value),
            "relevant" => bind.with_relevant(value),
            "readonly" => bind.with_readonly(value),
            "constraint" => bind.with_constraint(value),
            "calculate" => bind.with_calculate(value),
            "id" => bind.with_id(value),
            other => bail!("unknown bind property {other:?}"),
        };
    }
    Ok(bind)
}

pub fn run(config: EngineConfig, args: &ValidateArgs) -> CliResult<ValidateReport> {
    let (mut engine, model) = crate::load_engine(config, &args.document, &args.instances, &args.namespaces)?;
    for spec in &args.binds {
        engine.add_bind(model, None, &parse_bind(spec)?)?;
    }
    engine.start()?;

    let nodes = collect(&engine, model, args.all)?;
    let invalid = nodes.iter().filter(|n| !n.valid).count();
    tracing::debug!(listed = nodes.len(), invalid, "validation finished");
    let output = match args.format {
        OutputFormat::Text => render_validate_text(&nodes, invalid),
        OutputFormat::Json => {
            serde_json::to_string_pretty(&Summary { checked: nodes.len(), invalid, nodes: &nodes })?
        }
    };
    Ok(ValidateReport { output, engine, invalid })
}

fn collect(engine: &ActionEngine, model: ModelId, all: bool) -> CliResult<Vec<NodeReport>> {
    let model = engine.model(model)?;
    let mut out = Vec::new();
    let mut stack: Vec<Node> = model.instances().iter().filter_map(|i| i.root()).rev().collect();
    while let Some(node) = stack.pop() {
        let state = model.node_state(&node);
        let props = state.properties;
        if all || state.bind.is_some() || !props.valid {
            out.push(NodeReport {
                path: node_path(&node),
                value: node.value(),
                type_name: state.ty.as_ref().map(|t| t.name().to_owned()),
                required: props.required,
                readonly: props.readonly,
                relevant: props.relevant,
                valid: props.valid,
            });
        }
        let mut next: Vec<Node> = node.attributes();
        next.extend(node.children().into_iter().filter(Node::is_element));
        stack.extend(next.into_iter().rev());
    }
    Ok(out)
}

fn colorize_status(valid: bool) -> String {
    if valid {
        "ok".if_supports_color(Stream::Stdout, |text| text.green().to_string()).to_string()
    } else {
        "invalid".if_supports_color(Stream::Stdout, |text| text.bold().red().to_string()).to_string()
    }
}

pub(crate) fn render_validate_text(nodes: &[NodeReport], invalid: usize) -> String {
    let mut output = String::new();
    for node in nodes {
        let mut flags = Vec::new();
        if node.required {
            flags.push("required");
        }
        if node.readonly {
            flags.push("readonly");
        }
        if !node.relevant {
            flags.push("irrelevant");
        }
        let ty = node.type_name.as_deref().map(|t| format!(" ({t})")).unwrap_or_default();
        let flags = if flags.is_empty() { String::new() } else { format!(" [{}]", flags.join(", ")) };
        let _ = writeln!(&mut output, "{:<7} {}{ty} = {:?}{flags}", colorize_status(node.valid), node.path, node.value);
    }
    let _ = writeln!(&mut output, "{} node(s) listed, {invalid} invalid, all valid: {}", nodes.len(), yes_no(invalid == 0));
    output.trim_end().to_owned()
}
