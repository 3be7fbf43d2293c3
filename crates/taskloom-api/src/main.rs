//! Taskloom CLI entry point.
//!
//! Binary name: `tloom`
//!
//! Parses CLI arguments, builds the engine over the filesystem-backed
//! stores in the data directory, then dispatches to the requested
//! command. All command output is JSON on stdout; diagnostics go to
//! stderr through tracing.

mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

use taskloom_core::engine::{Engine, RunContext};
use taskloom_core::error::EngineError;
use taskloom_core::validate::validate_template;
use taskloom_infra::config::load_engine_config;
use taskloom_infra::generator::NullGenerator;
use taskloom_infra::queue::InMemoryQueue;
use taskloom_infra::runlog_store::FsRunLogSink;
use taskloom_infra::template_store::FsTemplateSource;
use taskloom_infra::tools::LocalToolRegistry;
use taskloom_types::template::ExecKind;

use cli::{Cli, Commands};

type LocalEngine = Engine<InMemoryQueue, NullGenerator>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,taskloom=debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let engine = build_engine(&cli.data_dir).await;

    match cli.command {
        Commands::Run {
            class_name,
            id,
            inputs,
        } => {
            let kind = parse_kind(&class_name)?;
            let inputs = parse_inputs(&inputs)?;
            let outputs = run(&engine, kind, &id, inputs).await?;
            print_json(&Value::Object(outputs))?;
        }

        Commands::GetTemplate { class_name, id } => {
            let kind = parse_kind(&class_name)?;
            let doc = get_template(&engine, kind, &id)?;
            print_json(&doc)?;
        }

        Commands::ValidateTemplate {
            class_name,
            template,
        } => {
            let kind = parse_kind(&class_name)?;
            match validate_inline(kind, &template) {
                Ok(name) => println!("template '{name}' is valid"),
                Err(EngineError::Template(issues)) => {
                    eprintln!("template is invalid:");
                    for issue in &issues {
                        eprintln!("- {issue}");
                    }
                    std::process::exit(1);
                }
                Err(err) => return Err(err.into()),
            }
        }

        Commands::GetToolsTemplate => {
            let templates: Vec<Value> = engine
                .tools()
                .list()
                .iter()
                .map(|meta| serde_json::to_value(meta.to_template()))
                .collect::<Result<_, _>>()?;
            print_json(&Value::Array(templates))?;
        }

        Commands::GetTools => {
            let tools: Vec<Value> = engine
                .tools()
                .list()
                .iter()
                .map(|meta| {
                    json!({
                        "id": meta.id,
                        "name": meta.name,
                        "description": meta.description,
                    })
                })
                .collect();
            print_json(&Value::Array(tools))?;
        }
    }

    Ok(())
}

/// Wire the engine over the data directory's stores.
async fn build_engine(data_dir: &Path) -> LocalEngine {
    let config = load_engine_config(data_dir).await;
    let template_dir = data_dir.join(&config.template_dir);
    let log_dir = data_dir.join(&config.log_dir);

    Engine::new(
        Arc::new(FsTemplateSource::new(template_dir)),
        Arc::new(FsRunLogSink::new(log_dir)),
        Arc::new(LocalToolRegistry::new()),
        InMemoryQueue::new(),
        NullGenerator,
        config,
    )
}

fn parse_kind(class_name: &str) -> anyhow::Result<ExecKind> {
    match ExecKind::parse(class_name) {
        Some(kind) => Ok(kind),
        None => bail!(
            "unknown class '{class_name}' (expected task, process, action, generator, or tool)"
        ),
    }
}

fn parse_inputs(raw: &str) -> anyhow::Result<Map<String, Value>> {
    let value: Value = serde_json::from_str(raw).context("--inputs is not valid JSON")?;
    match value {
        Value::Object(map) => Ok(map),
        other => bail!("--inputs must be a JSON object, got {other}"),
    }
}

async fn run(
    engine: &LocalEngine,
    kind: ExecKind,
    id: &str,
    inputs: Map<String, Value>,
) -> Result<Map<String, Value>, EngineError> {
    let ctx = RunContext::root(None);
    match kind {
        ExecKind::Task => engine.run_task(id, inputs).await,
        ExecKind::Process => engine.run_process(id, inputs, &ctx).await,
        ExecKind::Action => engine.run_action(id, inputs, &ctx).await,
        ExecKind::Generator => engine.run_generator(id, inputs, &ctx).await,
        ExecKind::Tool => engine.run_tool(id, inputs, &ctx).await,
    }
}

/// Tool "templates" come from the registry; everything else from the
/// template store.
fn get_template(engine: &LocalEngine, kind: ExecKind, id: &str) -> Result<Value, EngineError> {
    if kind == ExecKind::Tool {
        let meta = engine
            .tools()
            .metadata(id)
            .ok_or_else(|| EngineError::TemplateNotFound {
                class: kind.to_string(),
                id: id.to_string(),
            })?;
        return Ok(serde_json::to_value(meta.to_template())?);
    }
    get_raw(engine, kind, id)
}

/// Validate a template supplied on the command line, before it is ever
/// saved to the template store.
fn validate_inline(kind: ExecKind, raw: &str) -> Result<String, EngineError> {
    let doc: Value = serde_json::from_str(raw)?;
    let template = validate_template(kind, &doc)?;
    Ok(template.name)
}

fn get_raw(engine: &LocalEngine, kind: ExecKind, id: &str) -> Result<Value, EngineError> {
    // The document as stored, not the validated form.
    engine.templates().fetch(kind, id)
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inline_generator_template_validates() {
        let doc = json!({
            "name": "gen_answer0001",
            "description": "answer a question",
            "inputs": [
                {"name": "question", "type": "string", "description": "the question"}
            ],
            "outputs": [
                {"name": "answer", "type": "string", "description": "the answer"}
            ],
        });
        let name = validate_inline(ExecKind::Generator, &doc.to_string()).unwrap();
        assert_eq!(name, "gen_answer0001");
    }

    #[test]
    fn inline_defects_are_all_collected() {
        // Missing description, bad input type, and a task needs an
        // execution graph: three defects, one report.
        let doc = json!({
            "name": "task_broken0001",
            "inputs": [
                {"name": "q", "type": "text", "description": "d"}
            ],
            "outputs": null,
        });
        let err = validate_inline(ExecKind::Task, &doc.to_string()).unwrap_err();
        match err {
            EngineError::Template(issues) => assert_eq!(issues.len(), 3, "{issues:?}"),
            other => panic!("expected a template error, got {other}"),
        }
    }

    #[test]
    fn inline_template_must_be_json() {
        let err = validate_inline(ExecKind::Task, "{not json").unwrap_err();
        assert!(matches!(err, EngineError::Json(_)));
    }
}
