//! `arg-grammar`: inspect and exercise declarative CLI schemas.
//!
//! The binary's own command line is declared with the engine it ships:
//!
//! - `arg-grammar dump [--schema FILE] [--format json|yaml]` — emit a schema
//!   document (the bundled demo schema by default).
//! - `arg-grammar try --schema FILE [--trace] -- ARGS...` — build a grammar
//!   from a schema document and parse the given tokens against it, printing
//!   the selected command path and bound values.

use std::fs;

use arg_grammar_core::{Field, Schema, TypeSpec, Value};
use arg_grammar_engine::{ActionScope, BoxedError, GrammarBuilder};

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(err) = run(args) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(args: Vec<String>) -> Result<(), BoxedError> {
    let grammar = GrammarBuilder::new(cli_schema())
        .action("dump", run_dump)
        .action("try", run_try)
        .build()?;
    let mut ctx = grammar.parse(args)?;
    ctx.run()?;
    Ok(())
}

/// The binary's own grammar, declared with the engine itself.
fn cli_schema() -> Schema {
    Schema::new("arg-grammar")
        .with_help("Inspect and exercise declarative CLI schemas.")
        .field(
            Field::new("format", TypeSpec::String)
                .tagged(r#"help:"Output format." enum:"json,yaml" default:"json" short:"f""#)
                .expect("static tag string"),
        )
        .field(Field::command(
            "dump",
            vec![
                Field::new("schema", TypeSpec::Optional(Box::new(TypeSpec::String)))
                    .tagged(r#"help:"Schema JSON file; bundled demo schema when omitted.""#)
                    .expect("static tag string"),
            ],
        ))
        .field(Field::command(
            "try",
            vec![
                Field::new("schema", TypeSpec::String)
                    .tagged(r#"help:"Schema JSON file to build." required"#)
                    .expect("static tag string"),
                Field::new("trace", TypeSpec::Bool)
                    .tagged(r#"help:"Keep going on parse errors and show the partial path.""#)
                    .expect("static tag string"),
                Field::new("args", TypeSpec::List(Box::new(TypeSpec::String)))
                    .tagged(r#"arg passthrough:"all" help:"Tokens to parse.""#)
                    .expect("static tag string"),
            ],
        ))
}

fn output_format(scope: &ActionScope<'_>) -> String {
    scope
        .value("format")
        .and_then(|v| v.as_str())
        .unwrap_or("json")
        .to_string()
}

fn emit<T: serde::Serialize>(format: &str, value: &T) -> Result<(), BoxedError> {
    match format {
        "yaml" => print!("{}", serde_yaml::to_string(value)?),
        _ => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

fn run_dump(scope: &ActionScope<'_>) -> Result<(), BoxedError> {
    let schema = match scope.value("dump.schema").and_then(|v| v.as_str()) {
        Some(path) => load_schema(path)?,
        None => demo_schema(),
    };
    emit(&output_format(scope), &schema)
}

fn run_try(scope: &ActionScope<'_>) -> Result<(), BoxedError> {
    let path = scope
        .value("try.schema")
        .and_then(|v| v.as_str())
        .expect("required flag is bound")
        .to_string();
    let schema = load_schema(&path)?;
    let grammar = GrammarBuilder::new(schema).build()?;

    let tokens: Vec<String> = scope
        .value("try.args")
        .and_then(|v| v.as_list())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let trace = scope
        .value("try.trace")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    let format = output_format(scope);
    if trace {
        let ctx = grammar.trace(tokens);
        let report = TraceReport {
            command: ctx.command_line(),
            error: ctx.error.as_ref().map(ToString::to_string),
        };
        return emit(&format, &report);
    }

    let ctx = grammar.parse(tokens)?;
    let report = ParseReport {
        command: ctx.command_line(),
        values: ctx.values().clone(),
    };
    emit(&format, &report)
}

#[derive(serde::Serialize)]
struct ParseReport {
    command: String,
    values: std::collections::BTreeMap<String, Value>,
}

#[derive(serde::Serialize)]
struct TraceReport {
    command: String,
    error: Option<String>,
}

fn load_schema(path: &str) -> Result<Schema, BoxedError> {
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("failed to read schema {path}: {err}"))?;
    let schema: Schema = serde_json::from_str(&raw)
        .map_err(|err| format!("failed to parse schema {path}: {err}"))?;
    Ok(schema)
}

/// A small file-copy flavoured schema bundled for demonstration.
fn demo_schema() -> Schema {
    Schema::new("demo")
        .with_help("A demonstration grammar.")
        .field(
            Field::new("verbose", TypeSpec::Bool)
                .tagged(r#"short:"v" negatable help:"Chatty output.""#)
                .expect("static tag string"),
        )
        .field(
            Field::new("level", TypeSpec::String)
                .tagged(r#"enum:"debug,info,warn" default:"info" env:"DEMO_LEVEL""#)
                .expect("static tag string"),
        )
        .field(Field::command(
            "copy",
            vec![
                Field::new("src", TypeSpec::String)
                    .tagged(r#"arg help:"Source path.""#)
                    .expect("static tag string"),
                Field::new("dest", TypeSpec::String)
                    .tagged(r#"arg help:"Destination path.""#)
                    .expect("static tag string"),
                Field::new("force", TypeSpec::Bool)
                    .tagged(r#"short:"F" help:"Overwrite the destination.""#)
                    .expect("static tag string"),
            ],
        ))
        .field(Field::command(
            "list",
            vec![
                Field::new("paths", TypeSpec::List(Box::new(TypeSpec::String)))
                    .tagged(r#"arg optional help:"Paths to list.""#)
                    .expect("static tag string"),
            ],
        ))
}
