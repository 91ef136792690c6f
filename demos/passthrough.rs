//! A wrapper-style grammar: everything after the tool name is captured
//! verbatim for a child process.
//!
//! Try:
//!
//! ```sh
//! cargo run --example passthrough -- --timeout 5 run ls -la /tmp
//! ```

use arg_grammar_core::{Field, Schema, TypeSpec};
use arg_grammar_engine::{BoxedError, GrammarBuilder};

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(err) = run(args) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(args: Vec<String>) -> Result<(), BoxedError> {
    let schema = Schema::new("wrap")
        .field(
            Field::new("timeout", TypeSpec::Int)
                .tagged(r#"help:"Seconds before giving up." default:"30""#)
                .expect("static tag string"),
        )
        .field(Field::command(
            "run",
            vec![
                Field::new("command", TypeSpec::List(Box::new(TypeSpec::String)))
                    .tagged(r#"arg passthrough:"all" help:"Command line to wrap.""#)
                    .expect("static tag string"),
            ],
        ));

    let grammar = GrammarBuilder::new(schema)
        .action("run", |scope| {
            let timeout = scope
                .value("timeout")
                .and_then(|v| v.as_int())
                .expect("defaulted flag is bound");
            let command: Vec<&str> = scope
                .value("run.command")
                .and_then(|v| v.as_list())
                .map(|items| items.iter().filter_map(|v| v.as_str()).collect())
                .unwrap_or_default();
            println!("would run {command:?} with a {timeout}s timeout");
            Ok(())
        })
        .build()?;

    let mut ctx = grammar.parse(args)?;
    ctx.run()?;
    Ok(())
}
