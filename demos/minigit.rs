//! A git-flavoured grammar showing branching arguments, constraint groups,
//! and actions.
//!
//! Try:
//!
//! ```sh
//! cargo run --example minigit -- issue 42 close
//! cargo run --example minigit -- remote add origin https://example.com/repo.git
//! ```

use arg_grammar_core::{Field, Schema, TypeSpec};
use arg_grammar_engine::{BoxedError, GrammarBuilder};

fn schema() -> Schema {
    Schema::new("minigit")
        .field(
            Field::new("verbose", TypeSpec::Bool)
                .tagged(r#"short:"v" negatable help:"Chatty output.""#)
                .expect("static tag string"),
        )
        .field(Field::command(
            "issue",
            vec![Field::branch(
                "selected",
                vec![
                    Field::new("number", TypeSpec::Int)
                        .tagged(r#"arg help:"Issue number.""#)
                        .expect("static tag string"),
                    Field::command("close", vec![]),
                    Field::command(
                        "assign",
                        vec![
                            Field::new("to", TypeSpec::String)
                                .tagged(r#"arg help:"Assignee.""#)
                                .expect("static tag string"),
                        ],
                    ),
                ],
            )],
        ))
        .field(Field::command(
            "remote",
            vec![Field::command(
                "add",
                vec![
                    Field::new("name", TypeSpec::String).tagged("arg").expect("static tag string"),
                    Field::new("url", TypeSpec::String).tagged("arg").expect("static tag string"),
                    Field::new("fetch", TypeSpec::Bool)
                        .tagged(r#"xor:"mode""#)
                        .expect("static tag string"),
                    Field::new("mirror", TypeSpec::Bool)
                        .tagged(r#"xor:"mode""#)
                        .expect("static tag string"),
                ],
            )],
        ))
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(err) = run(args) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(args: Vec<String>) -> Result<(), BoxedError> {
    let grammar = GrammarBuilder::new(schema())
        .action("issue.selected.close", |scope| {
            let number = scope
                .value("issue.selected.number")
                .and_then(|v| v.as_int())
                .expect("branch key is bound");
            println!("closing issue #{number}");
            Ok(())
        })
        .action("issue.selected.assign", |scope| {
            let number = scope
                .value("issue.selected.number")
                .and_then(|v| v.as_int())
                .expect("branch key is bound");
            let to = scope
                .value("issue.selected.assign.to")
                .and_then(|v| v.as_str())
                .expect("required positional is bound");
            println!("assigning issue #{number} to {to}");
            Ok(())
        })
        .action("remote.add", |scope| {
            let name = scope
                .value("remote.add.name")
                .and_then(|v| v.as_str())
                .expect("required positional is bound");
            let url = scope
                .value("remote.add.url")
                .and_then(|v| v.as_str())
                .expect("required positional is bound");
            println!("adding remote {name} -> {url}");
            Ok(())
        })
        .build()?;

    let mut ctx = grammar.parse(args)?;
    ctx.run()?;
    Ok(())
}
