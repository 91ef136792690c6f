use arg_grammar_core::{Field, Schema, TagSet, TypeSpec, Value};
use arg_grammar_engine::{GrammarBuilder, Grammar, ParseError};

fn build(schema: Schema) -> Grammar {
    GrammarBuilder::new(schema).build().expect("grammar should build")
}

fn user_create_schema() -> Schema {
    Schema::new("app").field(Field::command(
        "user",
        vec![Field::command(
            "create",
            vec![
                Field::new("id", TypeSpec::Int).tagged("arg").unwrap(),
                Field::new("first", TypeSpec::String).tagged("arg").unwrap(),
                Field::new("last", TypeSpec::String).tagged("arg").unwrap(),
            ],
        )],
    ))
}

#[test]
fn test_nested_command_with_positionals() {
    let grammar = build(user_create_schema());
    let ctx = grammar
        .parse(["user", "create", "10", "Alec", "Thomas"])
        .expect("should parse");
    assert_eq!(ctx.command_line(), "user create <id> <first> <last>");
    assert_eq!(ctx.value("user.create.id"), Some(&Value::Int(10)));
    assert_eq!(
        ctx.value("user.create.first").and_then(|v| v.as_str()),
        Some("Alec")
    );
    assert_eq!(
        ctx.value("user.create.last").and_then(|v| v.as_str()),
        Some("Thomas")
    );
}

#[test]
fn test_missing_positionals_is_an_error() {
    let grammar = build(user_create_schema());
    let err = grammar.parse(["user", "create", "10"]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "missing positional arguments <first> <last>"
    );
}

fn branching_schema() -> Schema {
    Schema::new("app").field(Field::command(
        "user",
        vec![Field::branch(
            "selected",
            vec![
                Field::new("id", TypeSpec::Int).tagged("arg").unwrap(),
                Field::command("delete", vec![]),
                Field::command(
                    "rename",
                    vec![Field::new("to", TypeSpec::String)],
                ),
            ],
        )],
    ))
}

#[test]
fn test_branching_argument_selects_subtree() {
    let grammar = build(branching_schema());
    let ctx = grammar.parse(["user", "10", "delete"]).expect("should parse");
    assert_eq!(ctx.command_line(), "user <id> delete");
    assert_eq!(ctx.value("user.selected.id"), Some(&Value::Int(10)));
}

#[test]
fn test_branching_argument_subtree_flags() {
    let grammar = build(branching_schema());
    let ctx = grammar
        .parse(["user", "10", "rename", "--to", "alice"])
        .expect("should parse");
    assert_eq!(ctx.command_line(), "user <id> rename");
    assert_eq!(
        ctx.value("user.selected.rename.to").and_then(|v| v.as_str()),
        Some("alice")
    );
}

#[test]
fn test_bare_branch_parent_is_an_error() {
    let grammar = build(branching_schema());
    let err = grammar.parse(["user"]).unwrap_err();
    assert!(err.to_string().contains("expected"), "got: {err}");
}

fn negatable_schema() -> Schema {
    Schema::new("app").field(Field::command(
        "cmd",
        vec![
            Field::new("flag", TypeSpec::Bool)
                .tagged(r#"negatable default:"true""#)
                .unwrap(),
            Field::new("custom", TypeSpec::Bool)
                .tagged(r#"negatable:"standard" default:"true""#)
                .unwrap(),
        ],
    ))
}

#[test]
fn test_negation_sets_false() {
    let grammar = build(negatable_schema());
    let ctx = grammar.parse(["cmd", "--no-flag"]).expect("should parse");
    assert_eq!(ctx.value("cmd.flag"), Some(&Value::Bool(false)));
    assert_eq!(ctx.value("cmd.custom"), Some(&Value::Bool(true)));
}

#[test]
fn test_custom_negation_with_false_value_inverts() {
    let grammar = build(negatable_schema());
    let ctx = grammar
        .parse(["cmd", "--standard=false"])
        .expect("should parse");
    assert_eq!(ctx.value("cmd.flag"), Some(&Value::Bool(true)));
    assert_eq!(ctx.value("cmd.custom"), Some(&Value::Bool(true)));
}

#[test]
fn test_negation_equivalences() {
    let schema = Schema::new("app").field(
        Field::new("keep", TypeSpec::Bool).tagged("negatable").unwrap(),
    );
    let grammar = build(schema);
    for (args, expected) in [
        (vec!["--no-keep"], false),
        (vec!["--keep=false"], false),
        (vec!["--no-keep=false"], true),
        (vec!["--keep"], true),
    ] {
        let ctx = grammar.parse(args.clone()).expect("should parse");
        assert_eq!(
            ctx.value("keep"),
            Some(&Value::Bool(expected)),
            "args: {args:?}"
        );
    }
}

#[test]
fn test_missing_required_flags_grouped_message() {
    let schema = Schema::new("app")
        .field(
            Field::new("one", TypeSpec::Bool)
                .tagged(r#"xor:"one,two" required"#)
                .unwrap(),
        )
        .field(
            Field::new("two", TypeSpec::Bool)
                .tagged(r#"xor:"one" required"#)
                .unwrap(),
        )
        .field(
            Field::new("three", TypeSpec::Bool)
                .tagged(r#"xor:"two" required"#)
                .unwrap(),
        )
        .field(Field::new("four", TypeSpec::Bool).tagged("required").unwrap());
    let grammar = build(schema);
    let err = grammar.parse(Vec::<String>::new()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "missing flags: --four, --one or --three, --one or --two"
    );
}

fn default_command_schema() -> Schema {
    Schema::new("app")
        .field(Field::command("one", vec![]))
        .field(
            Field::command(
                "two",
                vec![Field::new("arg", TypeSpec::String).tagged("arg").unwrap()],
            )
            .with_tags(TagSet::parse(r#"cmd default:"withargs""#).unwrap()),
        )
}

#[test]
fn test_default_command_consumes_argument() {
    let grammar = build(default_command_schema());
    let ctx = grammar.parse(["arg"]).expect("should parse");
    assert_eq!(ctx.command_line(), "two <arg>");
    assert_eq!(ctx.value("two.arg").and_then(|v| v.as_str()), Some("arg"));
}

#[test]
fn test_named_sibling_wins_over_default() {
    let grammar = build(default_command_schema());
    let ctx = grammar.parse(["one"]).expect("should parse");
    assert_eq!(ctx.command_line(), "one");
}

#[test]
fn test_unknown_flag_inside_selected_command() {
    let grammar = build(default_command_schema());
    let err = grammar.parse(["one", "--flag"]).unwrap_err();
    assert_eq!(err.to_string(), "unknown flag --flag");
}

#[test]
fn test_passthrough_all_captures_everything() {
    let schema = Schema::new("app")
        .field(Field::new("flag", TypeSpec::String))
        .field(
            Field::new("args", TypeSpec::List(Box::new(TypeSpec::String)))
                .tagged(r#"arg passthrough:"all""#)
                .unwrap(),
        );
    let grammar = build(schema);
    let ctx = grammar
        .parse(["--invalid", "foobar", "something"])
        .expect("should parse");
    let args: Vec<&str> = ctx
        .value("args")
        .and_then(|v| v.as_list())
        .unwrap()
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert_eq!(args, vec!["--invalid", "foobar", "something"]);
    assert_eq!(ctx.value("flag").and_then(|v| v.as_str()), Some(""));
}

#[test]
fn test_passthrough_all_stops_flag_parsing_after_capture() {
    let schema = Schema::new("app")
        .field(Field::new("flag", TypeSpec::String))
        .field(
            Field::new("args", TypeSpec::List(Box::new(TypeSpec::String)))
                .tagged(r#"arg passthrough:"all""#)
                .unwrap(),
        );
    let grammar = build(schema);
    // Known flags parse until the first token is captured; from then on
    // even known-flag-shaped tokens are captured verbatim.
    let ctx = grammar
        .parse(["--flag", "x", "a", "--flag", "y"])
        .expect("should parse");
    assert_eq!(ctx.value("flag").and_then(|v| v.as_str()), Some("x"));
    let args: Vec<&str> = ctx
        .value("args")
        .and_then(|v| v.as_list())
        .unwrap()
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert_eq!(args, vec!["a", "--flag", "y"]);
}

#[test]
fn test_passthrough_partial_keeps_flag_validation() {
    let schema = Schema::new("app")
        .field(Field::new("flag", TypeSpec::String))
        .field(
            Field::new("args", TypeSpec::List(Box::new(TypeSpec::String)))
                .tagged(r#"arg passthrough:"partial""#)
                .unwrap(),
        );
    let grammar = build(schema);

    // Plain tokens are captured while known flags keep parsing, even after
    // capture has begun.
    let ctx = grammar
        .parse(["a", "--flag", "x", "b"])
        .expect("should parse");
    assert_eq!(ctx.value("flag").and_then(|v| v.as_str()), Some("x"));
    let args: Vec<&str> = ctx
        .value("args")
        .and_then(|v| v.as_list())
        .unwrap()
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert_eq!(args, vec!["a", "b"]);

    // Unlike all mode, unknown flags stay errors.
    let err = grammar.parse(["a", "--invalid"]).unwrap_err();
    assert_eq!(err.to_string(), "unknown flag --invalid");
}

#[test]
fn test_positional_joins_xor_group() {
    let schema = Schema::new("app")
        .field(
            Field::new("stdin", TypeSpec::Bool)
                .tagged(r#"xor:"input""#)
                .unwrap(),
        )
        .field(
            Field::new("file", TypeSpec::String)
                .tagged(r#"arg optional xor:"input""#)
                .unwrap(),
        );
    let grammar = build(schema);

    let err = grammar.parse(["--stdin", "f.txt"]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "--stdin and <file> can't be used together"
    );

    assert!(grammar.parse(["f.txt"]).is_ok());
    assert!(grammar.parse(["--stdin"]).is_ok());
}

#[test]
fn test_required_positional_waived_by_xor_sibling() {
    let schema = Schema::new("app")
        .field(
            Field::new("stdin", TypeSpec::Bool)
                .tagged(r#"xor:"input""#)
                .unwrap(),
        )
        .field(
            Field::new("file", TypeSpec::String)
                .tagged(r#"arg xor:"input""#)
                .unwrap(),
        );
    let grammar = build(schema);

    let ctx = grammar.parse(["--stdin"]).expect("should parse");
    assert_eq!(ctx.value("stdin"), Some(&Value::Bool(true)));
    // The waived positional keeps its reset zero value.
    assert_eq!(ctx.value("file").and_then(|v| v.as_str()), Some(""));

    let err = grammar.parse(Vec::<String>::new()).unwrap_err();
    assert_eq!(err.to_string(), "missing positional arguments <file>");
}

#[test]
fn test_parse_is_deterministic() {
    let grammar = build(user_create_schema());
    let args = ["user", "create", "10", "Alec", "Thomas"];
    let first = grammar.parse(args).expect("should parse");
    let second = grammar.parse(args).expect("should parse");
    assert_eq!(first.values(), second.values());
    assert_eq!(first.command_line(), second.command_line());
}

#[test]
fn test_default_applies_when_flag_absent() {
    let schema = Schema::new("app").field(
        Field::new("level", TypeSpec::String)
            .tagged(r#"default:"info" enum:"debug,info,warn""#)
            .unwrap(),
    );
    let grammar = build(schema);
    let ctx = grammar.parse(Vec::<String>::new()).expect("should parse");
    assert_eq!(ctx.value("level").and_then(|v| v.as_str()), Some("info"));
}

#[test]
fn test_enum_validation_covers_defaults() {
    let schema = Schema::new("app").field(
        Field::new("level", TypeSpec::String)
            .tagged(r#"default:"silly" enum:"debug,info""#)
            .unwrap(),
    );
    let grammar = build(schema);
    let err = grammar.parse(Vec::<String>::new()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "--level must be one of \"debug\",\"info\" but got \"silly\""
    );
}

#[test]
fn test_enum_validation_covers_parsed_values() {
    let schema = Schema::new("app").field(
        Field::new("colour", TypeSpec::String)
            .tagged(r#"enum:"red,green""#)
            .unwrap(),
    );
    let grammar = build(schema);
    let err = grammar.parse(["--colour", "blue"]).unwrap_err();
    assert!(matches!(err, ParseError::Enum { .. }), "got: {err}");
}

#[test]
fn test_list_separator_equivalence() {
    let schema = Schema::new("app").field(Field::new(
        "f",
        TypeSpec::List(Box::new(TypeSpec::String)),
    ));
    let grammar = build(schema);
    let split = grammar.parse(["--f=a,b", "--f=c"]).expect("should parse");
    let joined = grammar.parse(["--f=a,b,c"]).expect("should parse");
    assert_eq!(split.value("f"), joined.value("f"));
}

#[test]
fn test_escaped_list_separator() {
    let schema = Schema::new("app").field(Field::new(
        "f",
        TypeSpec::List(Box::new(TypeSpec::String)),
    ));
    let grammar = build(schema);
    let ctx = grammar.parse([r"--f=a\,b,c"]).expect("should parse");
    assert_eq!(
        ctx.value("f"),
        Some(&Value::List(vec![
            Value::Str("a,b".into()),
            Value::Str("c".into())
        ]))
    );
}

#[test]
fn test_map_flag_accumulates() {
    let schema = Schema::new("app").field(Field::new(
        "set",
        TypeSpec::Map(Box::new(TypeSpec::Int)),
    ));
    let grammar = build(schema);
    let ctx = grammar
        .parse(["--set", "a=1;b=2", "--set", "c=3"])
        .expect("should parse");
    let map = ctx.value("set").and_then(|v| v.as_map()).unwrap();
    assert_eq!(map.len(), 3);
    assert_eq!(map["c"], Value::Int(3));
}

#[test]
fn test_xor_conflict_rejected() {
    let schema = Schema::new("app")
        .field(Field::new("json", TypeSpec::Bool).tagged(r#"xor:"fmt""#).unwrap())
        .field(Field::new("yaml", TypeSpec::Bool).tagged(r#"xor:"fmt""#).unwrap());
    let grammar = build(schema);
    let err = grammar.parse(["--json", "--yaml"]).unwrap_err();
    assert_eq!(err.to_string(), "--json and --yaml can't be used together");
    assert!(grammar.parse(["--json"]).is_ok());
}

#[test]
fn test_and_group_is_all_or_none() {
    let schema = Schema::new("app")
        .field(Field::new("user", TypeSpec::String).tagged(r#"and:"auth""#).unwrap())
        .field(Field::new("pass", TypeSpec::String).tagged(r#"and:"auth""#).unwrap());
    let grammar = build(schema);
    let err = grammar.parse(["--user", "me"]).unwrap_err();
    assert_eq!(err.to_string(), "--user and --pass must be used together");
    assert!(grammar.parse(["--user", "me", "--pass", "s3cr3t"]).is_ok());
    assert!(grammar.parse(Vec::<String>::new()).is_ok());
}

#[test]
fn test_short_bundling() {
    let schema = Schema::new("app")
        .field(Field::new("all", TypeSpec::Bool).tagged(r#"short:"a""#).unwrap())
        .field(Field::new("brief", TypeSpec::Bool).tagged(r#"short:"b""#).unwrap())
        .field(Field::new("out", TypeSpec::String).tagged(r#"short:"o""#).unwrap());
    let grammar = build(schema);

    let ctx = grammar.parse(["-ab"]).expect("should parse");
    assert_eq!(ctx.value("all"), Some(&Value::Bool(true)));
    assert_eq!(ctx.value("brief"), Some(&Value::Bool(true)));

    let ctx = grammar.parse(["-abohello"]).expect("should parse");
    assert_eq!(ctx.value("out").and_then(|v| v.as_str()), Some("hello"));

    let ctx = grammar.parse(["-o", "file.txt"]).expect("should parse");
    assert_eq!(ctx.value("out").and_then(|v| v.as_str()), Some("file.txt"));
}

#[test]
fn test_literal_rest_mode() {
    let schema = Schema::new("app")
        .field(Field::new("verbose", TypeSpec::Bool))
        .field(
            Field::new("files", TypeSpec::List(Box::new(TypeSpec::String)))
                .tagged("arg")
                .unwrap(),
        );
    let grammar = build(schema);
    let ctx = grammar
        .parse(["--verbose", "--", "--not-a-flag", "-"])
        .expect("should parse");
    let files: Vec<&str> = ctx
        .value("files")
        .and_then(|v| v.as_list())
        .unwrap()
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert_eq!(files, vec!["--not-a-flag", "-"]);
}

#[test]
fn test_lone_dash_is_a_positional() {
    let schema = Schema::new("app").field(
        Field::new("input", TypeSpec::String).tagged("arg").unwrap(),
    );
    let grammar = build(schema);
    let ctx = grammar.parse(["-"]).expect("should parse");
    assert_eq!(ctx.value("input").and_then(|v| v.as_str()), Some("-"));
}

#[test]
fn test_empty_flag_value_forms() {
    let schema = Schema::new("app").field(Field::new("name", TypeSpec::String));
    let grammar = build(schema);
    let ctx = grammar.parse(["--name="]).expect("should parse");
    assert_eq!(ctx.value("name").and_then(|v| v.as_str()), Some(""));
    let ctx = grammar.parse(["--name", ""]).expect("should parse");
    assert_eq!(ctx.value("name").and_then(|v| v.as_str()), Some(""));
}

#[test]
fn test_ancestor_flags_stay_in_scope() {
    let schema = Schema::new("app")
        .field(Field::new("verbose", TypeSpec::Bool).tagged(r#"short:"v""#).unwrap())
        .field(Field::command(
            "run",
            vec![Field::new("script", TypeSpec::String).tagged("arg").unwrap()],
        ));
    let grammar = build(schema);
    let ctx = grammar.parse(["run", "x.sh", "-v"]).expect("should parse");
    assert_eq!(ctx.value("verbose"), Some(&Value::Bool(true)));
    assert_eq!(ctx.command_line(), "run <script>");
}

#[test]
fn test_flag_aliases_match() {
    let schema = Schema::new("app").field(
        Field::new("colour", TypeSpec::Bool)
            .tagged(r#"aliases:"color""#)
            .unwrap(),
    );
    let grammar = build(schema);
    let ctx = grammar.parse(["--color"]).expect("should parse");
    assert_eq!(ctx.value("colour"), Some(&Value::Bool(true)));
}

#[test]
fn test_scalar_flags_are_last_value_wins() {
    let schema = Schema::new("app").field(Field::new("level", TypeSpec::String));
    let grammar = build(schema);
    let ctx = grammar
        .parse(["--level", "a", "--level", "b"])
        .expect("should parse");
    assert_eq!(ctx.value("level").and_then(|v| v.as_str()), Some("b"));
}

#[test]
fn test_optional_field_stays_unbound() {
    let schema = Schema::new("app")
        .field(Field::new(
            "tag",
            TypeSpec::Optional(Box::new(TypeSpec::String)),
        ))
        .field(Field::new("name", TypeSpec::String));
    let grammar = build(schema);
    let ctx = grammar.parse(Vec::<String>::new()).expect("should parse");
    assert_eq!(ctx.value("tag"), None);
    assert_eq!(ctx.value("name").and_then(|v| v.as_str()), Some(""));

    let ctx = grammar.parse(["--tag", ""]).expect("should parse");
    assert_eq!(ctx.value("tag").and_then(|v| v.as_str()), Some(""));
}

#[test]
fn test_env_resolver_supplies_value() {
    let schema = Schema::new("app").field(
        Field::new("token", TypeSpec::String)
            .tagged(r#"env:"ARG_GRAMMAR_IT_TOKEN""#)
            .unwrap(),
    );
    let grammar = build(schema);
    // SAFETY: test-only env mutation with a test-unique variable name.
    unsafe {
        std::env::set_var("ARG_GRAMMAR_IT_TOKEN", "from-env");
    }
    let ctx = grammar.parse(Vec::<String>::new()).expect("should parse");
    unsafe {
        std::env::remove_var("ARG_GRAMMAR_IT_TOKEN");
    }
    assert_eq!(ctx.value("token").and_then(|v| v.as_str()), Some("from-env"));
}

#[test]
fn test_hyphen_values_option() {
    let schema = Schema::new("app").field(Field::new("expr", TypeSpec::String));
    let strict = GrammarBuilder::new(schema.clone()).build().unwrap();
    assert!(strict.parse(["--expr", "-x"]).is_err());

    let lenient = GrammarBuilder::new(schema)
        .allow_hyphen_values(true)
        .build()
        .unwrap();
    let ctx = lenient.parse(["--expr", "-x"]).expect("should parse");
    assert_eq!(ctx.value("expr").and_then(|v| v.as_str()), Some("-x"));
}

#[test]
fn test_decode_failure_names_the_field() {
    let grammar = build(user_create_schema());
    let err = grammar.parse(["user", "create", "ten", "a", "b"]).unwrap_err();
    assert_eq!(err.to_string(), "<id>: invalid integer \"ten\"");
}

#[test]
fn test_trace_keeps_partial_path_on_error() {
    let grammar = build(user_create_schema());
    let ctx = grammar.trace(["user", "create", "10", "--bogus"]);
    assert!(ctx.error.is_some());
    assert_eq!(ctx.command_line(), "user create <id>");
}

#[test]
fn test_remainders_track_entry_points() {
    let grammar = build(user_create_schema());
    let ctx = grammar
        .parse(["user", "create", "10", "Alec", "Thomas"])
        .expect("should parse");
    // The app element saw the full vector; the `create` element saw what
    // was left after its name was consumed.
    assert_eq!(
        ctx.path[0].remainder,
        vec!["user", "create", "10", "Alec", "Thomas"]
    );
    assert_eq!(ctx.path[2].remainder, vec!["10", "Alec", "Thomas"]);
}
