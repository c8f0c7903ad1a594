//! Contract Invariant Tests
//!
//! These tests verify the non-negotiable guarantees.

use pretty_assertions::assert_eq;
use rstest::rstest;

use toolswitch_core::{
    render, CommandLineGenerator, ErrorKind, Property, PropertyKind, RenderError, RenderPipeline,
    RenderRequest, Rule, RuleRegistry, TaskItem, ValueBinding,
};

const MEM_RULE: &str = r#"{
    "name": "mem",
    "displayName": "Memory Reporting Tool",
    "toolName": "mem.exe",
    "switchPrefix": "/",
    "properties": [
        { "name": "Program", "category": "General", "kind": "boolean", "switch": "P" },
        { "name": "Debug", "category": "General", "kind": "boolean", "switch": "D" },
        { "name": "Classify", "category": "General", "kind": "boolean", "switch": "C" },
        { "name": "Subst", "category": "Command Line", "kind": "string",
          "switch": "S[value]_postfix" },
        { "name": "Subst2", "category": "Command Line", "kind": "string" },
        { "name": "Subst3", "category": "Command Line", "kind": "string",
          "switch": "AtEnd[value]" },
        { "name": "SubstInt", "category": "Command Line", "kind": "integer",
          "switch": "I[value]_postfix" },
        { "name": "Strings", "kind": "stringList", "switch": "X" },
        { "name": "Sources", "category": "Command Line", "kind": "itemList", "required": true },
        { "name": "DebugInformationFormat", "category": "General", "kind": "enumeration",
          "values": [
            { "name": "OldStyle", "displayName": "C7 compatible", "switch": "Z7" },
            { "name": "ProgramDatabase", "switch": "Zi" },
            { "name": "EditAndContinue", "switch": "ZI" }
          ] },
        { "name": "EmptyTest", "category": "General", "kind": "enumeration",
          "values": [ { "name": "Empty" } ] }
    ]
}"#;

fn mem_rule() -> Rule {
    serde_json::from_str(MEM_RULE).unwrap()
}

fn mem_bindings() -> ValueBinding {
    ValueBinding::new()
        .with("Program", true)
        .with("Debug", false)
        .with("Subst", "SubstituteThis!")
        .with("Subst2", "SubstituteThis!AsWell")
        .with("Subst3", "Substitute\\")
        .with("SubstInt", 42)
        .with("Strings", vec!["one", "two", "three"])
        .with("Sources", vec![TaskItem::new("a.cs"), TaskItem::new("b.cs")])
        .with("DebugInformationFormat", "OldStyle")
        .with("EmptyTest", "Empty")
}

fn create_pipeline() -> RenderPipeline {
    let mut registry = RuleRegistry::new();
    registry.register(mem_rule());
    RenderPipeline::new(registry)
}

#[test]
fn invariant_basic_command_line() {
    let out = render(&mem_rule(), &mem_bindings(), None).unwrap();
    assert_eq!(
        out,
        concat!(
            "/P /SSubstituteThis!_postfix SubstituteThis!AsWell /AtEndSubstitute\\ ",
            "/I42_postfix /Xone /Xtwo /Xthree a.cs b.cs /Z7",
        )
    );
}

#[test]
fn invariant_render_is_deterministic() {
    let rule = mem_rule();
    let bindings = mem_bindings();
    let first = render(&rule, &bindings, None).unwrap();
    for _ in 0..10 {
        assert_eq!(render(&rule, &bindings, None).unwrap(), first);
    }
}

#[test]
fn invariant_false_boolean_never_appears() {
    let out = render(&mem_rule(), &mem_bindings(), None).unwrap();
    assert_eq!(out.matches("/P").count(), 1);
    assert!(!out.contains("/D"));
    // Classify is unbound.
    assert!(!out.contains("/C"));
}

#[rstest]
#[case("[Sources] [Program]")]
#[case("[sources] [program]")]
#[case("[SOURCES] [Program]")]
fn invariant_template_order_ignores_case(#[case] template: &str) {
    let out = render(&mem_rule(), &mem_bindings(), Some(template)).unwrap();
    assert_eq!(out, "a.cs b.cs /P");
}

#[test]
fn invariant_template_with_single_token() {
    let mut bindings = mem_bindings();
    bindings.insert("sources", vec!["a.cs", "b.cs"]);
    let rule = mem_rule();
    let generator = CommandLineGenerator::new(&rule, &bindings).with_template("[sources]");
    assert_eq!(generator.generate().unwrap(), "a.cs b.cs");
}

#[test]
fn invariant_template_order_overrides_declaration_order() {
    let template = "[DebugInformationFormat] [Strings] [Program]";
    let out = render(&mem_rule(), &mem_bindings(), Some(template)).unwrap();
    assert_eq!(out, "/Z7 /Xone /Xtwo /Xthree /P");
}

#[test]
fn invariant_enum_switch_follows_selected_value() {
    let bindings = mem_bindings().with("DebugInformationFormat", "ProgramDatabase");
    let out = render(&mem_rule(), &bindings, None).unwrap();
    assert!(out.ends_with("a.cs b.cs /Zi"));
    assert_eq!(render(&mem_rule(), &bindings, Some("[EmptyTest]")).unwrap(), "");
}

#[test]
fn invariant_unknown_enum_value_fails() {
    let bindings = mem_bindings().with("DebugInformationFormat", "oldstyle");
    let err = render(&mem_rule(), &bindings, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownProperty);
    assert_eq!(err.property(), Some("DebugInformationFormat"));
}

#[test]
fn invariant_missing_required_value_fails() {
    let mut bindings = ValueBinding::new();
    bindings.insert("Program", true);
    let err = render(&mem_rule(), &bindings, None).unwrap_err();
    assert_eq!(
        err,
        RenderError::MissingRequiredValue {
            property: "Sources".to_string(),
            expected: "item list".to_string(),
        }
    );

    let bindings = mem_bindings().with("Sources", Vec::<TaskItem>::new());
    let err = render(&mem_rule(), &bindings, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingRequiredValue);
}

#[test]
fn invariant_type_mismatch_fails() {
    let bindings = mem_bindings().with("Program", vec!["yes"]);
    let err = render(&mem_rule(), &bindings, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    assert!(err.to_string().contains("Program"));
    assert!(err.to_string().contains("boolean"));
}

#[rstest]
#[case("[Sources] [Program")]
#[case("[] [Program]")]
#[case("[Sources]] [Program]")]
#[case("[Sou[rces] [Program]")]
fn invariant_malformed_template_fails(#[case] template: &str) {
    let err = render(&mem_rule(), &mem_bindings(), Some(template)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedTemplate);
}

#[test]
fn invariant_boolean_switch_with_placeholder_is_rejected() {
    let rule = Rule::new(
        "odd",
        "-",
        vec![Property::new("Flag", PropertyKind::Boolean).with_switch("f[value]").unwrap()],
    )
    .unwrap();

    let on = ValueBinding::new().with("flag", true);
    let err = render(&rule, &on, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);

    let off = ValueBinding::new().with("flag", false);
    assert_eq!(render(&rule, &off, None).unwrap(), "");
}

#[test]
fn invariant_check_bindings_flags_placeholder_switch_on_boolean() {
    let rule = Rule::new(
        "odd",
        "-",
        vec![Property::new("Flag", PropertyKind::Boolean).with_switch("f[value]").unwrap()],
    )
    .unwrap();
    let mut registry = RuleRegistry::new();
    registry.register(rule);
    let pipeline = RenderPipeline::new(registry);

    let on = ValueBinding::new().with("flag", true);
    let result = pipeline.check_bindings("odd", &on, None).unwrap();
    assert!(!result.valid);
    assert_eq!(result.errors().next().unwrap().kind, Some(ErrorKind::TypeMismatch));

    let request = RenderRequest { rule: "odd".to_string(), values: on, template: None };
    let err = pipeline.render_command(&request).unwrap_err();
    assert!(err.to_string().contains("Validation failed"));

    let off = ValueBinding::new().with("flag", false);
    assert!(pipeline.check_bindings("odd", &off, None).unwrap().valid);
}

#[test]
fn invariant_pipeline_validates_before_rendering() {
    let pipeline = create_pipeline();

    let request = RenderRequest {
        rule: "mem".to_string(),
        values: ValueBinding::new()
            .with("Program", true)
            .with("DebugInformationFormat", "NewStyle"),
        template: None,
    };

    let err = pipeline.render_command(&request).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Validation failed"));
    // Both problems are reported, not just the first.
    assert!(message.contains("Sources"));
    assert!(message.contains("DebugInformationFormat"));
}

#[test]
fn invariant_pipeline_renders_invocation_and_fingerprint() {
    let pipeline = create_pipeline();

    let request = RenderRequest {
        rule: "MEM".to_string(),
        values: mem_bindings().with("NotAProperty", 1),
        template: Some("[Sources] [Program]".to_string()),
    };

    let first = pipeline.render_command(&request).unwrap();
    let second = pipeline.render_command(&request).unwrap();

    assert_eq!(first.rule, "mem");
    assert_eq!(first.command_line, "a.cs b.cs /P");
    assert_eq!(first.invocation, "mem.exe a.cs b.cs /P");
    assert_eq!(first.fingerprint, second.fingerprint);
    assert_eq!(first.rule_fingerprint, second.rule_fingerprint);
    assert_eq!(first.engine_version, env!("CARGO_PKG_VERSION"));
    assert_eq!(first.warnings.len(), 1);
    assert_eq!(first.warnings[0].property, "NotAProperty");
}

#[test]
fn invariant_rule_not_found_error() {
    let pipeline = create_pipeline();
    let request = RenderRequest {
        rule: "nonexistent".to_string(),
        values: ValueBinding::new(),
        template: None,
    };

    let result = pipeline.render_command(&request);
    assert!(result.unwrap_err().to_string().contains("Rule not found"));
}

#[test]
fn invariant_request_from_json() {
    let pipeline = create_pipeline();
    let request: RenderRequest = serde_json::from_str(
        r#"{
            "rule": "mem",
            "values": {
                "program": true,
                "sources": [ { "itemSpec": "main.cs" } ],
                "SubstInt": "7"
            },
            "template": "[Program] [SubstInt] [Sources]"
        }"#,
    )
    .unwrap();

    let command = pipeline.render_command(&request).unwrap();
    assert_eq!(command.command_line, "/P /I7_postfix main.cs");
}

#[cfg(feature = "test-hooks")]
#[test]
fn invariant_render_command_calls_check_bindings() {
    use toolswitch_core::pipeline::{get_validation_call_count, reset_validation_call_count};

    let pipeline = create_pipeline();
    let request = RenderRequest {
        rule: "mem".to_string(),
        values: mem_bindings(),
        template: None,
    };

    reset_validation_call_count();
    pipeline.render_command(&request).unwrap();
    // Other tests share the counter, so only a lower bound holds.
    assert!(get_validation_call_count() >= 1);
}
