//! Compilation tests: variable analysis and deferred rewriting over full templates

use gateway_el_compiler::{compile, placeholder_name, Compiler};
use gateway_el_parser::TemplateSyntax;
use insta::assert_snapshot;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;
use std::collections::BTreeSet;

fn holders(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|n| (*n).to_string()).collect()
}

fn compile_deferred(text: &str, names: &[&str]) -> gateway_el_compiler::CompiledExpression {
    Compiler::new()
        .compile_with_holders(text, &holders(names))
        .unwrap_or_else(|e| panic!("Failed to compile '{}': {:?}", text, e))
}

// === Variable analysis ===

#[rstest]
#[case("{#request.headers['X-Gravitee-Endpoint'][0]}", &["request.headers"])]
#[case("{#request.params['param'][1]}", &["request.params"])]
#[case("{#context.attributes.application}", &["context.attributes.application"])]
#[case("{(#timestamp > 2) && (#timestamp < 2)}", &["timestamp"])]
#[case("{T(java.lang.Math).abs(-1)}", &[])]
#[case("{(new java.lang.String(#body.getBytes()))}", &["body"])]
#[case("{#a ?: #b} {#c ? #d.e : 'x'}", &["a", "b", "c", "d.e"])]
fn test_template_variables(#[case] text: &str, #[case] expected: &[&str]) {
    let compiled = compile(text).unwrap();
    let expected: BTreeSet<String> = expected.iter().map(|v| (*v).to_string()).collect();
    assert_eq!(compiled.variables(), &expected);
}

#[test]
fn test_bare_constructor_braces_stay_literal() {
    let compiled = compile("{new java.lang.String(#body)}").unwrap();
    assert!(compiled.is_literal_only());
    assert!(compiled.variables().is_empty());
}

#[test]
fn test_literal_braces_are_not_fragments() {
    let compiled = compile("{ \"status\": \"OK\" }").unwrap();
    assert!(compiled.is_literal_only());
    assert_snapshot!(compiled.executable().to_string(), @r#"{ "status": "OK" }"#);
}

#[test]
fn test_unterminated_fragment_is_parse_error() {
    let err = compile("{#").unwrap_err();
    assert!(err.is_parse());
}

// === Deferred rewriting ===

#[test]
fn test_rewrite_concatenated_holder_calls() {
    let compiled = compile_deferred(
        "{#custom.get('val1', 'val2')} - {#custom.getIndex(0)}",
        &["custom"],
    );
    assert_snapshot!(
        compiled.executable().to_string(),
        @"{#_fc09149701f1a9d5} - {#_a2e1807de66cd51c}"
    );

    let bodies: Vec<String> = compiled.deferred_expressions().map(|d| d.source()).collect();
    assert_eq!(bodies, vec!["#custom.get('val1', 'val2')", "#custom.getIndex(0)"]);
}

#[test]
fn test_rewrite_keeps_trailing_calls() {
    let compiled = compile_deferred(
        "{T(java.util.Base64).getEncoder().encodeToString(#custom.get('val1', 'val2').getBytes())}",
        &["custom"],
    );
    assert_snapshot!(
        compiled.executable().to_string(),
        @"{T(java.util.Base64).getEncoder().encodeToString(#_fc09149701f1a9d5.getBytes())}"
    );
}

#[test]
fn test_rewrite_only_listed_holders() {
    let compiled = compile_deferred("{#profile.name()} {#custom.get('a')}", &["custom"]);
    let expected = format!("{{#profile.name()}} {{#{}}}", placeholder_name("#custom.get('a')"));
    assert_eq!(compiled.executable().to_string(), expected);
    assert!(compiled.requires("profile"));
}

#[test]
fn test_rewrite_with_custom_syntax() {
    let syntax = TemplateSyntax::new("${", "}").unwrap();
    let compiled = Compiler::with_syntax(syntax)
        .compile_with_holders("a=${#custom.get('a')}, b=${#custom.get('a')}", &holders(&["custom"]))
        .unwrap();
    assert_eq!(compiled.deferred_expressions().count(), 1);
    assert_eq!(compiled.source(), "a=${#custom.get('a')}, b=${#custom.get('a')}");
}

#[test]
fn test_sole_holder_call_evaluates_directly() {
    let compiled = compile_deferred("{#custom.get('val1', 'val2')}", &["custom"]);
    assert!(compiled.rewrite().is_none());
    assert_eq!(compiled.executable(), compiled.template());
}

// === Properties ===

fn identifier() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,6}".prop_map(|s| format!("v{s}"))
}

proptest! {
    #[test]
    fn prop_variables_independent_of_fragment_order(
        names in prop::collection::vec(identifier(), 1..6)
    ) {
        let forward: Vec<String> = names.iter().map(|n| format!("{{#{n}}}")).collect();
        let backward: Vec<String> = forward.iter().rev().cloned().collect();

        let a = compile(&forward.join(" - ")).unwrap();
        let b = compile(&backward.join(" - ")).unwrap();
        let expected: BTreeSet<String> = names.iter().cloned().collect();

        prop_assert_eq!(a.variables(), b.variables());
        prop_assert_eq!(a.variables(), &expected);
    }

    #[test]
    fn prop_rewritten_template_never_reads_holder(
        keys in prop::collection::vec("[a-z]{1,8}", 2..5)
    ) {
        let text: Vec<String> = keys
            .iter()
            .map(|k| format!("{{#custom.get('{k}').length()}}"))
            .collect();
        let compiled = compile_deferred(&text.join(","), &["custom"]);

        let rewritten = compile(&compiled.executable().to_string()).unwrap();
        prop_assert!(!rewritten.requires("custom"));

        let distinct: BTreeSet<&String> = keys.iter().collect();
        prop_assert_eq!(compiled.deferred_expressions().count(), distinct.len());
    }
}
