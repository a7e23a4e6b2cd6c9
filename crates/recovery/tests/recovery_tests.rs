//! End-to-end recovery cascade tests.

use recovery::{parse_as, parse_json_output, parse_object_list};
use serde::Deserialize;
use serde_json::json;

#[test]
fn idempotent_on_valid_input() {
    let inputs = [
        r#"[]"#,
        r#"{}"#,
        r#"[{"a": 1}, {"b": 2}]"#,
        r#"{"nested": {"list": [1, 2, 3]}, "flag": true}"#,
        r#"[{"title": "Dune", "year": 2021}]"#,
    ];
    for input in inputs {
        let direct: serde_json::Value = serde_json::from_str(input).expect("input is valid");
        assert_eq!(parse_json_output(input), direct, "input: {input}");
    }
}

#[test]
fn never_panics_and_degrades_to_empty_array() {
    let inputs = [
        "",
        "   ",
        "not json at all",
        "{{{{{{",
        "]]]]",
        "\u{0}\u{1}\u{2} binary garbage \u{fffd}",
        "nulltruefalse",
        "'''",
        "`````",
    ];
    for input in inputs {
        let value = parse_json_output(input);
        assert!(
            value.is_array() || value.is_object(),
            "non-structured result for: {input:?}"
        );
    }
    assert_eq!(parse_json_output("not json at all"), json!([]));
    assert_eq!(parse_json_output(""), json!([]));
}

#[test]
fn recovers_single_quoted_arrays() {
    assert_eq!(
        parse_json_output("[{'a': 1}, {'b': 2}]"),
        json!([{"a": 1}, {"b": 2}])
    );
}

#[test]
fn preserves_apostrophes_in_double_quoted_values() {
    assert_eq!(
        parse_json_output(r#"[{"title": "Schindler's List"}]"#),
        json!([{"title": "Schindler's List"}])
    );
}

#[test]
fn repairs_trailing_commas() {
    assert_eq!(parse_json_output(r#"[{"a": 1},]"#), json!([{"a": 1}]));
    assert_eq!(parse_json_output(r#"{"a": 1,}"#), json!({"a": 1}));
}

#[test]
fn repairs_missing_commas_between_objects() {
    assert_eq!(
        parse_json_output(r#"[{"a": 1} {"b": 2}]"#),
        json!([{"a": 1}, {"b": 2}])
    );
}

#[test]
fn balances_unclosed_brackets() {
    assert_eq!(
        parse_json_output(r#"{"a": [1, 2"#),
        json!({"a": [1, 2]})
    );
}

#[test]
fn extracts_from_markdown_fences() {
    assert_eq!(
        parse_json_output("```json\n[{\"a\": 1}]\n```"),
        json!([{"a": 1}])
    );
    assert_eq!(
        parse_json_output("```\n[{\"a\": 1}]\n```"),
        json!([{"a": 1}])
    );
}

#[test]
fn extracts_from_surrounding_prose() {
    let input = "Here are the recommendations you asked for:\n[{\"title\": \"Arrival\"}]\nEnjoy!";
    assert_eq!(parse_json_output(input), json!([{"title": "Arrival"}]));
}

#[test]
fn bare_extracted_object_is_wrapped_in_a_list() {
    let input = "The best match is {\"title\": \"Heat\"} based on your query.";
    assert_eq!(parse_json_output(input), json!([{"title": "Heat"}]));
}

#[test]
fn truncation_repair_keeps_complete_prefix_objects() {
    let input = r#"[{"a": 1}, {"b": 2}, {"c": 3}, {"d":"#;
    assert_eq!(
        parse_json_output(input),
        json!([{"a": 1}, {"b": 2}, {"c": 3}])
    );
}

#[test]
fn truncation_inside_a_string_value_is_discarded() {
    let input = r#"[{"a": 1}, {"b": 2}, {"c": "incompl"#;
    let value = parse_json_output(input);
    let items = value.as_array().expect("array result");
    assert!(items.contains(&json!({"a": 1})));
    assert!(items.contains(&json!({"b": 2})));
}

#[test]
fn salvages_objects_out_of_a_broken_array() {
    let input = r#"[{"a": 1}, {"b" &&& 2}, {"c": 3}]"#;
    let value = parse_json_output(input);
    let items = value.as_array().expect("array result");
    assert!(items.contains(&json!({"a": 1})));
    assert!(items.contains(&json!({"c": 3})));
}

#[test]
fn parse_object_list_gives_uniform_objects() {
    let list = parse_object_list("[{'title': 'Dune'}, {'title': 'Heat'}]");
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].get("title"), Some(&json!("Dune")));
}

#[test]
fn parse_as_deserializes_typed_results() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Recommendation {
        title: String,
        year: u16,
    }

    let parsed: Vec<Recommendation> =
        parse_as("[{'title': 'Blade Runner', 'year': 1982}]").expect("recoverable");
    assert_eq!(
        parsed,
        vec![Recommendation {
            title: "Blade Runner".to_string(),
            year: 1982
        }]
    );

    let missed: Option<Vec<Recommendation>> = parse_as("utter nonsense");
    assert!(missed.is_none());
}

#[test]
fn python_style_payload_recovers() {
    let input = "[{'available': True, 'superhost': False, 'rating': None}]";
    assert_eq!(
        parse_json_output(input),
        json!([{"available": true, "superhost": false, "rating": null}])
    );
}
