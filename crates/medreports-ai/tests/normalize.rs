use medreports_ai::normalize::{Tier, normalize, normalize_with_tier};
use medreports_core::models::finding::Finding;

fn finding(name: &str, value: &str, status: &str, explanation: &str) -> Finding {
    Finding {
        name: name.to_string(),
        value: value.to_string(),
        status: status.to_string(),
        explanation: explanation.to_string(),
    }
}

#[test]
fn json_array_with_trailing_summary() {
    let raw = "[{\"name\":\"Glucose (blood sugar)\",\"value\":\"95 mg/dL\",\"status\":\"NORMAL\",\"explanation\":\"Healthy level.\"}]\nYou are in good health.";

    let (result, tier) = normalize_with_tier(raw);

    assert_eq!(tier, Tier::StructuredArray);
    assert_eq!(
        result.findings,
        vec![finding(
            "Glucose (blood sugar)",
            "95 mg/dL",
            "NORMAL",
            "Healthy level."
        )]
    );
    assert_eq!(result.summary, "You are in good health.");
}

#[test]
fn leading_newlines_and_whitespace_after_array_are_removed() {
    let raw = "Here you go:\n[]\r\n\n\n   Overall fine.  \n";
    let result = normalize(raw);
    assert_eq!(result.summary, "Overall fine.");
}

#[test]
fn empty_array_is_final_even_with_labelled_blocks_present() {
    let raw = "[]\n**TEST_NAME:** Hemoglobin\n---";
    let (result, tier) = normalize_with_tier(raw);
    assert_eq!(tier, Tier::StructuredArray);
    assert!(result.findings.is_empty());
    assert_eq!(result.summary, "**TEST_NAME:** Hemoglobin\n---");
}

#[test]
fn structured_status_is_not_coerced() {
    let raw = r#"[{"name":"LDL","value":"160 mg/dL","status":"borderline","explanation":"A bit high."}]"#;
    let result = normalize(raw);
    assert_eq!(result.findings[0].status, "borderline");
    assert_eq!(result.summary, "");
}

#[test]
fn labelled_block_is_parsed() {
    let raw = "**TEST_NAME:** Hemoglobin A1c (long-term blood sugar)\n**VALUE:** 6.1%\n**STATUS:** concerning\n**EXPLANATION:** Slightly elevated.\n---";

    let (result, tier) = normalize_with_tier(raw);

    assert_eq!(tier, Tier::LabelledBlocks);
    assert_eq!(
        result.findings,
        vec![finding(
            "Hemoglobin A1c (long-term blood sugar)",
            "6.1%",
            "CONCERNING",
            "Slightly elevated."
        )]
    );
    assert_eq!(result.summary, "");
}

#[test]
fn blocks_keep_order_and_default_status() {
    let raw = "\
**TEST_NAME:** Sodium\n**VALUE:** 140 mmol/L\n**STATUS:** normal\n---\n\
**TEST_NAME:** Potassium\n**VALUE:** 5.9 mmol/L\n---\n\
**TEST_NAME:** Creatinine\n**EXPLANATION:** Kidney marker.\n";

    let result = normalize(raw);

    let names: Vec<&str> = result.findings.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["Sodium", "Potassium", "Creatinine"]);
    assert_eq!(result.findings[0].status, "NORMAL");
    assert_eq!(result.findings[1].status, "UNKNOWN");
    assert_eq!(result.findings[2].status, "UNKNOWN");
    assert_eq!(result.findings[2].value, "");
    assert_eq!(result.findings[2].explanation, "Kidney marker.");
}

#[test]
fn short_or_missing_names_are_dropped() {
    let raw = "\
**TEST_NAME:** RBC\n**VALUE:** 4.8\n---\n\
**VALUE:** 12\n---\n\
**TEST_NAME:** Iron\n**VALUE:** 80 ug/dL\n---";

    let result = normalize(raw);

    assert_eq!(result.findings.len(), 1);
    assert_eq!(result.findings[0].name, "Iron");
}

#[test]
fn plain_text_strips_markup() {
    let raw = "Your report looks generally fine with ## no major concerns ** noted.";

    let (result, tier) = normalize_with_tier(raw);

    assert_eq!(tier, Tier::PlainText);
    assert!(result.findings.is_empty());
    assert_eq!(
        result.summary,
        "Your report looks generally fine with  no major concerns  noted."
    );
}

#[test]
fn unclosed_bracket_skips_structured_tier() {
    let raw = "[not valid json\n**TEST_NAME:** Vitamin D\n**STATUS:** abnormal\n---";
    let (result, tier) = normalize_with_tier(raw);
    assert_eq!(tier, Tier::LabelledBlocks);
    assert_eq!(result.findings[0].name, "Vitamin D");
    assert_eq!(result.findings[0].status, "ABNORMAL");

    let (result, tier) = normalize_with_tier("[not valid json");
    assert_eq!(tier, Tier::PlainText);
    assert_eq!(result.summary, "[not valid json");
}

#[test]
fn invalid_bracketed_text_falls_through() {
    let raw = "Results [see below] are **mostly** fine.";
    let (result, tier) = normalize_with_tier(raw);
    assert_eq!(tier, Tier::PlainText);
    assert_eq!(result.summary, "Results [see below] are mostly fine.");
}

#[test]
fn stray_bracket_in_prose_over_captures() {
    let raw = "[{\"name\":\"Glucose\",\"value\":\"95\",\"status\":\"NORMAL\",\"explanation\":\"ok\"}]\nSee note [1].";
    let (result, tier) = normalize_with_tier(raw);
    assert_eq!(tier, Tier::PlainText);
    assert!(result.findings.is_empty());
    assert_eq!(result.summary, raw);
}

#[test]
fn wrongly_typed_records_fall_through() {
    let raw = r#"[{"name":"Glucose","value":95,"status":"NORMAL","explanation":"ok"}]"#;
    let (_, tier) = normalize_with_tier(raw);
    assert_eq!(tier, Tier::PlainText);
}

#[test]
fn normalization_is_deterministic() {
    let inputs = [
        "[{\"name\":\"Glucose\",\"value\":\"95\",\"status\":\"NORMAL\",\"explanation\":\"ok\"}] fine",
        "**TEST_NAME:** Sodium\n---\n**TEST_NAME:** Chloride\n---",
        "## Summary\n**All good**",
        "",
    ];
    for raw in inputs {
        assert_eq!(normalize(raw), normalize(raw));
    }
}

#[test]
fn empty_input_yields_empty_summary() {
    let result = normalize("");
    assert!(result.findings.is_empty());
    assert_eq!(result.summary, "");
}
