use crate::capabilities::FootprintQuery;
use crate::model::Component;

/// Datasheet text sent to the model is cut to this many characters.
pub const DATASHEET_SNIPPET_CHARS: usize = 3000;

pub fn build_footprint_prompt(query: &FootprintQuery) -> String {
    format!(
        r#"You are a KiCad librarian choosing a footprint for an electronic component.

Component value: {}
Component description: {}
Package: {}

Answer with the single best matching footprint from the standard KiCad libraries,
written as Library:FootprintName (for example Resistor_SMD:R_0805_2012Metric).
If you are not confident, answer NONE.

Important: Return ONLY the footprint or NONE, nothing else."#,
        or_na(&query.value),
        or_na(&query.description),
        or_na(&query.package)
    )
}

pub fn build_pin_count_prompt(datasheet_text: &str, component: &Component) -> String {
    format!(
        r#"You are checking a component datasheet against a BOM entry.

BOM entry: {}
Package: {}
Assigned footprint: {}

Datasheet excerpt:
---
{}
---

Does the pin count of the package described in the datasheet match the pin count
of the assigned footprint?

Respond ONLY with valid JSON in this exact format (no markdown, no code blocks):
{{"match": true, "notes": "one short sentence"}}

Use "match": null if the excerpt does not say."#,
        value_desc(component),
        or_na(component.package().unwrap_or_default()),
        or_na(component.footprint().unwrap_or_default()),
        snippet(datasheet_text)
    )
}

pub fn build_package_prompt(datasheet_text: &str, component: &Component) -> String {
    format!(
        r#"You are checking a component datasheet against a BOM entry.

BOM entry: {}
Package on the BOM: {}

Datasheet excerpt:
---
{}
---

Is the BOM package one of the packages offered in the datasheet?

Respond ONLY with valid JSON in this exact format (no markdown, no code blocks):
{{"match": true, "notes": "one short sentence"}}

Use "match": null if the excerpt does not say."#,
        value_desc(component),
        or_na(component.package().unwrap_or_default()),
        snippet(datasheet_text)
    )
}

fn value_desc(component: &Component) -> String {
    format!("{} / {}", component.value.trim(), component.description.trim())
        .chars()
        .take(100)
        .collect()
}

fn snippet(text: &str) -> String {
    text.chars().take(DATASHEET_SNIPPET_CHARS).collect()
}

fn or_na(value: &str) -> &str {
    if value.trim().is_empty() {
        "N/A"
    } else {
        value
    }
}
