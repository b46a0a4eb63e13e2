//! Normalization of alternative-label values.
//!
//! Stored alternatives show up either as a native list or as a single string
//! such as `"{Female, LGBTQ}"` or `"['Hindu', 'Muslim']"`. The grammar accepted
//! for strings:
//!
//! 1. surrounding whitespace is trimmed;
//! 2. any leading/trailing run of `{`, `}`, `[`, `]` is stripped;
//! 3. the remainder is split on `,`;
//! 4. each element is trimmed of whitespace, then of `'` and `"` quotes.
//!
//! Empty elements are dropped and duplicates keep their first position.

use crate::models::question::RawAlternatives;

const DELIMITERS: &[char] = &['{', '}', '[', ']'];
const QUOTES: &[char] = &['\'', '"'];

pub fn parse_alternatives(raw: &str) -> Vec<String> {
    let body = raw.trim().trim_matches(DELIMITERS);
    collect_labels(body.split(','))
}

pub fn normalize_alternatives(raw: &RawAlternatives) -> Vec<String> {
    match raw {
        RawAlternatives::Text(text) => parse_alternatives(text),
        RawAlternatives::List(items) => collect_labels(items.iter().map(String::as_str)),
    }
}

fn collect_labels<'a>(items: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for item in items {
        let label = clean_label(item);
        if label.is_empty() || labels.iter().any(|existing| existing == label) {
            continue;
        }
        labels.push(label.to_string());
    }
    labels
}

fn clean_label(item: &str) -> &str {
    item.trim().trim_matches(QUOTES).trim()
}
