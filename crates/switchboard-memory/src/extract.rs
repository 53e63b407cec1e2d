//! Finding JSON payloads inside free text.
//!
//! Assistants often read structured results back to the user verbatim. The
//! scanner walks the text, and at every `{` or `[` tracks nesting (skipping
//! brackets inside string literals) until the opening bracket is balanced.
//! Balanced spans that parse as JSON are kept; the scan resumes after them.
//! When a span does not parse, the spans nested inside it are tried instead,
//! so a stray brace in prose does not hide a real payload. Every character
//! is scanned once.

use serde_json::Value;

/// What one scan from an opening bracket saw.
struct Scan {
    /// One past the bracket closing the opener, if it closed.
    end: Option<usize>,
    /// Where the scan stopped; nothing before it needs scanning again.
    stopped: usize,
    /// Balanced spans closed inside the outer one, as (start, end).
    nested: Vec<(usize, usize)>,
}

fn scan(text: &str, start: usize) -> Scan {
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut nested = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        let at = start + offset;
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => stack.push(('}', at)),
            '[' => stack.push((']', at)),
            '}' | ']' => {
                let end = at + c.len_utf8();
                match stack.pop() {
                    Some((expected, open)) if expected == c => {
                        if stack.is_empty() {
                            return Scan {
                                end: Some(end),
                                stopped: end,
                                nested,
                            };
                        }
                        nested.push((open, end));
                    }
                    // Any opener still on the stack would hit this same bracket.
                    _ => {
                        return Scan {
                            end: None,
                            stopped: end,
                            nested,
                        }
                    }
                }
            }
            _ => {}
        }
    }
    Scan {
        end: None,
        stopped: text.len(),
        nested,
    }
}

fn parse_span(text: &str, start: usize, end: usize) -> Option<Value> {
    serde_json::from_str::<Value>(&text[start..end]).ok()
}

/// Every top-level JSON object or array embedded in `text`, in order.
///
/// Scalars are never returned: `[1]` and `{}` count, bare `42` does not.
pub fn json_fragments(text: &str) -> Vec<Value> {
    fragments(text).0
}

/// The fragments, plus how many scans it took to find them.
fn fragments(text: &str) -> (Vec<Value>, usize) {
    let mut found = Vec::new();
    let mut scans = 0;
    let mut cursor = 0;

    while let Some(relative) = text[cursor..].find(['{', '[']) {
        let start = cursor + relative;
        let outer = scan(text, start);
        scans += 1;

        if let Some(value) = outer.end.and_then(|end| parse_span(text, start, end)) {
            found.push(value);
        } else {
            let mut spans = outer.nested;
            spans.sort_unstable();
            let mut taken_until = start;
            for (open, end) in spans {
                if open < taken_until {
                    continue;
                }
                if let Some(value) = parse_span(text, open, end) {
                    found.push(value);
                    taken_until = end;
                }
            }
        }
        cursor = outer.stopped;
    }
    (found, scans)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{fragments, json_fragments};

    #[test]
    fn finds_object_in_prose() {
        let text = r#"Here is your summary: {"daily_cigarettes": 5, "daily_feeling": "ok"} Have a good night."#;
        assert_eq!(
            json_fragments(text),
            vec![json!({ "daily_cigarettes": 5, "daily_feeling": "ok" })]
        );
    }

    #[test]
    fn nested_and_multiple_payloads() {
        let text = r#"First {"a": {"b": [1, 2]}} then [3, {"c": "}"}] done"#;
        assert_eq!(
            json_fragments(text),
            vec![json!({ "a": { "b": [1, 2] } }), json!([3, { "c": "}" }])]
        );
    }

    #[test]
    fn stray_brackets_do_not_hide_later_payloads() {
        let text = r#"Use {curly} or [square] brackets; the record is {"name": "Ada"}"#;
        assert_eq!(json_fragments(text), vec![json!({ "name": "Ada" })]);
    }

    #[test]
    fn unbalanced_and_plain_text_yield_nothing() {
        assert!(json_fragments("no structure here").is_empty());
        assert!(json_fragments(r#"{"open": true"#).is_empty());
        assert!(json_fragments("close only }").is_empty());
    }

    #[test]
    fn payload_inside_a_broken_span_is_found() {
        let text = r#"{ note: {"name": "Ada"} and [1, 2] }"#;
        assert_eq!(json_fragments(text), vec![json!({ "name": "Ada" }), json!([1, 2])]);
    }

    #[test]
    fn mismatched_bracket_resumes_after_it() {
        let text = r#"{ oops ] then {"a": 1}"#;
        assert_eq!(json_fragments(text), vec![json!({ "a": 1 })]);
    }

    #[test]
    fn unclosed_braces_are_scanned_once() {
        let text = format!("{}{}", "{ ".repeat(5_000), r#"{"name": "Ada"}"#);
        let (found, scans) = fragments(&text);
        assert_eq!(found, vec![json!({ "name": "Ada" })]);
        assert_eq!(scans, 1);
    }

    #[test]
    fn non_ascii_text_around_payload() {
        let text = "Résumé → {\"city\": \"Zürich\"} ✓";
        assert_eq!(json_fragments(text), vec![json!({ "city": "Zürich" })]);
    }
}
