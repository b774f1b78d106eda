//! Strict typed parsing of judge output.
//!
//! Every judge call is followed immediately by a parse into a typed verdict;
//! downstream logic dispatches only on the variant, never on raw text. The
//! only leniency is stripping a markdown code fence around the JSON body —
//! models wrap output that way often enough that rejecting it would turn the
//! fail-open default into the common path.

use serde::de::DeserializeOwned;

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict<T> {
    Valid(T),
    Malformed { raw: String },
}

pub fn parse_verdict<T: DeserializeOwned>(raw: &str) -> Verdict<T> {
    let body = strip_fence(raw.trim());
    match serde_json::from_str(body) {
        Ok(value) => Verdict::Valid(value),
        Err(_) => Verdict::Malformed {
            raw: raw.to_string(),
        },
    }
}

fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") on the opening fence line.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    match rest.rfind("```") {
        Some(idx) => rest[..idx].trim(),
        None => rest.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        score: f64,
    }

    #[test]
    fn parses_plain_json() {
        let verdict: Verdict<Sample> = parse_verdict(r#"{"score": 8.5}"#);
        assert_eq!(verdict, Verdict::Valid(Sample { score: 8.5 }));
    }

    #[test]
    fn parses_fenced_json() {
        let raw = "```json\n{\"score\": 7.0}\n```";
        let verdict: Verdict<Sample> = parse_verdict(raw);
        assert_eq!(verdict, Verdict::Valid(Sample { score: 7.0 }));
    }

    #[test]
    fn prose_is_malformed() {
        let verdict: Verdict<Sample> = parse_verdict("The score is 8 out of 10.");
        assert!(matches!(verdict, Verdict::Malformed { .. }));
    }

    #[test]
    fn wrong_shape_is_malformed() {
        let verdict: Verdict<Sample> = parse_verdict(r#"{"grade": "A"}"#);
        assert!(matches!(verdict, Verdict::Malformed { .. }));
    }
}
