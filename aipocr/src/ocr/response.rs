use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// How recognized lines are joined into the final text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSeparator {
    /// Concatenate lines with nothing between them.
    #[default]
    Join,
    /// One recognized line per output line.
    #[serde(rename = "row")]
    ByRow,
}

impl ResultSeparator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultSeparator::Join => "",
            ResultSeparator::ByRow => "\n",
        }
    }
}

impl FromStr for ResultSeparator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "join" | "none" | "" => Ok(ResultSeparator::Join),
            "row" | "by_row" | "newline" => Ok(ResultSeparator::ByRow),
            other => Err(format!("unknown result separator '{other}'")),
        }
    }
}

impl fmt::Display for ResultSeparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultSeparator::Join => f.write_str("join"),
            ResultSeparator::ByRow => f.write_str("row"),
        }
    }
}

/// Extract `words_result[*].words` from a response body.
///
/// Never fails: bodies that are not JSON, error payloads and entries without
/// a string `words` all contribute nothing.
pub fn decode_response(body: &[u8], separator: ResultSeparator) -> String {
    let value: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "Response body is not JSON");
            return String::new();
        }
    };

    if let Some(code) = value.get("error_code") {
        let msg = value
            .get("error_msg")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        debug!(error_code = %code, error_msg = %msg, "Provider returned an error payload");
    }

    let Some(Value::Array(lines)) = value.get("words_result") else {
        return String::new();
    };

    lines
        .iter()
        .filter_map(|line| line.get("words").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join(separator.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BODY: &[u8] = br#"{
        "log_id": 1,
        "words_result_num": 2,
        "words_result": [{"words": "Hello"}, {"words": "World"}]
    }"#;

    #[test]
    fn test_decode_join() {
        assert_eq!(decode_response(BODY, ResultSeparator::Join), "HelloWorld");
    }

    #[test]
    fn test_decode_by_row() {
        assert_eq!(decode_response(BODY, ResultSeparator::ByRow), "Hello\nWorld");
    }

    #[test]
    fn test_decode_is_total() {
        let bodies: [&[u8]; 8] = [
            b"{}",
            b"[]",
            b"null",
            b"not json at all",
            br#"{"words_result": "oops"}"#,
            br#"{"words_result": {"words": "x"}}"#,
            br#"{"error_code": 110, "error_msg": "Access token invalid or no longer valid"}"#,
            b"",
        ];
        for body in bodies {
            assert_eq!(decode_response(body, ResultSeparator::ByRow), "");
        }
    }

    #[test]
    fn test_error_payload_logged_and_decoded() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            let body = br#"{"error_code": 17, "error_msg": "Open api daily request limit reached", "words_result": [{"words": "kept"}]}"#;
            assert_eq!(decode_response(body, ResultSeparator::Join), "kept");
            let body = br#"{"error_code": 17, "error_msg": null}"#;
            assert_eq!(decode_response(body, ResultSeparator::Join), "");
        });
    }

    #[test]
    fn test_decode_skips_bad_entries() {
        let body = br#"{"words_result": [{"words": "a"}, {"words": 7}, {}, "b", {"words": "c"}]}"#;
        assert_eq!(decode_response(body, ResultSeparator::ByRow), "a\nc");
    }

    #[test]
    fn test_separator_parse() {
        assert_eq!("row".parse::<ResultSeparator>().unwrap(), ResultSeparator::ByRow);
        assert_eq!("JOIN".parse::<ResultSeparator>().unwrap(), ResultSeparator::Join);
        assert!("comma".parse::<ResultSeparator>().is_err());
    }
}
