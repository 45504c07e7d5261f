//! Permissive parsing for the optional `my.env` environment file.
//!
//! Newline-delimited `KEY=VALUE` pairs; the first `=` delimits, so values
//! may themselves contain `=`. Lines without a `=` are skipped rather than
//! rejected.

use std::collections::BTreeMap;

pub fn parse_env(contents: &str) -> BTreeMap<String, String> {
    let mut variables = BTreeMap::new();
    for line in contents.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        variables.insert(key.to_string(), value.to_string());
    }
    variables
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_first_equals_only() {
        let variables = parse_env("ENDPOINT=https://api.example.com?a=b\n");
        assert_eq!(
            variables.get("ENDPOINT").map(String::as_str),
            Some("https://api.example.com?a=b")
        );
    }

    #[test]
    fn lines_without_equals_are_skipped() {
        let variables = parse_env("API_KEY=secret\nthis line is noise\n\nREGION=eu-west-1\n");
        assert_eq!(variables.len(), 2);
        assert_eq!(variables.get("API_KEY").map(String::as_str), Some("secret"));
        assert_eq!(variables.get("REGION").map(String::as_str), Some("eu-west-1"));
    }

    #[test]
    fn surrounding_whitespace_is_trimmed_from_the_line() {
        let variables = parse_env("  MODE=debug  \n");
        assert_eq!(variables.get("MODE").map(String::as_str), Some("debug"));
    }

    #[test]
    fn later_assignments_win() {
        let variables = parse_env("LEVEL=1\nLEVEL=2\n");
        assert_eq!(variables.get("LEVEL").map(String::as_str), Some("2"));
    }

    #[test]
    fn empty_input_yields_no_variables() {
        assert!(parse_env("").is_empty());
    }
}
