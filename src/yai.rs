//! A minimal parser for the os-release file format.
//!
//! Each line is either blank, a `#` comment, or `NAME=value`. The value may
//! be single-quoted (taken literally), double-quoted, or bare; in the last
//! two cases a backslash escapes the following character.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum YaiError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("Backslash at the end of the {0:?} os-release line")]
    BackslashAtEnd(String),

    #[error("Unexpected os-release line {0:?}")]
    BadLine(String),

    #[error("The value in the {0:?} os-release line contains the quote character")]
    QuoteInQuoted(String),

    #[error("Mismatched open/close quotes in the {0:?} os-release line")]
    MismatchedQuotes(String),
}

static RE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?x)
        ^ (?:
            (?P<comment> \s* (?: \# .* )? )
            |
            (?:
                (?P<varname> [A-Za-z0-9_]+ )
                =
                (?P<full>
                    (?P<q_open> ["'] )?
                    (?P<quoted> .*? )
                    (?P<q_close> ["'] )?
                )
            )
        ) $
        "#,
    )
    .expect("the os-release line pattern is valid")
});

fn unescape(value: &str, line: &str) -> Result<String, YaiError> {
    let mut res = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(chr) = chars.next() {
        if chr == '\\' {
            match chars.next() {
                Some(escaped) => res.push(escaped),
                None => return Err(YaiError::BackslashAtEnd(line.to_string())),
            }
        } else {
            res.push(chr);
        }
    }
    Ok(res)
}

/// Parse a single line; comments and blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<(String, String)>, YaiError> {
    let caps = RE_LINE
        .captures(line)
        .ok_or_else(|| YaiError::BadLine(line.to_string()))?;
    if caps.name("comment").is_some() {
        return Ok(None);
    }

    let varname = caps["varname"].to_string();
    let quoted = &caps["quoted"];
    let q_open = caps.name("q_open").map(|m| m.as_str());
    let q_close = caps.name("q_close").map(|m| m.as_str());

    match q_open {
        Some("'") => {
            if quoted.contains('\'') {
                return Err(YaiError::QuoteInQuoted(line.to_string()));
            }
            if q_close != q_open {
                return Err(YaiError::MismatchedQuotes(line.to_string()));
            }
            Ok(Some((varname, quoted.to_string())))
        }
        Some(_) => {
            if q_close != q_open {
                return Err(YaiError::MismatchedQuotes(line.to_string()));
            }
            Ok(Some((varname, unescape(quoted, line)?)))
        }
        None => Ok(Some((varname, unescape(&caps["full"], line)?))),
    }
}

/// Parse an os-release file into a name-to-value map.
pub fn parse(path: &Path) -> Result<HashMap<String, String>, YaiError> {
    fs::read_to_string(path)?
        .lines()
        .filter_map(|line| parse_line(line).transpose())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const OS_RELEASE: &str = r#"PRETTY_NAME="Debian GNU/Linux 11 (bullseye)"
NAME="Debian GNU/Linux"
VERSION_ID="11"
VERSION="11 (bullseye)"
VERSION_CODENAME=bullseye
ID=debian
HOME_URL="https://www.debian.org/"
SUPPORT_URL="https://www.debian.org/support"
BUG_REPORT_URL="https://bugs.debian.org/"
"#;

    #[test]
    fn test_comments_and_blank_lines_are_skipped() {
        for line in ["", "   \t  ", "  \t  # something", "#"] {
            assert!(parse_line(line).unwrap().is_none(), "{line:?}");
        }
    }

    #[test]
    fn test_well_formed_lines() {
        let cases = [
            ("ID=centos", "ID", "centos"),
            ("ID='centos'", "ID", "centos"),
            (
                r#"NAME='something long "and weird'"#,
                "NAME",
                r#"something long "and weird"#,
            ),
            (
                r#"NAME="something long 'and \\weird\"\`""#,
                "NAME",
                r#"something long 'and \weird"`"#,
            ),
            (
                r#"NAME=unquoted\"and\\-escaped\'"#,
                "NAME",
                r#"unquoted"and\-escaped'"#,
            ),
        ];
        for (line, name, value) in cases {
            let (p_name, p_value) = parse_line(line).unwrap().unwrap();
            assert_eq!(p_name, name, "{line:?}");
            assert_eq!(p_value, value, "{line:?}");
        }
    }

    #[test]
    fn test_malformed_lines() {
        assert!(matches!(
            parse_line("NAME='"),
            Err(YaiError::MismatchedQuotes(_))
        ));
        assert!(matches!(
            parse_line(r#"NAME="foo'"#),
            Err(YaiError::MismatchedQuotes(_))
        ));
        assert!(matches!(
            parse_line("FOO BAR=baz"),
            Err(YaiError::BadLine(_))
        ));
        assert!(matches!(
            parse_line(r"FOO=bar\"),
            Err(YaiError::BackslashAtEnd(_))
        ));
        assert!(matches!(
            parse_line(r#"FOO="meow\""#),
            Err(YaiError::BackslashAtEnd(_))
        ));
        assert!(matches!(
            parse_line("FOO='it's'"),
            Err(YaiError::QuoteInQuoted(_))
        ));
    }

    #[test]
    fn test_parse_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("os-release");
        fs::write(&path, OS_RELEASE).unwrap();

        let data = parse(&path).unwrap();
        assert_eq!(data.len(), 9);
        assert_eq!(data.get("ID").map(String::as_str), Some("debian"));
        assert_eq!(data.get("VERSION_ID").map(String::as_str), Some("11"));
        assert_eq!(data.get("VERSION").map(String::as_str), Some("11 (bullseye)"));
        assert!(!data.contains_key("FOO"));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let temp = TempDir::new().unwrap();
        let err = parse(&temp.path().join("nonexistent")).unwrap_err();
        match err {
            YaiError::Io(err) => assert_eq!(err.kind(), io::ErrorKind::NotFound),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
