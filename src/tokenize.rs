//! Token grammars and the splitting rules applied to each line.

use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::HighlightError;
use crate::token::SubToken;

/// Runs of non-whitespace.
pub static WHITESPACE_DELIM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\S+").expect("valid whitespace grammar"));

/// One comma-separated field including its leading comma; quoted fields may
/// contain commas and doubled quotes.
pub static CSV_DELIM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:^|,)(?:"(?:[^"]|"")*"|[^,]*)"#).expect("valid csv grammar")
});

static QUOTED_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""[^"]*"|'[^']*'"#).expect("valid quote pattern"));

/// Pattern used to split a line into tokens.
#[derive(Debug, Clone, Default)]
pub enum Grammar {
    #[default]
    Whitespace,
    Csv,
    Custom(Regex),
}

impl Grammar {
    pub fn regex(&self) -> &Regex {
        match self {
            Grammar::Whitespace => &WHITESPACE_DELIM,
            Grammar::Csv => &CSV_DELIM,
            Grammar::Custom(re) => re,
        }
    }

    /// Strip character conventionally paired with this grammar.
    pub fn default_strip_char(&self) -> Option<char> {
        match self {
            Grammar::Csv => Some(','),
            _ => None,
        }
    }
}

impl FromStr for Grammar {
    type Err = HighlightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "whitespace" => Ok(Grammar::Whitespace),
            "csv" => Ok(Grammar::Csv),
            other => Err(HighlightError::Configuration(format!(
                "unknown grammar '{}'. Use 'whitespace' or 'csv'",
                other
            ))),
        }
    }
}

/// A token found in a line, in byte offsets relative to that line.
struct Piece<'a> {
    start: usize,
    text: &'a str,
}

fn strip_piece<'a>(text: &'a str, start: usize, strip_char: Option<char>) -> Piece<'a> {
    let Some(c) = strip_char else {
        return Piece { start, text };
    };
    let (text, start) = match text.strip_prefix(c) {
        Some(rest) => (rest, start + c.len_utf8()),
        None => (text, start),
    };
    let leading = text.len() - text.trim_start().len();
    let trimmed = text.trim();
    Piece {
        start: start + leading,
        text: trimmed,
    }
}

/// Split one sub-span with `grammar`, yielding sub-spans on the same line.
pub(crate) fn split_sub_token(
    child: &SubToken,
    grammar: &Grammar,
    strip_char: Option<char>,
) -> Vec<SubToken> {
    let text = child.text();
    let quoted = QUOTED_RUN.find(text).map(|m| (m.start(), m.end()));

    let mut pieces = Vec::new();
    let mut suppressed = false;
    let mut insert_at = None;
    for m in grammar.regex().find_iter(text) {
        let (mut start, mut end) = (m.start(), m.end());
        if let Some((qs, qe)) = quoted {
            let starts_inside = start >= qs && start < qe;
            let ends_inside = end > qs && end <= qe;
            if starts_inside && end <= qe {
                suppressed = true;
                continue;
            }
            // a match crossing one edge of the run keeps only its outer part
            if starts_inside {
                suppressed = true;
                start = qe;
            } else if start < qs && ends_inside {
                suppressed = true;
                end = qs;
            }
            if insert_at.is_none() && start >= qe {
                insert_at = Some(pieces.len());
            }
        }
        pieces.push(strip_piece(&text[start..end], start, strip_char));
    }

    if let (true, Some((qs, qe))) = (suppressed, quoted) {
        // drop the quote characters themselves
        let inner = &text[qs + 1..qe - 1];
        let leading = inner.len() - inner.trim_start().len();
        let trimmed = inner.trim();
        let piece = Piece {
            start: qs + 1 + leading,
            text: trimmed,
        };
        let at = insert_at.unwrap_or(pieces.len());
        pieces.insert(at, piece);
    }

    let base = child.span().0;
    pieces
        .into_iter()
        .map(|p| {
            let start = base + text[..p.start].chars().count();
            let end = start + p.text.chars().count();
            SubToken::new((start, end), p.text, child.line_start())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{create_test_line, SpanGroup};

    fn texts(line: &str, grammar: Grammar, strip: Option<char>) -> Vec<String> {
        create_test_line(line)
            .tokens(&grammar, strip)
            .iter()
            .map(|t| t.text())
            .collect()
    }

    #[test]
    fn test_whitespace_grammar() {
        assert_eq!(
            texts("951212 050000.000  MONDEO_44", Grammar::Whitespace, None),
            vec!["951212", "050000.000", "MONDEO_44"]
        );
    }

    #[test]
    fn test_csv_grammar_strips_leading_comma() {
        assert_eq!(
            texts("a,b c ,,\"d,e\"", Grammar::Csv, Some(',')),
            vec!["a", "b c", "", "\"d,e\""]
        );
    }

    #[test]
    fn test_csv_token_spans_follow_stripping() {
        let line = create_test_line("12, 34");
        let tokens = line.csv_tokens();
        assert_eq!(tokens[1].text(), "34");
        assert_eq!(tokens[1].start(), Some(4));
        assert_eq!(tokens[1].end(), Some(6));
    }

    #[test]
    fn test_quoted_sensor_name_kept_whole() {
        let line = ";SENSOR2:\t700103\t034125.000\tFrigate\t@A\tNULL\t55 170 78 \t4777\t\"Frigate Optic5\" some message";
        let tokens = texts(line, Grammar::Whitespace, None);
        assert!(tokens.contains(&"Frigate Optic5".to_string()));
        let idx = tokens.iter().position(|t| t == "Frigate Optic5").unwrap();
        assert_eq!(tokens[idx - 1], "4777");
        assert_eq!(tokens[idx + 1], "some");
    }

    #[test]
    fn test_quoted_content_is_trimmed() {
        for line in [
            "X \" Frigate Optic5\" Y",
            "X \"Frigate Optic5 \" Y",
            "X ' Frigate Optic5 ' Y",
        ] {
            let tokens = texts(line, Grammar::Whitespace, None);
            assert_eq!(tokens, vec!["X", "Frigate Optic5", "Y"], "line: {}", line);
        }
    }

    #[test]
    fn test_quoted_token_span_points_at_content() {
        let line = create_test_line("A \"B C\"");
        let tokens = line.whitespace_tokens();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].start(), Some(3));
        assert_eq!(tokens[1].end(), Some(6));
    }

    #[test]
    fn test_match_crossing_quote_end_is_trimmed() {
        let line = create_test_line("A \"B C\"D E");
        let spans: Vec<(String, Option<usize>, Option<usize>)> = line
            .whitespace_tokens()
            .iter()
            .map(|t| (t.text(), t.start(), t.end()))
            .collect();
        assert_eq!(
            spans,
            vec![
                ("A".to_string(), Some(0), Some(1)),
                ("B C".to_string(), Some(3), Some(6)),
                ("D".to_string(), Some(7), Some(8)),
                ("E".to_string(), Some(9), Some(10)),
            ]
        );
    }

    #[test]
    fn test_match_crossing_quote_start_is_trimmed() {
        let line = create_test_line("X\"A B\" C");
        let tokens = line.whitespace_tokens();
        let texts: Vec<String> = tokens.iter().map(|t| t.text()).collect();
        assert_eq!(texts, vec!["X", "A B", "C"]);
        let starts: Vec<usize> = tokens.iter().filter_map(|t| t.start()).collect();
        assert!(starts.windows(2).all(|w| w[0] < w[1]));
        assert!(tokens
            .windows(2)
            .all(|w| w[0].end().unwrap_or(0) <= w[1].start().unwrap_or(0)));
    }

    #[test]
    fn test_grammar_from_str() {
        assert!(matches!("csv".parse::<Grammar>(), Ok(Grammar::Csv)));
        assert!("tabs".parse::<Grammar>().is_err());
    }

    #[test]
    fn test_custom_grammar() {
        let grammar = Grammar::Custom(Regex::new(r"[^;]+").unwrap());
        assert_eq!(texts("a;b;c", grammar, None), vec!["a", "b", "c"]);
    }
}
