//! HTML rendering of a highlighted character array.
//!
//! Walks the characters once. Every maximal run of characters whose usage
//! keys (in recording order) are identical is wrapped in one
//! `<span>` whose tooltip lists each usage and whose background is the mean
//! colour of those usages. Newlines become `<br>`.
//!
//! The renderer writes into any [`fmt::Write`], so callers decide where the
//! document goes (a `String`, a buffered file, a remote share).

use std::fmt::{self, Write};

use crate::color::{html_color, mean_color, ColorCache};
use crate::models::Char;

const HTML_HEADER: &str = "<html>\n<head>\n</head>\n<body style=\"font-family: Courier\">\n";
const HTML_FOOTER: &str = "</body>\n</html>\n";

/// Separator between usage entries inside a tooltip (a carriage return).
const TITLE_SEPARATOR: &str = "&#013;";

/// Terminates each usage key in a run's identity; never part of a key.
const KEY_TERMINATOR: char = '\u{1f}';

/// Render `chars` as a complete HTML document.
///
/// Colours come from (and are added to) `colors`, so rendering twice with
/// the same cache yields the same shading. With `include_key`, a legend of
/// every cached colour is appended after the text.
pub fn render_html<W: Write>(
    out: &mut W,
    chars: &[Char],
    colors: &mut ColorCache,
    include_key: bool,
) -> fmt::Result {
    out.write_str(HTML_HEADER)?;

    let mut last_hash = String::new();

    for ch in chars {
        let mut this_hash = String::new();
        let mut this_message = String::new();
        let mut run_colors = Vec::with_capacity(ch.usages.len());
        let multi_usages = ch.usages.len() > 1;

        for usage in &ch.usages {
            this_hash.push_str(&usage.tool_field);
            this_hash.push(KEY_TERMINATOR);
            if !this_message.is_empty() {
                this_message.push_str(TITLE_SEPARATOR);
            }
            if multi_usages {
                this_message.push('-');
            }
            this_message.push_str(&escape_html(&usage.tool_field));
            this_message.push_str(", ");
            this_message.push_str(&escape_html(&usage.message));
            run_colors.push(colors.color_for(&usage.tool_field));
        }

        if !this_hash.is_empty() {
            if last_hash != this_hash {
                if !last_hash.is_empty() {
                    out.write_str("</span>")?;
                }
                let shade = html_color(mean_color(&run_colors));
                write!(
                    out,
                    "<span title=\"{}\" style=\"background-color:{}\">",
                    this_message, shade
                )?;
            }
        } else if !last_hash.is_empty() {
            out.write_str("</span>")?;
        }

        match ch.letter {
            '\n' => out.write_str("<br>")?,
            '<' => out.write_str("&lt;")?,
            '>' => out.write_str("&gt;")?,
            '&' => out.write_str("&amp;")?,
            c => out.write_char(c)?,
        }

        last_hash = this_hash;
    }

    if !last_hash.is_empty() {
        out.write_str("</span>")?;
    }

    if include_key {
        render_key(out, colors)?;
    }

    out.write_str(HTML_FOOTER)
}

/// Convenience wrapper returning the document as a `String`.
pub fn render_html_string(chars: &[Char], colors: &mut ColorCache, include_key: bool) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = render_html(&mut out, chars, colors, include_key);
    out
}

fn render_key<W: Write>(out: &mut W, colors: &ColorCache) -> fmt::Result {
    out.write_str("<hr/><h3>Color Key</h3><ul>")?;
    for (key, color) in colors.entries() {
        write!(
            out,
            "<li><span style=\"background-color:{}\">{}</span></li>",
            html_color(color),
            escape_html(key)
        )?;
    }
    out.write_str("</ul>\n")
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{chars_from_text, Usage};

    fn stamp(chars: &mut [Char], range: std::ops::Range<usize>, key: &str, msg: &str) {
        for c in &mut chars[range] {
            c.usages.push(Usage::new(key, msg));
        }
    }

    #[test]
    fn test_document_shell_and_monospace() {
        let chars = chars_from_text("abc");
        let html = render_html_string(&chars, &mut ColorCache::with_palette(), false);
        assert!(html.starts_with("<html>"));
        assert!(html.contains("<body style=\"font-family: Courier\">"));
        assert!(html.contains("abc"));
        assert!(!html.contains("<span"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_newline_becomes_br() {
        let chars = chars_from_text("a\nb");
        let html = render_html_string(&chars, &mut ColorCache::with_palette(), false);
        assert!(html.contains("a<br>b"));
    }

    #[test]
    fn test_single_run_single_span() {
        let mut chars = chars_from_text("xx 12.5 yy");
        stamp(&mut chars, 3..7, "NMEA/speed", "Value:12.5 Units:knot");
        let html = render_html_string(&chars, &mut ColorCache::with_palette(), false);
        assert_eq!(html.matches("<span").count(), 1);
        assert!(html.contains(
            "<span title=\"NMEA/speed, Value:12.5 Units:knot\" style=\"background-color:rgba(128,128,128,0.3)\">12.5</span>"
        ));
    }

    #[test]
    fn test_overlap_uses_mean_color_and_dashed_title() {
        let mut chars = chars_from_text("abcd");
        stamp(&mut chars, 0..4, "t/a", "Value:1");
        stamp(&mut chars, 2..4, "t/b", "Value:2");
        let mut colors = ColorCache::with_palette();
        let html = render_html_string(&chars, &mut colors, false);
        // two runs: "ab" (one usage), "cd" (two usages)
        assert_eq!(html.matches("<span").count(), 2);
        assert!(html.contains("title=\"-t/a, Value:1&#013;-t/b, Value:2\""));
        let mean = mean_color(&[colors.get("t/a").unwrap(), colors.get("t/b").unwrap()]);
        assert!(html.contains(&html_color(mean)));
    }

    #[test]
    fn test_split_keys_do_not_merge_with_joined_key() {
        let mut chars = chars_from_text("xy");
        stamp(&mut chars, 0..1, "T/a", "Value:1");
        stamp(&mut chars, 0..1, "b", "Value:2");
        stamp(&mut chars, 1..2, "T/ab", "Value:3");
        let html = render_html_string(&chars, &mut ColorCache::with_palette(), false);
        assert_eq!(html.matches("<span").count(), 2);
        assert!(html.contains("title=\"T/ab, Value:3\""));
    }

    #[test]
    fn test_markup_in_source_is_escaped() {
        let mut chars = chars_from_text("<ele>5</ele>");
        stamp(&mut chars, 5..6, "GPX/elevation", "Value:5");
        let html = render_html_string(&chars, &mut ColorCache::with_palette(), false);
        assert!(html.contains("&lt;ele&gt;"));
        assert!(!html.contains("<ele>"));
    }

    #[test]
    fn test_key_lists_every_color() {
        let mut chars = chars_from_text("ab");
        stamp(&mut chars, 0..1, "t/a", "Value:1");
        stamp(&mut chars, 1..2, "t/b", "Value:2");
        let html = render_html_string(&chars, &mut ColorCache::with_palette(), true);
        assert!(html.contains("<h3>Color Key</h3>"));
        assert_eq!(html.matches("<li>").count(), 2);
    }

    #[test]
    fn test_repeat_render_reuses_colors() {
        let mut chars = chars_from_text("ab");
        stamp(&mut chars, 0..2, "t/a", "Value:1");
        let mut colors = ColorCache::new();
        let first = render_html_string(&chars, &mut colors, false);
        let second = render_html_string(&chars, &mut colors, false);
        assert_eq!(first, second);
        assert_eq!(colors.len(), 1);
    }
}
