// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Markup helpers shared by the HTML pages.
//!
//! Provides escaping, the number and text filters used by the badge, a
//! whitespace minifier, and the static index and error pages.

use std::borrow::Cow;

/// Escapes text for inclusion in HTML content or quoted attributes.
pub fn escape_html(value: &str) -> Cow<'_, str> {
    if value
        .chars()
        .any(|character| matches!(character, '&' | '<' | '>' | '\"' | '\''))
    {
        let mut escaped = String::with_capacity(value.len());
        for character in value.chars() {
            match character {
                '&' => escaped.push_str("&amp;"),
                '<' => escaped.push_str("&lt;"),
                '>' => escaped.push_str("&gt;"),
                '\"' => escaped.push_str("&quot;"),
                '\'' => escaped.push_str("&#39;"),
                other => escaped.push(other)
            }
        }
        Cow::Owned(escaped)
    } else {
        Cow::Borrowed(value)
    }
}

/// Formats a count compactly: `999`, `1.2k`, `3m`.
///
/// # Example
///
/// ```
/// use ghbadge::shortnum;
///
/// assert_eq!(shortnum(1234), "1.2k");
/// assert_eq!(shortnum(2_000_000), "2m");
/// ```
pub fn shortnum(value: i64) -> String {
    let magnitude = value.unsigned_abs();
    let sign = if value < 0 { "-" } else { "" };

    // units switch where one decimal of rounding would reach the next unit
    let (scaled, suffix) = match magnitude {
        0..1_000 => return value.to_string(),
        1_000..999_950 => (magnitude as f64 / 1_000.0, "k"),
        _ => (magnitude as f64 / 1_000_000.0, "m")
    };

    let formatted = format!("{scaled:.1}");
    let trimmed = formatted.strip_suffix(".0").unwrap_or(&formatted);
    format!("{sign}{trimmed}{suffix}")
}

/// Shortens `value` to at most `length` characters plus an ellipsis, cutting
/// at the last word boundary when there is one.
pub fn smart_truncate(value: &str, length: usize) -> Cow<'_, str> {
    if value.chars().count() <= length {
        return Cow::Borrowed(value);
    }

    let head: String = value.chars().take(length).collect();
    let cut = match head.rfind(char::is_whitespace) {
        Some(index) if index > 0 => &head[..index],
        _ => head.as_str()
    };

    Cow::Owned(format!("{}...", cut.trim_end()))
}

/// Collapses insignificant whitespace in generated markup.
///
/// Runs of whitespace become a single space and whitespace between a closing
/// `>` and an opening `<` is removed entirely.
pub fn minify_html(markup: &str) -> String {
    let mut output = String::with_capacity(markup.len());
    let mut pending_space = false;

    for character in markup.chars() {
        if character.is_whitespace() {
            pending_space = true;
            continue;
        }

        if pending_space {
            let after_tag = output.ends_with('>') || output.is_empty();
            if !(after_tag && character == '<') && !output.is_empty() {
                output.push(' ');
            }
            pending_space = false;
        }
        output.push(character);
    }

    output
}

/// Landing page describing how to embed a badge.
pub fn index_page() -> String {
    minify_html(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <title>GitHub Badge</title>
  </head>
  <body>
    <h1>GitHub Badge</h1>
    <p>A compact card with a GitHub user's repositories, languages and
       commit activity over the last days.</p>
    <form action="/badge/" method="get" onsubmit="this.action = '/badge/' + this.user.value; this.user.disabled = true;">
      <input name="user" placeholder="GitHub username" required>
      <button type="submit">Show badge</button>
    </form>
    <h2>Embed</h2>
    <pre>&lt;iframe src="/badge/USERNAME" frameborder="0" scrolling="no"&gt;&lt;/iframe&gt;</pre>
    <h2>Options</h2>
    <ul>
      <li><code>s=0</code> hides the support link.</li>
      <li><code>a=0</code> disables analytics.</li>
      <li><code>callback=NAME</code> returns JSONP instead of HTML.</li>
    </ul>
  </body>
</html>"#
    )
}

/// Error page served when a user or route does not exist.
pub fn not_found_page() -> String {
    minify_html(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <title>Not found</title>
  </head>
  <body>
    <p>Sorry, that GitHub user could not be found.</p>
  </body>
</html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_html_handles_all_special_characters() {
        assert_eq!(escape_html("&<>\"'normal"), "&amp;&lt;&gt;&quot;&#39;normal");
    }

    #[test]
    fn escape_html_returns_borrowed_when_no_escaping_needed() {
        match escape_html("plain text") {
            Cow::Borrowed(s) => assert_eq!(s, "plain text"),
            Cow::Owned(_) => panic!("expected borrowed variant")
        }
    }

    #[test]
    fn shortnum_scales_large_values() {
        assert_eq!(shortnum(0), "0");
        assert_eq!(shortnum(999), "999");
        assert_eq!(shortnum(1_000), "1k");
        assert_eq!(shortnum(1_234), "1.2k");
        assert_eq!(shortnum(1_500_000), "1.5m");
        assert_eq!(shortnum(-2_500), "-2.5k");
        assert_eq!(shortnum(-12), "-12");
    }

    #[test]
    fn shortnum_switches_unit_after_rounding() {
        assert_eq!(shortnum(999_949), "999.9k");
        assert_eq!(shortnum(999_950), "1m");
        assert_eq!(shortnum(999_999), "1m");
        assert_eq!(shortnum(-999_999), "-1m");
        assert_eq!(shortnum(1_000_000), "1m");
    }

    #[test]
    fn smart_truncate_cuts_at_word_boundary() {
        assert_eq!(smart_truncate("short", 10), "short");
        assert_eq!(smart_truncate("hello wonderful world", 12), "hello...");
        assert_eq!(smart_truncate("abcdefghij", 4), "abcd...");
    }

    #[test]
    fn minify_html_removes_whitespace_between_tags() {
        let markup = "<div>\n  <p>Hello   there</p>\n</div>\n";
        assert_eq!(minify_html(markup), "<div><p>Hello there</p></div>");
    }

    #[test]
    fn minify_html_keeps_spaces_inside_text_and_tags() {
        let markup = "<a href=\"/x\"  class=\"y\">one\n two</a> <b>three</b>";
        assert_eq!(minify_html(markup), "<a href=\"/x\" class=\"y\">one two</a><b>three</b>");
    }

    #[test]
    fn static_pages_are_minified() {
        let index = index_page();
        assert!(index.starts_with("<!DOCTYPE html><html lang=\"en\">"));
        assert!(!index.contains('\n'));
        assert!(not_found_page().contains("could not be found"));
    }
}
