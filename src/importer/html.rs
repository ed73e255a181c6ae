//! Minimal HTML text helpers for scraped pages

use regex::Regex;

lazy_static::lazy_static! {
    static ref SCRIPT_STYLE_RE: Regex =
        Regex::new(r"(?is)<(script|style|noscript|svg|iframe)\b[^>]*>.*?</(script|style|noscript|svg|iframe)\s*>").expect("valid regex");
    static ref COMMENT_RE: Regex = Regex::new(r"(?s)<!--.*?-->").expect("valid regex");
    static ref BLOCK_TAG_RE: Regex = Regex::new(r"(?i)<\s*(br|/p|/div|/li|/h[1-6]|/tr)\b[^>]*>").expect("valid regex");
    static ref TAG_RE: Regex = Regex::new(r"(?s)<[^>]*>").expect("valid regex");
    static ref NUMERIC_ENTITY_RE: Regex = Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("valid regex");
    static ref WHITESPACE_RE: Regex = Regex::new(r"[ \t\r\f\v]+").expect("valid regex");
    static ref BLANK_LINES_RE: Regex = Regex::new(r"\n\s*\n+").expect("valid regex");
}

const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&apos;", "'"),
    ("&#39;", "'"),
    ("&nbsp;", " "),
    ("&ndash;", "–"),
    ("&mdash;", "—"),
    ("&hellip;", "…"),
    ("&rsquo;", "'"),
    ("&lsquo;", "'"),
    ("&rdquo;", "\""),
    ("&ldquo;", "\""),
    ("&frac12;", "½"),
    ("&frac14;", "¼"),
    ("&frac34;", "¾"),
    ("&deg;", "°"),
    ("&ntilde;", "ñ"),
    ("&Ntilde;", "Ñ"),
];

/// Decodes the named and numeric entities common on recipe sites
pub fn decode_entities(input: &str) -> String {
    let decoded = NUMERIC_ENTITY_RE.replace_all(input, |caps: &regex::Captures| {
        let raw = &caps[1];
        let code = match raw.strip_prefix('x').or_else(|| raw.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_else(|| caps[0].to_string())
    });

    // &amp; last so "&amp;lt;" stays "&lt;"
    let mut out = decoded.into_owned();
    for (entity, replacement) in NAMED_ENTITIES.iter().filter(|(e, _)| *e != "&amp;") {
        if out.contains(entity) {
            out = out.replace(entity, replacement);
        }
    }
    out.replace("&amp;", "&")
}

/// Removes tags and decodes entities from an HTML fragment, collapsing whitespace
pub fn clean_text(fragment: &str) -> String {
    let without_tags = TAG_RE.replace_all(fragment, " ");
    let decoded = decode_entities(&without_tags);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Visible text of a whole page, one block per line
pub fn page_text(html: &str) -> String {
    let text = SCRIPT_STYLE_RE.replace_all(html, " ");
    let text = COMMENT_RE.replace_all(&text, " ");
    let text = BLOCK_TAG_RE.replace_all(&text, "\n");
    let text = TAG_RE.replace_all(&text, " ");
    let text = decode_entities(&text);
    let text = WHITESPACE_RE.replace_all(&text, " ");
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    BLANK_LINES_RE.replace_all(&lines.join("\n"), "\n").into_owned()
}

/// Cuts `text` to at most `max_chars` characters on a char boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("Salt &amp; pepper"), "Salt & pepper");
        assert_eq!(decode_entities("&#8217;s &#x2019;s"), "’s ’s");
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
        assert_eq!(decode_entities("Pi&ntilde;a"), "Piña");
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("<p>Sauté <b>garlic</b>\n  until   golden.</p>"), "Sauté garlic until golden.");
    }

    #[test]
    fn test_page_text_drops_scripts_and_styles() {
        let html = r#"<html><head><style>body { color: red }</style>
            <script>var x = "<p>hidden</p>";</script></head>
            <body><h1>Chicken Adobo</h1><!-- ad --><p>Marinate the chicken.</p><ul><li>1 kg chicken</li></ul></body></html>"#;
        let text = page_text(html);
        assert!(text.contains("Chicken Adobo"));
        assert!(text.contains("1 kg chicken"));
        assert!(!text.contains("hidden"));
        assert!(!text.contains("color"));
        assert!(!text.contains("ad -->"));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("kumusta", 4), "kumu");
        assert_eq!(truncate_chars("ñañ", 2), "ña");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
