//! XML entity escaping for attribute values and character data.

use std::borrow::Cow;

/// Decode the predefined entities and character references.
///
/// Unknown or malformed entities are kept verbatim.
pub fn unescape(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }

    let mut output = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        output.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match tail.find(';') {
            Some(semi) => {
                let entity = &tail[1..semi];
                match decode_entity(entity) {
                    Some(ch) => output.push(ch),
                    None => output.push_str(&tail[..=semi]),
                }
                rest = &tail[semi + 1..];
            }
            None => {
                output.push_str(tail);
                rest = "";
            }
        }
    }
    output.push_str(rest);
    Cow::Owned(output)
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = entity.strip_prefix('#')?;
            let value = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse::<u32>().ok()?,
            };
            char::from_u32(value)
        }
    }
}

/// Escape a value for use inside an attribute delimited by `quote`.
pub fn escape_attribute(value: &str, quote: char) -> String {
    let mut output = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '"' if quote == '"' => output.push_str("&quot;"),
            '\'' if quote == '\'' => output.push_str("&apos;"),
            '\n' => output.push_str("&#10;"),
            '\t' => output.push_str("&#9;"),
            _ => output.push(ch),
        }
    }
    output
}

/// Escape character data.
pub fn escape_text(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            _ => output.push(ch),
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_predefined_entities() {
        assert_eq!(unescape("a &lt;b&gt; &amp; &quot;c&quot;"), "a <b> & \"c\"");
        assert_eq!(unescape("&#65;&#x42;"), "AB");
    }

    #[test]
    fn test_unescape_keeps_unknown_entities() {
        assert_eq!(unescape("&nbsp; & done"), "&nbsp; & done");
    }

    #[test]
    fn test_unescape_borrows_plain_text() {
        assert!(matches!(unescape("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn test_escape_attribute_respects_quote() {
        assert_eq!(escape_attribute("say \"hi\" & 'bye'", '"'), "say &quot;hi&quot; &amp; 'bye'");
        assert_eq!(escape_attribute("it's", '\''), "it&apos;s");
    }

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("1 < 2 && 3 > 2"), "1 &lt; 2 &amp;&amp; 3 &gt; 2");
    }
}
