//! Classification of text property values (`$id`, `%key`, `@path`, ...)

use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression<'a> {
    /// Plain text, coerced by the property type
    Literal(&'a str),
    /// `\$text`: literal with the escape removed
    Escaped(&'a str),
    /// `$id`
    Reference(&'a str),
    /// `${expr}` or any other `$` form. Not evaluated.
    Binding(&'a str),
    /// `@path`, relative to the document location
    Location(&'a str),
    /// `%key`, looked up in the resource bundle
    Resource(&'a str),
    /// `#method` on an event handler property
    Handler(&'a str),
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap_or_else(|e| panic!("invalid pattern: {}", e))
    })
}

/// Whether `text` can be used as an `fx:id`
pub fn is_identifier(text: &str) -> bool {
    identifier_pattern().is_match(text)
}

/// Event handler properties are named `onSomething`
pub fn is_handler_property(name: &str) -> bool {
    name.strip_prefix("on")
        .and_then(|rest| rest.chars().next())
        .map(|c| c.is_ascii_uppercase())
        .unwrap_or(false)
}

pub fn parse_expression<'a>(property: &str, text: &'a str) -> Expression<'a> {
    if let Some(rest) = text.strip_prefix('\\') {
        return Expression::Escaped(rest);
    }
    if let Some(rest) = text.strip_prefix('$') {
        if rest.starts_with('{') {
            return Expression::Binding(text);
        }
        if is_identifier(rest) {
            return Expression::Reference(rest);
        }
        return Expression::Binding(text);
    }
    if let Some(rest) = text.strip_prefix('@') {
        return Expression::Location(rest);
    }
    if let Some(rest) = text.strip_prefix('%') {
        return Expression::Resource(rest);
    }
    if is_handler_property(property) {
        if let Some(rest) = text.strip_prefix('#') {
            return Expression::Handler(rest);
        }
    }
    Expression::Literal(text)
}

/// Identifier referenced by a `$id` value
pub fn reference_target<'a>(property: &str, text: &'a str) -> Option<&'a str> {
    match parse_expression(property, text) {
        Expression::Reference(id) => Some(id),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes() {
        assert_eq!(parse_expression("toggleGroup", "$group"), Expression::Reference("group"));
        assert_eq!(parse_expression("text", "${a.b}"), Expression::Binding("${a.b}"));
        assert_eq!(parse_expression("text", "$1x"), Expression::Binding("$1x"));
        assert_eq!(parse_expression("image", "@logo.png"), Expression::Location("logo.png"));
        assert_eq!(parse_expression("text", "%title"), Expression::Resource("title"));
        assert_eq!(parse_expression("text", "\\$5"), Expression::Escaped("$5"));
        assert_eq!(parse_expression("text", "plain"), Expression::Literal("plain"));
    }

    #[test]
    fn test_hash_is_handler_only_on_event_properties() {
        assert_eq!(parse_expression("onAction", "#save"), Expression::Handler("save"));
        assert_eq!(parse_expression("textFill", "#ff0000"), Expression::Literal("#ff0000"));
        assert!(!is_handler_property("one"));
    }

    #[test]
    fn test_identifiers() {
        assert!(is_identifier("okButton"));
        assert!(is_identifier("_x1"));
        assert!(!is_identifier("1x"));
        assert!(!is_identifier("a-b"));
    }
}
