//! Lexer for markup documents using logos
//!
//! Markup has two lexical contexts: element content and the inside of a tag.
//! Each context has its own token set; the parser switches between them with
//! [`logos::Lexer::morph`]. Nothing is skipped, so every byte of the source is
//! covered by exactly one token and the glue tree can reproduce it verbatim.

use logos::{Lexer, Logos};

/// Tokens found in element content and between top-level constructs
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentToken<'src> {
    /// `<!-- ... -->`, carrying the text between the delimiters
    #[token("<!--", comment)]
    Comment(&'src str),

    /// `<![CDATA[ ... ]]>`, carrying the text between the delimiters
    #[token("<![CDATA[", cdata)]
    CData(&'src str),

    /// `<!DOCTYPE ... >`, carrying everything after the keyword
    #[token("<!DOCTYPE", doctype)]
    Doctype(&'src str),

    /// `<? ... ?>`, carrying the text between the delimiters
    #[token("<?", instruction)]
    Instruction(&'src str),

    /// `</name`; the rest of the end tag is lexed with [`TagToken`]
    #[regex(r"</[^ \t\r\n>]+", |lex| &lex.slice()[2..])]
    EndTagOpen(&'src str),

    /// `<name`; attributes and the tag end are lexed with [`TagToken`]
    #[regex(r"<[^ \t\r\n>/!?=]+", |lex| &lex.slice()[1..])]
    StartTagOpen(&'src str),

    /// Raw character data (entities still escaped)
    #[regex(r"[^<]+", |lex| lex.slice())]
    Text(&'src str),
}

/// Tokens found between `<name` and the closing `>` or `/>`
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagToken<'src> {
    #[regex(r"[ \t\r\n]+", |lex| lex.slice())]
    Whitespace(&'src str),

    #[regex(r#"[^ \t\r\n=/>"']+"#, |lex| lex.slice())]
    Name(&'src str),

    #[token("=")]
    Eq,

    /// Quoted value including its delimiters
    #[regex(r#""[^"]*""#, |lex| lex.slice())]
    DoubleQuoted(&'src str),

    /// Quoted value including its delimiters
    #[regex(r"'[^']*'", |lex| lex.slice())]
    SingleQuoted(&'src str),

    #[token(">")]
    Close,

    #[token("/>")]
    SelfClose,
}

fn delimited<'src>(lex: &mut Lexer<'src, ContentToken<'src>>, end: &str) -> Option<&'src str> {
    let rest = lex.remainder();
    let stop = rest.find(end)?;
    lex.bump(stop + end.len());
    Some(&rest[..stop])
}

fn comment<'src>(lex: &mut Lexer<'src, ContentToken<'src>>) -> Option<&'src str> {
    delimited(lex, "-->")
}

fn cdata<'src>(lex: &mut Lexer<'src, ContentToken<'src>>) -> Option<&'src str> {
    delimited(lex, "]]>")
}

fn doctype<'src>(lex: &mut Lexer<'src, ContentToken<'src>>) -> Option<&'src str> {
    delimited(lex, ">")
}

fn instruction<'src>(lex: &mut Lexer<'src, ContentToken<'src>>) -> Option<&'src str> {
    delimited(lex, "?>")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(source: &str) -> Vec<ContentToken<'_>> {
        ContentToken::lexer(source).filter_map(|r| r.ok()).collect()
    }

    #[test]
    fn test_lex_prolog() {
        let tokens = content("<?xml version=\"1.0\"?>\n<!-- hi -->\n");
        assert_eq!(
            tokens,
            vec![
                ContentToken::Instruction("xml version=\"1.0\""),
                ContentToken::Text("\n"),
                ContentToken::Comment(" hi "),
                ContentToken::Text("\n"),
            ]
        );
    }

    #[test]
    fn test_lex_tag_openers() {
        // Without morphing, the tag ends are plain text to the content lexer.
        let tokens = content("<VBox>text</VBox>");
        assert_eq!(
            tokens,
            vec![
                ContentToken::StartTagOpen("VBox"),
                ContentToken::Text(">text"),
                ContentToken::EndTagOpen("VBox"),
                ContentToken::Text(">"),
            ]
        );
    }

    #[test]
    fn test_lex_comment_with_dashes() {
        let tokens = content("<!-- a - b -- c -->");
        assert_eq!(tokens, vec![ContentToken::Comment(" a - b -- c ")]);
    }

    #[test]
    fn test_unterminated_comment_is_error() {
        let results: Vec<_> = ContentToken::lexer("<!-- never closed").collect();
        assert!(results.iter().any(|r| r.is_err()));
    }

    #[test]
    fn test_lex_tag_interior() {
        let tokens: Vec<_> = TagToken::lexer(" fx:id='b1' text = \"OK\"/>")
            .filter_map(|r| r.ok())
            .collect();
        assert_eq!(
            tokens,
            vec![
                TagToken::Whitespace(" "),
                TagToken::Name("fx:id"),
                TagToken::Eq,
                TagToken::SingleQuoted("'b1'"),
                TagToken::Whitespace(" "),
                TagToken::Name("text"),
                TagToken::Whitespace(" "),
                TagToken::Eq,
                TagToken::Whitespace(" "),
                TagToken::DoubleQuoted("\"OK\""),
                TagToken::SelfClose,
            ]
        );
    }

    #[test]
    fn test_morph_between_contexts() {
        let mut lex = ContentToken::lexer("<a b=\"1\">x");
        assert_eq!(lex.next(), Some(Ok(ContentToken::StartTagOpen("a"))));
        let mut tag = lex.morph::<TagToken>();
        assert_eq!(tag.next(), Some(Ok(TagToken::Whitespace(" "))));
        assert_eq!(tag.next(), Some(Ok(TagToken::Name("b"))));
        assert_eq!(tag.next(), Some(Ok(TagToken::Eq)));
        assert_eq!(tag.next(), Some(Ok(TagToken::DoubleQuoted("\"1\""))));
        assert_eq!(tag.next(), Some(Ok(TagToken::Close)));
        let mut lex = tag.morph::<ContentToken>();
        assert_eq!(lex.next(), Some(Ok(ContentToken::Text("x"))));
    }
}
