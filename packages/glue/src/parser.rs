//! Markup parser producing a [`GlueDocument`]
//!
//! The parser drives two logos lexers, morphing from [`ContentToken`] to
//! [`TagToken`] at every `<name` or `</name` and back at the tag end. All
//! whitespace is kept in the tree so the serializer can reproduce the input.

use logos::{Lexer, Logos};
use tracing::debug;

use crate::document::{is_blank, GlueAttribute, GlueData, GlueDocument, GlueElement, GlueId, GlueInstruction};
use crate::error::{GlueError, GlueResult};
use crate::lexer::{ContentToken, TagToken};

/// Parse markup source into a format-preserving tree
pub fn parse(source: &str) -> GlueResult<GlueDocument> {
    GlueParser::new(source).parse()
}

pub struct GlueParser<'src> {
    source: &'src str,
    document: GlueDocument,
    open: Vec<(GlueId, usize)>,
}

impl<'src> GlueParser<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            document: GlueDocument::new(),
            open: Vec::new(),
        }
    }

    pub fn parse(mut self) -> GlueResult<GlueDocument> {
        let mut lexer = ContentToken::lexer(self.source);

        loop {
            let Some(token) = lexer.next() else {
                break;
            };
            let span = lexer.span();
            let token = token.map_err(|_| {
                GlueError::lex_error(span.clone(), unterminated_construct(&self.source[span.start..]))
            })?;

            match token {
                ContentToken::Text(raw) => {
                    if self.open.is_empty() && !is_blank(raw) {
                        return Err(GlueError::invalid_syntax(
                            span,
                            "character data outside the root element",
                        ));
                    }
                    let id = self.document.create_characters(raw);
                    self.attach(id, span.start)?;
                }
                ContentToken::Comment(text) => {
                    let id = self.document.create_comment(text);
                    self.attach(id, span.start)?;
                }
                ContentToken::CData(text) => {
                    let id = self.document.push(GlueData::CData(text.to_string()));
                    self.attach(id, span.start)?;
                }
                ContentToken::Doctype(text) => {
                    let id = self.document.push(GlueData::Doctype(text.to_string()));
                    self.attach(id, span.start)?;
                }
                ContentToken::Instruction(text) => {
                    let split = text
                        .find(|c: char| c.is_ascii_whitespace())
                        .unwrap_or(text.len());
                    let instruction = GlueInstruction {
                        target: text[..split].to_string(),
                        data: text[split..].to_string(),
                    };
                    let id = self.document.push(GlueData::Instruction(instruction));
                    self.attach(id, span.start)?;
                }
                ContentToken::StartTagOpen(name) => {
                    let (element, self_closing, next) = self.parse_start_tag(name, lexer.morph())?;
                    lexer = next;
                    let id = self.document.push(GlueData::Element(element));
                    self.attach(id, span.start)?;
                    if !self_closing {
                        if let Some(element) = self.document.element_mut(id) {
                            element.set_self_closing(false);
                        }
                        self.open.push((id, span.start));
                    }
                }
                ContentToken::EndTagOpen(name) => {
                    let (end_trailing, next) = self.parse_end_tag(lexer.morph())?;
                    lexer = next;
                    let Some((id, _)) = self.open.pop() else {
                        return Err(GlueError::unexpected_token(
                            span,
                            "content",
                            format!("</{}>", name),
                        ));
                    };
                    let expected = self.document.tag_name(id).unwrap_or_default().to_string();
                    if expected != name {
                        return Err(GlueError::MismatchedTag {
                            span: span.into(),
                            expected,
                            found: name.to_string(),
                        });
                    }
                    if let Some(element) = self.document.element_mut(id) {
                        element.end_trailing = end_trailing;
                    }
                }
            }
        }

        if let Some((id, _)) = self.open.last() {
            let name = self.document.tag_name(*id).unwrap_or_default();
            return Err(GlueError::unexpected_eof(format!("</{}>", name)));
        }

        debug!(nodes = self.document.len(), "parsed markup");
        Ok(self.document)
    }

    fn attach(&mut self, id: GlueId, offset: usize) -> GlueResult<()> {
        match self.open.last() {
            Some(&(parent, _)) => self.document.push_child(parent, id),
            None => {
                if self.document.node(id).is_element() {
                    if self.document.root().is_some() {
                        return Err(GlueError::invalid_syntax(
                            offset..offset + 1,
                            "more than one root element",
                        ));
                    }
                    self.document.set_root_raw(id);
                }
                self.document.push_top_level(id);
            }
        }
        Ok(())
    }

    fn parse_start_tag(
        &self,
        name: &str,
        mut lexer: Lexer<'src, TagToken<'src>>,
    ) -> GlueResult<(GlueElement, bool, Lexer<'src, ContentToken<'src>>)> {
        let mut element = GlueElement::new(name);
        let mut pending = String::new();

        loop {
            let token = self.next_tag_token(&mut lexer, "attribute or '>'")?;
            match token {
                TagToken::Whitespace(ws) => pending.push_str(ws),
                TagToken::Name(attribute_name) => {
                    if pending.is_empty() {
                        return Err(GlueError::invalid_syntax(
                            lexer.span(),
                            "attributes must be separated by whitespace",
                        ));
                    }
                    let leading = std::mem::take(&mut pending);
                    let attribute = self.parse_attribute_value(&mut lexer, leading, attribute_name)?;
                    if element.has_attribute(&attribute.name) {
                        return Err(GlueError::invalid_syntax(
                            lexer.span(),
                            format!("duplicate attribute '{}'", attribute.name),
                        ));
                    }
                    element.push_attribute(attribute);
                }
                TagToken::Close => {
                    element.trailing = pending;
                    return Ok((element, false, lexer.morph()));
                }
                TagToken::SelfClose => {
                    element.trailing = pending;
                    return Ok((element, true, lexer.morph()));
                }
                other => {
                    return Err(GlueError::unexpected_token(
                        lexer.span(),
                        "attribute name",
                        format!("{:?}", other),
                    ));
                }
            }
        }
    }

    fn parse_attribute_value(
        &self,
        lexer: &mut Lexer<'src, TagToken<'src>>,
        leading: String,
        name: &str,
    ) -> GlueResult<GlueAttribute> {
        let mut separator = String::new();
        let mut seen_eq = false;

        loop {
            let token = self.next_tag_token(lexer, "attribute value")?;
            match token {
                TagToken::Whitespace(ws) => separator.push_str(ws),
                TagToken::Eq if !seen_eq => {
                    separator.push('=');
                    seen_eq = true;
                }
                TagToken::DoubleQuoted(quoted) | TagToken::SingleQuoted(quoted) if seen_eq => {
                    let quote = quoted.chars().next().unwrap_or('"');
                    return Ok(GlueAttribute {
                        leading,
                        name: name.to_string(),
                        separator,
                        quote,
                        raw_value: quoted[1..quoted.len() - 1].to_string(),
                    });
                }
                other => {
                    return Err(GlueError::unexpected_token(
                        lexer.span(),
                        if seen_eq { "quoted value" } else { "'='" },
                        format!("{:?}", other),
                    ));
                }
            }
        }
    }

    fn parse_end_tag(
        &self,
        mut lexer: Lexer<'src, TagToken<'src>>,
    ) -> GlueResult<(String, Lexer<'src, ContentToken<'src>>)> {
        let mut trailing = String::new();
        loop {
            match self.next_tag_token(&mut lexer, "'>'")? {
                TagToken::Whitespace(ws) => trailing.push_str(ws),
                TagToken::Close => return Ok((trailing, lexer.morph())),
                other => {
                    return Err(GlueError::unexpected_token(
                        lexer.span(),
                        "'>'",
                        format!("{:?}", other),
                    ));
                }
            }
        }
    }

    fn next_tag_token(
        &self,
        lexer: &mut Lexer<'src, TagToken<'src>>,
        expected: &str,
    ) -> GlueResult<TagToken<'src>> {
        match lexer.next() {
            Some(Ok(token)) => Ok(token),
            Some(Err(())) => Err(GlueError::lex_error(lexer.span(), "invalid character in tag")),
            None => Err(GlueError::unexpected_eof(expected)),
        }
    }
}

fn unterminated_construct(rest: &str) -> String {
    let construct = if rest.starts_with("<!--") {
        "comment"
    } else if rest.starts_with("<![CDATA[") {
        "CDATA section"
    } else if rest.starts_with("<?") {
        "processing instruction"
    } else if rest.starts_with("<!DOCTYPE") {
        "doctype"
    } else {
        return "unexpected character".to_string();
    };
    format!("unterminated {}", construct)
}
