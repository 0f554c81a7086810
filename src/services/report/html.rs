//! Streaming-Tolerant HTML Scanner
//!
//! A small tokenizer for the markup produced by report generation. It never
//! fails: malformed input degrades to text, and an incomplete tag or comment
//! at the end of the buffer simply ends tokenization, so a block is only
//! reported once its closing tag has fully arrived.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

/// Elements whose content is raw text and must not be tokenized.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    StartTag {
        /// Lowercased tag name
        name: String,
        /// Byte range of the raw attribute text inside the tag
        attrs: Range<usize>,
        self_closing: bool,
    },
    EndTag {
        name: String,
    },
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte range of the whole token in the source
    pub span: Range<usize>,
}

/// Tokenize `src` up to the last complete construct.
pub fn tokenize(src: &str) -> Vec<Token> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;
    // Where trailing text ends: the input end, or an incomplete construct
    let mut end = src.len();

    while let Some(offset) = src[pos..].find('<') {
        let lt = pos + offset;
        let rest = &src[lt..];

        if rest.starts_with("<!--") {
            let Some(close) = src[lt + 4..].find("-->") else {
                end = lt;
                break;
            };
            push_text(&mut tokens, text_start..lt);
            pos = lt + 4 + close + 3;
            text_start = pos;
            continue;
        }

        if rest.starts_with("<!") || rest.starts_with("<?") {
            let Some(close) = rest.find('>') else {
                end = lt;
                break;
            };
            push_text(&mut tokens, text_start..lt);
            pos = lt + close + 1;
            text_start = pos;
            continue;
        }

        let next = bytes.get(lt + 1).copied();
        if next == Some(b'/') {
            if !bytes.get(lt + 2).is_some_and(u8::is_ascii_alphabetic) {
                // Incomplete `</` at the very end, or stray text
                if lt + 2 >= bytes.len() {
                    end = lt;
                    break;
                }
                pos = lt + 1;
                continue;
            }
            let Some(close) = rest.find('>') else {
                end = lt;
                break;
            };
            let gt = lt + close;
            push_text(&mut tokens, text_start..lt);
            tokens.push(Token {
                kind: TokenKind::EndTag {
                    name: tag_name(&src[lt + 2..gt]),
                },
                span: lt..gt + 1,
            });
            pos = gt + 1;
            text_start = pos;
            continue;
        }

        match next {
            Some(b) if b.is_ascii_alphabetic() => {}
            // Incomplete `<` at the very end
            None => {
                end = lt;
                break;
            }
            // `<` followed by a non-letter is text, e.g. "P/E < 15"
            Some(_) => {
                pos = lt + 1;
                continue;
            }
        }

        let Some(gt) = find_tag_end(bytes, lt + 1) else {
            end = lt;
            break;
        };
        push_text(&mut tokens, text_start..lt);

        let name = tag_name(&src[lt + 1..gt]);
        let attrs_start = lt + 1 + name.len();
        let self_closing = gt > attrs_start && bytes[gt - 1] == b'/';
        let attrs_end = if self_closing { gt - 1 } else { gt };
        let is_raw = !self_closing && RAW_TEXT_ELEMENTS.contains(&name.as_str());

        tokens.push(Token {
            kind: TokenKind::StartTag {
                name: name.clone(),
                attrs: attrs_start..attrs_end.max(attrs_start),
                self_closing,
            },
            span: lt..gt + 1,
        });
        pos = gt + 1;
        text_start = pos;

        if is_raw {
            let closing = format!("</{}", name);
            match src[pos..].to_ascii_lowercase().find(&closing) {
                Some(close) => {
                    push_text(&mut tokens, pos..pos + close);
                    pos += close;
                    text_start = pos;
                }
                None => return tokens,
            }
        }
    }

    push_text(&mut tokens, text_start..end.max(text_start));

    tokens
}

fn push_text(tokens: &mut Vec<Token>, span: Range<usize>) {
    if !span.is_empty() {
        tokens.push(Token {
            kind: TokenKind::Text,
            span,
        });
    }
}

/// Find the `>` closing a tag, ignoring any inside quoted attribute values.
fn find_tag_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (i, &b) in bytes.iter().enumerate().skip(from) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Some(i),
            None => {}
        }
    }
    None
}

fn tag_name(s: &str) -> String {
    s.chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn attribute_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#,
        )
        .unwrap_or_else(|e| panic!("attribute pattern is valid: {}", e))
    })
}

/// Parse raw attribute text into `(lowercased name, value)` pairs.
pub fn parse_attributes(raw: &str) -> Vec<(String, String)> {
    attribute_regex()
        .captures_iter(raw)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            Some((name, value))
        })
        .collect()
}

/// Look up an attribute value by (case-insensitive) name.
pub fn attribute<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// A fully-closed element matched by [`find_blocks`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    /// Opening tag through the depth-matched closing tag
    pub outer: Range<usize>,
    /// Content between the opening and closing tags
    pub inner: Range<usize>,
    /// Matching blocks found inside this one
    pub nested: usize,
}

/// Find non-overlapping, fully-closed elements whose start tag satisfies
/// `matches(tag_name, attributes)`.
///
/// Depth is tracked per tag name, so `<div>` children of a matched `<div>`
/// do not close it early. Blocks that match inside an open block belong to
/// it and are only counted in `nested`. A block still open at the end of the
/// input is not returned.
pub fn find_blocks<F>(src: &str, matches: F) -> Vec<Block>
where
    F: Fn(&str, &[(String, String)]) -> bool,
{
    struct Open {
        tag: String,
        attrs: Vec<(String, String)>,
        start: usize,
        inner_start: usize,
        depth: usize,
        nested: usize,
    }

    let mut blocks = Vec::new();
    let mut open: Option<Open> = None;

    for token in tokenize(src) {
        match &token.kind {
            TokenKind::StartTag {
                name,
                attrs,
                self_closing,
            } => {
                let parsed = parse_attributes(&src[attrs.clone()]);
                match open.as_mut() {
                    None => {
                        if !*self_closing && matches(name, &parsed) {
                            open = Some(Open {
                                tag: name.clone(),
                                attrs: parsed,
                                start: token.span.start,
                                inner_start: token.span.end,
                                depth: 1,
                                nested: 0,
                            });
                        }
                    }
                    Some(current) => {
                        if *self_closing {
                            continue;
                        }
                        if *name == current.tag {
                            current.depth += 1;
                        }
                        if matches(name, &parsed) {
                            current.nested += 1;
                        }
                    }
                }
            }
            TokenKind::EndTag { name } => {
                let closed = match open.as_mut() {
                    Some(current) if *name == current.tag => {
                        current.depth -= 1;
                        current.depth == 0
                    }
                    _ => false,
                };
                if closed {
                    if let Some(current) = open.take() {
                        blocks.push(Block {
                            tag: current.tag,
                            attrs: current.attrs,
                            outer: current.start..token.span.end,
                            inner: current.inner_start..token.span.start,
                            nested: current.nested,
                        });
                    }
                }
            }
            TokenKind::Text => {}
        }
    }

    blocks
}

/// Elements that start a new line in [`block_text`].
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "footer",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "ol", "p", "section", "table",
    "td", "th", "tr", "ul",
];

/// Plain text of a fragment: every tag removed, script and style bodies
/// dropped, common entities decoded.
pub fn strip_tags(fragment: &str) -> String {
    text_content(fragment, false)
}

/// Like [`strip_tags`], but block-level tags become line breaks so text from
/// adjacent blocks is not glued together.
pub fn block_text(fragment: &str) -> String {
    text_content(fragment, true)
}

fn text_content(fragment: &str, block_breaks: bool) -> String {
    let mut out = String::with_capacity(fragment.len());
    let mut in_raw = false;

    for token in tokenize(fragment) {
        match token.kind {
            TokenKind::StartTag {
                name, self_closing, ..
            } => {
                if !self_closing && RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                    in_raw = true;
                }
                if block_breaks && BLOCK_ELEMENTS.contains(&name.as_str()) {
                    out.push('\n');
                }
            }
            TokenKind::EndTag { name } => {
                if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                    in_raw = false;
                }
                if block_breaks && BLOCK_ELEMENTS.contains(&name.as_str()) {
                    out.push('\n');
                }
            }
            TokenKind::Text => {
                if !in_raw {
                    out.push_str(&fragment[token.span]);
                }
            }
        }
    }

    decode_entities(&out)
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
