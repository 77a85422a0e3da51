//! Small XML element reader, enough for machine-written reports.
//!
//! Builds a full element tree. Handles attributes, nested and self-closing elements,
//! comments, processing instructions, doctype, CDATA and the predefined plus numeric
//! entities. No namespaces, no DTD processing.

use nwiz_common::error::ParseError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |child| child.name == name)
    }
}

pub(crate) fn parse(input: &str) -> Result<Element, ParseError> {
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut pos: usize = 0;

    while pos < input.len() {
        let rest: &str = &input[pos..];

        if rest.starts_with("<?") {
            pos += skip_past(rest, "?>")?;
        } else if rest.starts_with("<!--") {
            pos += skip_past(rest, "-->")?;
        } else if let Some(cdata) = rest.strip_prefix("<![CDATA[") {
            let end = cdata
                .find("]]>")
                .ok_or_else(|| malformed("unterminated CDATA section"))?;
            if let Some(open) = stack.last_mut() {
                open.text.push_str(&cdata[..end]);
            }
            pos += "<![CDATA[".len() + end + "]]>".len();
        } else if rest.starts_with("<!") {
            pos += skip_past(rest, ">")?;
        } else if let Some(closing) = rest.strip_prefix("</") {
            let end = closing
                .find('>')
                .ok_or_else(|| malformed("unterminated closing tag"))?;
            let name: &str = closing[..end].trim();
            let element = stack
                .pop()
                .ok_or_else(|| malformed(&format!("unexpected </{name}>")))?;
            if element.name != name {
                return Err(malformed(&format!(
                    "</{name}> closes <{}>",
                    element.name
                )));
            }
            attach(element, &mut stack, &mut root)?;
            pos += 2 + end + 1;
        } else if rest.starts_with('<') {
            let end = tag_end(rest).ok_or_else(|| malformed("unterminated tag"))?;
            let inner: &str = &rest[1..end];
            let (inner, self_closing) = match inner.strip_suffix('/') {
                Some(stripped) => (stripped, true),
                None => (inner, false),
            };
            let element = parse_start_tag(inner)?;
            if self_closing {
                attach(element, &mut stack, &mut root)?;
            } else {
                stack.push(element);
            }
            pos += end + 1;
        } else {
            let end = rest.find('<').unwrap_or(rest.len());
            let text: &str = &rest[..end];
            match stack.last_mut() {
                Some(open) => open.text.push_str(&decode_entities(text)),
                None if text.trim().is_empty() => {}
                None => return Err(malformed("text outside of the root element")),
            }
            pos += end;
        }
    }

    if let Some(open) = stack.last() {
        return Err(malformed(&format!("<{}> is never closed", open.name)));
    }

    root.ok_or_else(|| malformed("document has no root element"))
}

/// Escapes text for use in element content and attribute values.
pub(crate) fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn attach(
    element: Element,
    stack: &mut [Element],
    root: &mut Option<Element>,
) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(malformed("more than one root element")),
    }
    Ok(())
}

fn skip_past(rest: &str, terminator: &str) -> Result<usize, ParseError> {
    rest.find(terminator)
        .map(|idx| idx + terminator.len())
        .ok_or_else(|| malformed(&format!("missing `{terminator}`")))
}

/// Index of the `>` closing the tag at the start of `rest`, ignoring quoted `>`.
fn tag_end(rest: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (idx, c) in rest.char_indices().skip(1) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(idx),
            (None, _) => {}
        }
    }
    None
}

fn parse_start_tag(inner: &str) -> Result<Element, ParseError> {
    let inner: &str = inner.trim();
    let name_end = inner
        .find(|c: char| c.is_whitespace())
        .unwrap_or(inner.len());
    let name: &str = &inner[..name_end];
    if name.is_empty() {
        return Err(malformed("tag without a name"));
    }

    let mut element = Element::new(name);
    let mut rest: &str = inner[name_end..].trim_start();

    while !rest.is_empty() {
        let eq = rest
            .find('=')
            .ok_or_else(|| malformed(&format!("attribute without value in <{name}>")))?;
        let key: &str = rest[..eq].trim();
        let after_eq: &str = rest[eq + 1..].trim_start();

        let quote = after_eq
            .chars()
            .next()
            .filter(|c| *c == '"' || *c == '\'')
            .ok_or_else(|| malformed(&format!("unquoted attribute `{key}` in <{name}>")))?;
        let value_end = after_eq[1..]
            .find(quote)
            .ok_or_else(|| malformed(&format!("unterminated attribute `{key}` in <{name}>")))?;

        let value: &str = &after_eq[1..1 + value_end];
        element
            .attributes
            .push((key.to_string(), decode_entities(value)));
        rest = after_eq[1 + value_end + 1..].trim_start();
    }

    Ok(element)
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut decoded = String::with_capacity(text.len());
    let mut rest: &str = text;

    while let Some(amp) = rest.find('&') {
        decoded.push_str(&rest[..amp]);
        let candidate: &str = &rest[amp..];

        let replacement = candidate
            .find(';')
            .and_then(|semi| entity_char(&candidate[1..semi]).map(|c| (c, semi)));

        match replacement {
            Some((c, semi)) => {
                decoded.push(c);
                rest = &candidate[semi + 1..];
            }
            None => {
                decoded.push('&');
                rest = &candidate[1..];
            }
        }
    }

    decoded.push_str(rest);
    decoded
}

fn entity_char(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = entity.strip_prefix("#x").or(entity.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}

fn malformed(reason: &str) -> ParseError {
    ParseError::Malformed(reason.to_string())
}
