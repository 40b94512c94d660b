use std::collections::HashMap;

use crate::dom::{Dom, NodeId};
use crate::{Error, Result};

/// Builds a [`Dom`] from a raw response body. This is a structural parser,
/// not a standards-complete one: it understands start/end tags, attributes,
/// comments, declarations, void tags, and the optional end tags that matter
/// for form markup (`option`, `optgroup`, `li`, `p`). Script and style
/// bodies are skipped, never executed.
pub(crate) fn parse_html(html: &str) -> Result<Dom> {
    let mut dom = Dom::new();

    let mut stack = vec![dom.root];
    let bytes = html.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        if starts_with_at(bytes, i, b"<!--") {
            if let Some(end) = find_subslice(bytes, i + 4, b"-->") {
                i = end + 3;
            } else {
                return Err(Error::HtmlParse("unclosed HTML comment".into()));
            }
            continue;
        }

        if bytes[i] == b'<' {
            if starts_with_at(bytes, i, b"</") {
                let (tag, next) = parse_end_tag(html, i)?;
                i = next;

                while stack.len() > 1 {
                    let top = *stack
                        .last()
                        .ok_or_else(|| Error::HtmlParse("invalid stack state".into()))?;
                    let top_tag = dom.tag_name(top).unwrap_or("");
                    stack.pop();
                    if top_tag.eq_ignore_ascii_case(&tag) {
                        break;
                    }
                }
                continue;
            }

            if starts_with_at(bytes, i, b"<!") {
                i = parse_declaration_tag(html, i)?;
                continue;
            }

            let (tag, attrs, self_closing, next) = parse_start_tag(html, i)?;
            i = next;

            close_optional_option_start_tag(&dom, &mut stack, &tag);
            close_optional_optgroup_start_tag(&dom, &mut stack, &tag);
            close_optional_list_item_start_tag(&dom, &mut stack, &tag);
            close_optional_paragraph_start_tag(&dom, &mut stack, &tag);

            let parent = *stack
                .last()
                .ok_or_else(|| Error::HtmlParse("missing parent element".into()))?;
            let node = dom.create_element(parent, tag.clone(), attrs);

            if is_raw_text_tag(&tag) && !self_closing {
                let close = find_case_insensitive_end_tag(bytes, i, tag.as_bytes())
                    .ok_or_else(|| Error::HtmlParse(format!("unclosed <{tag}>")))?;
                i = close;
                let (_, after_end) = parse_end_tag(html, i)?;
                i = after_end;
                continue;
            }

            if !self_closing && !is_void_tag(&tag) {
                stack.push(node);
            }
            continue;
        }

        let text_start = i;
        while i < bytes.len() && bytes[i] != b'<' {
            i += 1;
        }

        if let Some(text) = html.get(text_start..i) {
            if !text.is_empty() {
                let parent = *stack
                    .last()
                    .ok_or_else(|| Error::HtmlParse("missing parent element".into()))?;
                let decoded = decode_character_references(text);
                if !decoded.is_empty() {
                    dom.create_text(parent, decoded);
                }
            }
        }
    }

    Ok(dom)
}

fn parse_start_tag(
    html: &str,
    at: usize,
) -> Result<(String, HashMap<String, String>, bool, usize)> {
    let bytes = html.as_bytes();
    let mut i = at;
    if bytes.get(i) != Some(&b'<') {
        return Err(Error::HtmlParse("expected '<'".into()));
    }
    i += 1;

    skip_ws(bytes, &mut i);
    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }

    let tag = html
        .get(tag_start..i)
        .ok_or_else(|| Error::HtmlParse("invalid tag name".into()))?
        .to_ascii_lowercase();

    if tag.is_empty() {
        return Err(Error::HtmlParse("empty tag name".into()));
    }

    let mut attrs = HashMap::new();
    let mut self_closing = false;

    loop {
        skip_ws(bytes, &mut i);
        if i >= bytes.len() {
            return Err(Error::HtmlParse("unclosed start tag".into()));
        }

        if bytes[i] == b'>' {
            i += 1;
            break;
        }

        if bytes[i] == b'/' && i + 1 < bytes.len() && bytes[i + 1] == b'>' {
            self_closing = true;
            i += 2;
            break;
        }

        let name_start = i;
        while i < bytes.len() && is_attr_name_char(bytes[i]) {
            i += 1;
        }

        let name = html
            .get(name_start..i)
            .ok_or_else(|| Error::HtmlParse("invalid attribute name".into()))?
            .to_ascii_lowercase();

        if name.is_empty() {
            return Err(Error::HtmlParse("invalid attribute name".into()));
        }

        skip_ws(bytes, &mut i);

        let value = if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            skip_ws(bytes, &mut i);
            parse_attr_value(html, bytes, &mut i)?
        } else {
            // Boolean attribute: presence is what matters.
            String::new()
        };

        attrs.insert(name, decode_character_references(&value));
    }

    Ok((tag, attrs, self_closing, i))
}

fn parse_end_tag(html: &str, at: usize) -> Result<(String, usize)> {
    let bytes = html.as_bytes();
    let mut i = at;

    if !(bytes.get(i) == Some(&b'<') && bytes.get(i + 1) == Some(&b'/')) {
        return Err(Error::HtmlParse("expected end tag".into()));
    }
    i += 2;
    skip_ws(bytes, &mut i);

    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }

    let tag = html
        .get(tag_start..i)
        .ok_or_else(|| Error::HtmlParse("invalid end tag".into()))?
        .to_ascii_lowercase();

    while i < bytes.len() && bytes[i] != b'>' {
        i += 1;
    }
    if i >= bytes.len() {
        return Err(Error::HtmlParse("unclosed end tag".into()));
    }

    Ok((tag, i + 1))
}

fn parse_declaration_tag(html: &str, at: usize) -> Result<usize> {
    let bytes = html.as_bytes();
    let mut i = at;
    while i < bytes.len() && bytes[i] != b'>' {
        i += 1;
    }
    if i >= bytes.len() {
        return Err(Error::HtmlParse("unclosed declaration".into()));
    }
    Ok(i + 1)
}

fn parse_attr_value(html: &str, bytes: &[u8], i: &mut usize) -> Result<String> {
    if *i >= bytes.len() {
        return Err(Error::HtmlParse("missing attribute value".into()));
    }

    if bytes[*i] == b'\'' || bytes[*i] == b'"' {
        let quote = bytes[*i];
        *i += 1;
        let start = *i;
        while *i < bytes.len() && bytes[*i] != quote {
            *i += 1;
        }
        if *i >= bytes.len() {
            return Err(Error::HtmlParse("unclosed quoted attribute value".into()));
        }
        let value = html
            .get(start..*i)
            .ok_or_else(|| Error::HtmlParse("invalid attribute value".into()))?
            .to_string();
        *i += 1;
        return Ok(value);
    }

    let start = *i;
    while *i < bytes.len()
        && !bytes[*i].is_ascii_whitespace()
        && bytes[*i] != b'>'
        && !(bytes[*i] == b'/' && *i + 1 < bytes.len() && bytes[*i + 1] == b'>')
    {
        *i += 1;
    }

    let value = html
        .get(start..*i)
        .ok_or_else(|| Error::HtmlParse("invalid attribute value".into()))?
        .to_string();
    Ok(value)
}

// A new <option> or <optgroup> implicitly closes an open <option>.
fn close_optional_option_start_tag(dom: &Dom, stack: &mut Vec<NodeId>, tag: &str) {
    if !(tag.eq_ignore_ascii_case("option") || tag.eq_ignore_ascii_case("optgroup")) {
        return;
    }

    let mut close_index = None;
    for index in (1..stack.len()).rev() {
        let Some(open_tag) = dom.tag_name(stack[index]) else {
            continue;
        };
        if open_tag.eq_ignore_ascii_case("option") {
            close_index = Some(index);
            break;
        }
        if open_tag.eq_ignore_ascii_case("optgroup")
            || open_tag.eq_ignore_ascii_case("select")
            || open_tag.eq_ignore_ascii_case("datalist")
        {
            break;
        }
    }

    if let Some(index) = close_index {
        stack.truncate(index);
    }
}

fn close_optional_optgroup_start_tag(dom: &Dom, stack: &mut Vec<NodeId>, tag: &str) {
    if !tag.eq_ignore_ascii_case("optgroup") {
        return;
    }

    let mut close_index = None;
    for index in (1..stack.len()).rev() {
        let Some(open_tag) = dom.tag_name(stack[index]) else {
            continue;
        };
        if open_tag.eq_ignore_ascii_case("optgroup") {
            close_index = Some(index);
            break;
        }
        if open_tag.eq_ignore_ascii_case("select") {
            break;
        }
    }

    if let Some(index) = close_index {
        stack.truncate(index);
    }
}

fn close_optional_list_item_start_tag(dom: &Dom, stack: &mut Vec<NodeId>, tag: &str) {
    if !tag.eq_ignore_ascii_case("li") {
        return;
    }

    let mut close_index = None;
    for index in (1..stack.len()).rev() {
        let Some(open_tag) = dom.tag_name(stack[index]) else {
            continue;
        };
        if open_tag.eq_ignore_ascii_case("li") {
            close_index = Some(index);
            break;
        }
        if open_tag.eq_ignore_ascii_case("ol")
            || open_tag.eq_ignore_ascii_case("ul")
            || open_tag.eq_ignore_ascii_case("menu")
        {
            break;
        }
    }

    if let Some(index) = close_index {
        stack.truncate(index);
    }
}

fn close_optional_paragraph_start_tag(dom: &Dom, stack: &mut Vec<NodeId>, tag: &str) {
    if !is_paragraph_terminator_tag(tag) {
        return;
    }

    let mut close_index = None;
    for index in (1..stack.len()).rev() {
        let Some(open_tag) = dom.tag_name(stack[index]) else {
            continue;
        };
        if open_tag.eq_ignore_ascii_case("p") {
            close_index = Some(index);
            break;
        }
    }

    if let Some(index) = close_index {
        stack.truncate(index);
    }
}

fn is_paragraph_terminator_tag(tag: &str) -> bool {
    matches!(
        tag.to_ascii_lowercase().as_str(),
        "div" | "dl" | "fieldset" | "form" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "hr"
            | "ol" | "p" | "pre" | "table" | "ul"
    )
}

fn is_raw_text_tag(tag: &str) -> bool {
    tag.eq_ignore_ascii_case("script") || tag.eq_ignore_ascii_case("style")
}

fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn decode_character_references(src: &str) -> String {
    if !src.contains('&') {
        return src.to_string();
    }

    fn decode_numeric(value: &str) -> Option<char> {
        let codepoint =
            if let Some(hex) = value.strip_prefix('x').or_else(|| value.strip_prefix('X')) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                value.parse::<u32>().ok()?
            };
        char::from_u32(codepoint)
    }

    fn decode_named(value: &str) -> Option<char> {
        match value {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{00A0}'),
            _ => None,
        }
    }

    let chars = src.chars().collect::<Vec<_>>();
    let mut out = String::new();
    let mut i = 0usize;

    while i < chars.len() {
        if chars[i] != '&' {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        let mut end = i + 1;
        while end < chars.len() && chars[end] != ';' && end - i <= 8 {
            end += 1;
        }

        if end < chars.len() && chars[end] == ';' && end > i + 1 {
            let raw = chars[i + 1..end].iter().collect::<String>();
            let decoded = if let Some(rest) = raw.strip_prefix('#') {
                decode_numeric(rest)
            } else {
                decode_named(&raw)
            };
            if let Some(value) = decoded {
                out.push(value);
                i = end + 1;
                continue;
            }
        }

        out.push('&');
        i += 1;
    }

    out
}

fn skip_ws(bytes: &[u8], i: &mut usize) {
    while *i < bytes.len() && bytes[*i].is_ascii_whitespace() {
        *i += 1;
    }
}

fn is_tag_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

fn is_attr_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

fn starts_with_at(bytes: &[u8], at: usize, needle: &[u8]) -> bool {
    if at + needle.len() > bytes.len() {
        return false;
    }
    &bytes[at..at + needle.len()] == needle
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || from > bytes.len() {
        return None;
    }

    let mut i = from;
    while i + needle.len() <= bytes.len() {
        if &bytes[i..i + needle.len()] == needle {
            return Some(i);
        }
        i += 1;
    }
    None
}

fn find_case_insensitive_end_tag(bytes: &[u8], from: usize, tag: &[u8]) -> Option<usize> {
    let mut needle = Vec::new();
    needle.extend_from_slice(b"</");
    needle.extend(tag.iter().map(|b| b.to_ascii_lowercase()));

    let mut i = from;
    while i + needle.len() <= bytes.len() {
        if bytes[i] == b'<' && bytes.get(i + 1) == Some(&b'/') {
            let mut matched = true;
            for j in 0..needle.len() {
                if bytes[i + j].to_ascii_lowercase() != needle[j] {
                    matched = false;
                    break;
                }
            }
            if matched {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}
