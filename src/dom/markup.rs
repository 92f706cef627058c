//! Markup parsing and serialization.
//!
//! Render overrides return markup strings; this is the lenient parser
//! that turns them back into nodes. It covers exactly what the renderer
//! produces: nested tags, double-quoted attributes, self-closing tags,
//! text with the four basic entities. Anything malformed degrades
//! gracefully (unclosed tags close at end of input, stray `</...>` tags
//! are ignored) - host trees are never worth panicking over.

use super::element::{Element, Node};

// =============================================================================
// PARSE
// =============================================================================

/// Parse a markup string into child nodes.
pub fn parse(input: &str) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut rest = input;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("</") {
            // Closing tag: pop one level, whatever the name says.
            let close = after.find('>').map(|i| i + 1).unwrap_or(after.len());
            rest = &after[close..];
            stack.pop();
        } else if rest.starts_with('<') {
            match parse_tag(&rest[1..]) {
                Some((element, self_closing, remainder)) => {
                    attach(&mut out, &stack, Node::Element(element.clone()));
                    if !self_closing {
                        stack.push(element);
                    }
                    rest = remainder;
                }
                None => {
                    // Bare '<' in text
                    push_text(&mut out, &stack, "<");
                    rest = &rest[1..];
                }
            }
        } else {
            let end = rest.find('<').unwrap_or(rest.len());
            push_text(&mut out, &stack, &unescape(&rest[..end]));
            rest = &rest[end..];
        }
    }
    out
}

/// Parse `tag attr="v" ...>` or `tag ... />` after the opening `<`.
/// Returns the element, whether it was self-closing, and the remainder.
fn parse_tag(rest: &str) -> Option<(Element, bool, &str)> {
    let name_end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(rest.len());
    if name_end == 0 {
        return None;
    }
    let element = Element::new(&rest[..name_end]);
    let mut rest = &rest[name_end..];

    loop {
        rest = rest.trim_start();
        if let Some(after) = rest.strip_prefix("/>") {
            return Some((element, true, after));
        }
        if let Some(after) = rest.strip_prefix('>') {
            return Some((element, false, after));
        }
        if rest.is_empty() {
            return Some((element, true, rest));
        }
        // Attribute: name or name="value"
        let name_end = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '=' | '>' | '/'))
            .unwrap_or(rest.len());
        let name = &rest[..name_end];
        rest = &rest[name_end..];
        if let Some(after) = rest.strip_prefix("=\"") {
            let close = after.find('"').unwrap_or(after.len());
            element.set_attribute(name, &unescape(&after[..close]));
            rest = &after[(close + 1).min(after.len())..];
        } else if !name.is_empty() {
            element.set_attribute(name, "");
        } else {
            // Unparseable character; skip it rather than loop forever.
            let mut chars = rest.chars();
            chars.next();
            rest = chars.as_str();
        }
    }
}

fn attach(out: &mut Vec<Node>, stack: &[Element], node: Node) {
    match stack.last() {
        Some(parent) => match node {
            Node::Element(el) => parent.append_child(&el),
            Node::Text(text) => parent.append_text(&text),
        },
        None => out.push(node),
    }
}

fn push_text(out: &mut Vec<Node>, stack: &[Element], text: &str) {
    if text.is_empty() {
        return;
    }
    attach(out, stack, Node::Text(text.to_string()));
}

// =============================================================================
// SERIALIZE
// =============================================================================

/// Serialize child nodes back to markup.
pub fn serialize(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(node, &mut out);
    }
    out
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => out.push_str(&escape(text)),
        Node::Element(el) => {
            out.push('<');
            out.push_str(&el.tag());
            for (name, value) in el.attributes() {
                out.push(' ');
                out.push_str(&name);
                out.push_str("=\"");
                out.push_str(&escape(&value));
                out.push('"');
            }
            out.push('>');
            for child in el.child_nodes() {
                write_node(&child, out);
            }
            out.push_str("</");
            out.push_str(&el.tag());
            out.push('>');
        }
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let mut replaced = false;
        for (entity, ch) in [("&amp;", '&'), ("&lt;", '<'), ("&gt;", '>'), ("&quot;", '"')] {
            if let Some(after) = rest.strip_prefix(entity) {
                out.push(ch);
                rest = after;
                replaced = true;
                break;
            }
        }
        if !replaced {
            out.push('&');
            rest = &rest[1..];
        }
    }
    out.push_str(rest);
    out
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(input: &str) -> String {
        serialize(&parse(input))
    }

    #[test]
    fn test_parse_nested() {
        let nodes = parse("<ul><li>one</li><li>two</li></ul>");
        assert_eq!(nodes.len(), 1);
        let Node::Element(ul) = &nodes[0] else { panic!("expected element") };
        assert_eq!(ul.tag(), "ul");
        assert_eq!(ul.children().len(), 2);
        assert_eq!(ul.text_content(), "onetwo");
    }

    #[test]
    fn test_parse_attributes() {
        let nodes = parse(r#"<button id="save" class="primary" disabled>Go</button>"#);
        let Node::Element(button) = &nodes[0] else { panic!("expected element") };
        assert_eq!(button.attribute("id").as_deref(), Some("save"));
        assert_eq!(button.attribute("class").as_deref(), Some("primary"));
        assert_eq!(button.attribute("disabled").as_deref(), Some(""));
    }

    #[test]
    fn test_self_closing() {
        let nodes = parse(r#"a<br/>b"#);
        assert_eq!(nodes.len(), 3);
        let Node::Element(br) = &nodes[1] else { panic!("expected element") };
        assert_eq!(br.tag(), "br");
    }

    #[test]
    fn test_unclosed_tags_close_at_end() {
        let nodes = parse("<div><span>hi");
        assert_eq!(nodes.len(), 1);
        let Node::Element(div) = &nodes[0] else { panic!("expected element") };
        assert_eq!(div.text_content(), "hi");
    }

    #[test]
    fn test_entities() {
        let nodes = parse("a &amp;&lt;b&gt; &quot;c&quot;");
        let Node::Text(text) = &nodes[0] else { panic!("expected text") };
        assert_eq!(text, "a &<b> \"c\"");
        assert_eq!(round_trip("x &amp; y"), "x &amp; y");
    }

    #[test]
    fn test_round_trip() {
        let markup = r#"<ul id="list"><li class="done">one</li><li>two</li></ul>"#;
        assert_eq!(round_trip(markup), markup);
    }
}
