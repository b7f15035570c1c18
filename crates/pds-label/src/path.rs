//! Resolution of rule-report location paths against a parsed document.
//!
//! Rule transforms identify a failing node with an absolute path expression
//! of the shape `/name[1]/name[2]` or the namespace-wildcard form
//! `/*:name[namespace-uri()='…'][1]`. Only that child-step subset is
//! supported; anything else fails to resolve and the caller falls back to
//! contextual text.

use crate::document::{Document, NodeId, NodeKind};

#[derive(Debug, PartialEq)]
struct Step {
    name: Option<String>,
    namespace: Option<String>,
    index: usize,
}

/// Resolve `location` against the document, returning the matched node.
pub fn resolve(document: &Document, location: &str) -> Option<NodeId> {
    let location = location.trim();
    let rest = location.strip_prefix('/')?;
    let mut current = document.root();
    for raw_step in split_steps(rest) {
        let step = parse_step(raw_step)?;
        current = select_child(document, current, &step)?;
    }
    Some(current)
}

/// Split on `/` at bracket depth zero; predicate contents may themselves
/// contain slashes.
fn split_steps(path: &str) -> Vec<&str> {
    let mut steps = Vec::new();
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut start = 0usize;
    for (index, ch) in path.char_indices() {
        match ch {
            '\'' => in_quote = !in_quote,
            '[' if !in_quote => depth += 1,
            ']' if !in_quote => depth = depth.saturating_sub(1),
            '/' if !in_quote && depth == 0 => {
                steps.push(&path[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    steps.push(&path[start..]);
    steps
}

fn parse_step(raw: &str) -> Option<Step> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let name_end = raw.find('[').unwrap_or(raw.len());
    let name_part = &raw[..name_end];
    let mut step = Step {
        name: parse_name(name_part)?,
        namespace: None,
        index: 1,
    };

    let mut rest = &raw[name_end..];
    while let Some(stripped) = rest.strip_prefix('[') {
        let end = find_predicate_end(stripped)?;
        let predicate = &stripped[..end];
        rest = &stripped[end + 1..];
        if let Ok(index) = predicate.trim().parse::<usize>() {
            step.index = index;
        } else if let Some(uri) = predicate
            .trim()
            .strip_prefix("namespace-uri()=")
            .map(|v| v.trim().trim_matches('\''))
        {
            step.namespace = Some(uri.to_string());
        } else {
            // Unsupported predicate shape.
            return None;
        }
    }
    if rest.is_empty() { Some(step) } else { None }
}

fn find_predicate_end(predicate: &str) -> Option<usize> {
    let mut in_quote = false;
    for (index, ch) in predicate.char_indices() {
        match ch {
            '\'' => in_quote = !in_quote,
            ']' if !in_quote => return Some(index),
            _ => {}
        }
    }
    None
}

fn parse_name(name: &str) -> Option<Option<String>> {
    if name.is_empty() {
        return None;
    }
    if name == "*" {
        return Some(None);
    }
    // `*:local` and `prefix:local` both match on the local name.
    let local = match name.split_once(':') {
        Some((_, local)) => local,
        None => name,
    };
    if local.is_empty() {
        return None;
    }
    Some(Some(local.to_string()))
}

fn select_child(document: &Document, parent: NodeId, step: &Step) -> Option<NodeId> {
    let mut seen = 0usize;
    for child in document.children(parent) {
        let NodeKind::Element(element) = document.kind(*child) else {
            continue;
        };
        if let Some(name) = &step.name {
            if element.local_name != *name {
                continue;
            }
        }
        if let Some(namespace) = &step.namespace {
            if element.namespace.as_deref() != Some(namespace.as_str()) {
                continue;
            }
        }
        seen += 1;
        if seen == step.index {
            return Some(*child);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn parse(xml: &[u8]) -> Document {
        let url = Url::parse("file:///path.xml").expect("valid url");
        Document::parse(xml, &url).expect("parses")
    }

    #[test]
    fn resolves_plain_indexed_paths() {
        let document = parse(b"<root>\n<a/>\n<a>\n<b/>\n</a>\n</root>");
        let node = resolve(&document, "/root[1]/a[2]/b[1]").expect("resolves");
        assert_eq!(document.position(node).line, 4);
        assert!(resolve(&document, "/root[1]/a[3]").is_none());
    }

    #[test]
    fn index_defaults_to_first_match() {
        let document = parse(b"<root><a/><a/></root>");
        let first = resolve(&document, "/root/a").expect("resolves");
        let explicit = resolve(&document, "/root/a[1]").expect("resolves");
        assert_eq!(first, explicit);
    }

    #[test]
    fn resolves_namespace_wildcard_steps() {
        let document = parse(
            b"<p:root xmlns:p='urn:example:ns'>\n  <p:item/>\n  <p:item/>\n</p:root>",
        );
        let node = resolve(
            &document,
            "/*:root[namespace-uri()='urn:example:ns'][1]/*:item[2]",
        )
        .expect("resolves");
        assert_eq!(document.position(node).line, 3);
        assert!(
            resolve(
                &document,
                "/*:root[namespace-uri()='urn:other:ns'][1]/*:item[1]",
            )
            .is_none()
        );
    }

    #[test]
    fn rejects_unsupported_expressions() {
        let document = parse(b"<root><a/></root>");
        assert!(resolve(&document, "root/a").is_none());
        assert!(resolve(&document, "/root/a[last()]").is_none());
        assert!(resolve(&document, "").is_none());
    }
}
