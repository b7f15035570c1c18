//! Position-tracking document parsing.
//!
//! Parses a label into a tree while attaching a (url, line, column)
//! provenance tag to every node. Nodes live in a flat arena with
//! parent/child relationships by index; provenance lives in a parallel
//! array and is never part of a node's own content. Processing instructions
//! and comments are preserved as distinct node kinds because rule-set
//! discovery scans processing instructions.

use pds_model::{LabelError, SourcePosition};
use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use url::Url;

/// Index of a node in the document arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub struct Attribute {
    pub qname: String,
    pub local_name: String,
    pub namespace: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct Element {
    pub qname: String,
    pub local_name: String,
    pub namespace: Option<String>,
    /// Attributes in document order.
    pub attributes: Vec<Attribute>,
}

impl Element {
    /// Attribute value by qualified name as written in the source.
    pub fn attribute(&self, qname: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.qname == qname)
            .map(|a| a.value.as_str())
    }

    /// Attribute value by resolved namespace and local name.
    pub fn attribute_ns(&self, namespace: &str, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.as_deref() == Some(namespace) && a.local_name == local_name)
            .map(|a| a.value.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Document,
    Element(Element),
    Text(String),
    Comment(String),
    ProcessingInstruction { target: String, data: String },
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A parsed document with provenance on every node.
#[derive(Debug)]
pub struct Document {
    url: Url,
    nodes: Vec<Node>,
    positions: Vec<SourcePosition>,
}

impl Document {
    /// Parse a byte stream originating at `url`.
    ///
    /// Fails with [`LabelError::Parse`] on malformed markup; that is
    /// unrecoverable for this document.
    pub fn parse(bytes: &[u8], url: &Url) -> Result<Self, LabelError> {
        let lines = LineIndex::new(bytes);
        let mut reader = NsReader::from_reader(bytes);
        let config = reader.config_mut();
        config.expand_empty_elements = true;

        let mut document = Self {
            url: url.clone(),
            nodes: Vec::new(),
            positions: Vec::new(),
        };
        let root = document.push_node(NodeKind::Document, None, position_at(url, &lines, 0));
        let mut stack = vec![root];

        loop {
            let offset = reader.buffer_position() as usize;
            let position = position_at(url, &lines, offset);
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(error) => {
                    let at = position_at(url, &lines, reader.buffer_position() as usize);
                    return Err(LabelError::Parse {
                        message: error.to_string(),
                        line: at.line,
                        column: at.column,
                    });
                }
            };
            match event {
                Event::Start(start) => {
                    let element = document.read_element(&reader, &start, &position)?;
                    let parent = *stack.last().unwrap_or(&root);
                    let id = document.push_node(NodeKind::Element(element), Some(parent), position);
                    stack.push(id);
                }
                Event::End(_) => {
                    if stack.len() <= 1 {
                        return Err(LabelError::Parse {
                            message: "unexpected closing tag".to_string(),
                            line: position.line,
                            column: position.column,
                        });
                    }
                    stack.pop();
                }
                Event::Empty(start) => {
                    // Not produced with expand_empty_elements, but harmless.
                    let element = document.read_element(&reader, &start, &position)?;
                    let parent = *stack.last().unwrap_or(&root);
                    document.push_node(NodeKind::Element(element), Some(parent), position);
                }
                Event::Text(text) => {
                    let raw = String::from_utf8_lossy(text.as_ref()).into_owned();
                    let content = unescape_text(&raw, &position)?;
                    let parent = *stack.last().unwrap_or(&root);
                    document.push_node(NodeKind::Text(content), Some(parent), position);
                }
                Event::CData(data) => {
                    let content = String::from_utf8_lossy(data.as_ref()).into_owned();
                    let parent = *stack.last().unwrap_or(&root);
                    document.push_node(NodeKind::Text(content), Some(parent), position);
                }
                Event::Comment(comment) => {
                    let content = String::from_utf8_lossy(comment.as_ref()).into_owned();
                    let parent = *stack.last().unwrap_or(&root);
                    document.push_node(NodeKind::Comment(content), Some(parent), position);
                }
                Event::PI(pi) => {
                    let raw = String::from_utf8_lossy(pi.as_ref()).into_owned();
                    let (target, data) = match raw.split_once(char::is_whitespace) {
                        Some((target, data)) => (target.to_string(), data.trim().to_string()),
                        None => (raw, String::new()),
                    };
                    let parent = *stack.last().unwrap_or(&root);
                    document.push_node(
                        NodeKind::ProcessingInstruction { target, data },
                        Some(parent),
                        position,
                    );
                }
                Event::Decl(_) | Event::DocType(_) => {}
                Event::GeneralRef(reference) => {
                    let name = String::from_utf8_lossy(reference.as_ref()).into_owned();
                    let Some(resolved) = resolve_reference(&name) else {
                        return Err(LabelError::Parse {
                            message: format!("unresolved entity reference '&{name};'"),
                            line: position.line,
                            column: position.column,
                        });
                    };
                    let parent = *stack.last().unwrap_or(&root);
                    document.push_node(NodeKind::Text(resolved), Some(parent), position);
                }
                Event::Eof => break,
            }
        }

        if stack.len() > 1 {
            let at = position_at(url, &lines, bytes.len());
            return Err(LabelError::Parse {
                message: "unexpected end of document".to_string(),
                line: at.line,
                column: at.column,
            });
        }
        if document.document_element().is_none() {
            return Err(LabelError::Parse {
                message: "document has no root element".to_string(),
                line: 1,
                column: 1,
            });
        }
        Ok(document)
    }

    fn read_element(
        &self,
        reader: &NsReader<&[u8]>,
        start: &BytesStart<'_>,
        position: &SourcePosition,
    ) -> Result<Element, LabelError> {
        let qname = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let (resolution, local) = reader.resolve_element(start.name());
        let local_name = String::from_utf8_lossy(local.as_ref()).into_owned();
        let namespace = bound_namespace(&resolution);

        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|error| LabelError::Parse {
                message: format!("malformed attribute: {error}"),
                line: position.line,
                column: position.column,
            })?;
            let attr_qname = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let (attr_resolution, attr_local) = reader.resolve_attribute(attribute.key);
            let raw_value = String::from_utf8_lossy(&attribute.value).into_owned();
            attributes.push(Attribute {
                qname: attr_qname,
                local_name: String::from_utf8_lossy(attr_local.as_ref()).into_owned(),
                namespace: bound_namespace(&attr_resolution),
                value: unescape_text(&raw_value, position)?,
            });
        }
        Ok(Element {
            qname,
            local_name,
            namespace,
            attributes,
        })
    }

    fn push_node(
        &mut self,
        kind: NodeKind,
        parent: Option<NodeId>,
        position: SourcePosition,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            parent,
            children: Vec::new(),
        });
        self.positions.push(position);
        if let Some(parent) = parent {
            self.nodes[parent.index()].children.push(id);
        }
        id
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The document node itself.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The single top-level element.
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|id| matches!(self.kind(*id), NodeKind::Element(_)))
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn position(&self, id: NodeId) -> &SourcePosition {
        &self.positions[id.index()]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.kind(id) {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Top-level processing instructions, in document order.
    pub fn top_level_processing_instructions(&self) -> Vec<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .filter(|id| matches!(self.kind(*id), NodeKind::ProcessingInstruction { .. }))
            .collect()
    }

    /// Concatenated text content of a node's subtree.
    pub fn text_of(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            NodeKind::Text(text) => out.push_str(text),
            _ => {
                for child in self.children(id) {
                    self.collect_text(*child, out);
                }
            }
        }
    }
}

fn bound_namespace(resolution: &ResolveResult<'_>) -> Option<String> {
    match resolution {
        ResolveResult::Bound(namespace) => {
            Some(String::from_utf8_lossy(namespace.as_ref()).into_owned())
        }
        _ => None,
    }
}

/// Resolve a predefined or character entity reference.
fn resolve_reference(name: &str) -> Option<String> {
    match name {
        "amp" => return Some("&".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        _ => {}
    }
    let digits = name.strip_prefix('#')?;
    let code = match digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code).map(|ch| ch.to_string())
}

fn unescape_text(raw: &str, position: &SourcePosition) -> Result<String, LabelError> {
    quick_xml::escape::unescape(raw)
        .map(|text| text.into_owned())
        .map_err(|error| LabelError::Parse {
            message: error.to_string(),
            line: position.line,
            column: position.column,
        })
}

fn position_at(url: &Url, lines: &LineIndex, offset: usize) -> SourcePosition {
    let (line, column) = lines.locate(offset);
    SourcePosition::new(url.as_str(), line, column)
}

/// Byte-offset to line/column mapping for one input.
struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    fn new(bytes: &[u8]) -> Self {
        let mut line_starts = vec![0];
        for (index, byte) in bytes.iter().enumerate() {
            if *byte == b'\n' {
                line_starts.push(index + 1);
            }
        }
        Self { line_starts }
    }

    fn locate(&self, offset: usize) -> (i32, i32) {
        let line = self.line_starts.partition_point(|start| *start <= offset);
        let column = offset - self.line_starts[line - 1] + 1;
        (line as i32, column as i32)
    }
}
