//! Structural event replay over a parsed document.
//!
//! Re-emits a document tree as the ordered event sequence a streaming
//! validator expects, carrying the provenance of the current node with
//! every event. The position handed to an end-of-element event is the
//! element's own position, not its last child's. Comments are not
//! structural and are never emitted; text is passed through as raw
//! character spans with no normalization.

use pds_model::SourcePosition;

use crate::document::{Document, Element, NodeId, NodeKind};

#[derive(Debug)]
pub enum StructuralEvent<'a> {
    StartDocument,
    EndDocument,
    StartElement { element: &'a Element },
    EndElement { element: &'a Element },
    Text(&'a str),
    ProcessingInstruction { target: &'a str, data: &'a str },
}

/// Consumes the structural event stream of one document.
pub trait StructuralHandler {
    fn handle(&mut self, event: StructuralEvent<'_>, position: &SourcePosition);
}

/// Replay the whole document through `handler`.
pub fn replay(document: &Document, handler: &mut dyn StructuralHandler) {
    replay_node(document, document.root(), handler);
}

/// Replay the subtree rooted at `node` through `handler`.
pub fn replay_node(document: &Document, node: NodeId, handler: &mut dyn StructuralHandler) {
    let position = document.position(node);
    match document.kind(node) {
        NodeKind::Document => {
            handler.handle(StructuralEvent::StartDocument, position);
            for child in document.children(node) {
                replay_node(document, *child, handler);
            }
            handler.handle(StructuralEvent::EndDocument, position);
        }
        NodeKind::Element(element) => {
            handler.handle(StructuralEvent::StartElement { element }, position);
            for child in document.children(node) {
                replay_node(document, *child, handler);
            }
            handler.handle(StructuralEvent::EndElement { element }, position);
        }
        NodeKind::Text(text) => {
            handler.handle(StructuralEvent::Text(text), position);
        }
        NodeKind::Comment(_) => {}
        NodeKind::ProcessingInstruction { target, data } => {
            handler.handle(
                StructuralEvent::ProcessingInstruction { target, data },
                position,
            );
        }
    }
}
