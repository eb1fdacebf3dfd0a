//! Mount point bookkeeping
//!
//! The host is the container the viewer renders into. It tracks which
//! elements are attached so mounting and teardown can be observed.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(u32);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kinds of element the viewer attaches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// The raw render target
    Canvas,
    /// The glyph layer stacked over the canvas
    Overlay,
    /// Text shown while the model loads
    Placeholder,
}

/// Container element identified by name
#[derive(Debug)]
pub struct Host {
    name: String,
    children: Vec<(ElementId, ElementKind)>,
    next_id: u32,
}

impl Host {
    pub fn new(name: impl Into<String>) -> Self {
        Host {
            name: name.into(),
            children: Vec::new(),
            next_id: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends a new child and returns its id
    pub fn append(&mut self, kind: ElementKind) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.children.push((id, kind));
        id
    }

    /// Detaches a child; returns false if it was not attached
    pub fn remove(&mut self, id: ElementId) -> bool {
        let before = self.children.len();
        self.children.retain(|(child, _)| *child != id);
        self.children.len() != before
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.children.iter().any(|(child, _)| *child == id)
    }

    pub fn kind(&self, id: ElementId) -> Option<ElementKind> {
        self.children
            .iter()
            .find(|(child, _)| *child == id)
            .map(|(_, kind)| *kind)
    }

    /// Children in attachment order
    pub fn children(&self) -> impl Iterator<Item = (ElementId, ElementKind)> + '_ {
        self.children.iter().copied()
    }

    pub fn count(&self, kind: ElementKind) -> usize {
        self.children.iter().filter(|(_, k)| *k == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}
