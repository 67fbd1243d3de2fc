//! Typed traversal over a parsed HTML document.
//!
//! A thin layer over `scraper` exposing the handful of lookups the forecast
//! page needs: descendants by tag or class, attributes, following siblings and
//! whitespace-collapsed text.

use scraper::{ElementRef, Html};

/// Parsed HTML document
pub struct Document {
    html: Html,
}

impl Document {
    /// Parse HTML leniently. Parser complaints are logged and counted, never fatal.
    pub fn parse(source: &str) -> Self {
        let html = Html::parse_document(source);
        for warning in &html.errors {
            tracing::trace!("HTML parser warning: {}", warning);
        }
        Self { html }
    }

    /// Number of recoverable problems the parser reported
    pub fn warning_count(&self) -> usize {
        self.html.errors.len()
    }

    pub fn root(&self) -> Node<'_> {
        Node(self.html.root_element())
    }
}

/// An element inside a `Document`
#[derive(Debug, Clone, Copy)]
pub struct Node<'a>(ElementRef<'a>);

impl<'a> Node<'a> {
    pub fn tag(&self) -> &'a str {
        self.0.value().name()
    }

    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.0.value().attr(name)
    }

    /// True when the element carries every class in the space-separated list
    pub fn has_classes(&self, classes: &str) -> bool {
        let element = self.0.value();
        classes
            .split_whitespace()
            .all(|wanted| element.classes().any(|class| class == wanted))
    }

    /// Descendant elements in document order, excluding this one
    fn descendants(&self) -> impl Iterator<Item = Node<'a>> + 'a {
        self.0.descendants().skip(1).filter_map(ElementRef::wrap).map(Node)
    }

    /// All descendant elements with the given tag name
    pub fn elements_by_tag(&self, tag: &str) -> Vec<Node<'a>> {
        self.descendants().filter(|n| n.tag() == tag).collect()
    }

    pub fn first_by_tag(&self, tag: &str) -> Option<Node<'a>> {
        self.descendants().find(|n| n.tag() == tag)
    }

    /// All descendant elements carrying every class in `classes`
    pub fn elements_by_class(&self, classes: &str) -> Vec<Node<'a>> {
        self.descendants().filter(|n| n.has_classes(classes)).collect()
    }

    pub fn first_by_class(&self, classes: &str) -> Option<Node<'a>> {
        self.descendants().find(|n| n.has_classes(classes))
    }

    pub fn element_by_id(&self, id: &str) -> Option<Node<'a>> {
        self.descendants().find(|n| n.attribute("id") == Some(id))
    }

    /// First following sibling element with the given tag, skipping text and other elements
    pub fn next_sibling_by_tag(&self, tag: &str) -> Option<Node<'a>> {
        self.0
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .map(Node)
            .find(|n| n.tag() == tag)
    }

    /// Text of the element and its descendants with whitespace runs collapsed
    pub fn text_content(&self) -> String {
        collapse_whitespace(&self.0.text().collect::<String>())
    }
}

/// Collapse runs of whitespace (including non-breaking spaces) to one space and trim
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
