//! Template-clone XML mutation.
//!
//! The declaration schema is never consulted. An element counts as an
//! attachment when it has both a `content` and a `filename` child in the
//! document namespace; the first such element is cloned once per attachment.

use xmltree::{EmitterConfig, Element, XMLNode};

/// Namespace assumed when the root element is not qualified.
pub const FALLBACK_NAMESPACE: &str = "urn:wco:datamodel:WCO:CIS:1";

/// Mimetype written into every injected attachment.
pub const PDF_MIMETYPE: &str = "application/pdf";

const CONTENT: &str = "content";
const FILENAME: &str = "filename";
const MIMETYPE: &str = "mimetype";

/// Optional children that receive the 1-based attachment index.
const SEQUENCE_FIELDS: [&str; 4] = ["sequenceNumber", "sequenceNo", "id", "documentSequenceId"];

/// Comment that holds the template's slot during injection.
const INSERTION_MARKER: &str = "xml-loadgen:attachments";

/// Errors raised while reading, mutating or writing a template.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("XML parse error: {0}")]
    Parse(#[from] xmltree::ParseError),

    #[error("XML write error: {0}")]
    Write(#[from] xmltree::Error),

    #[error("Could not locate an attachment node with <filename> and <content> to clone")]
    NoAttachmentTemplate,

    #[error("Could not determine container element for attachments")]
    NoAttachmentContainer,
}

/// One file to embed: its name and base64 payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content: String,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}

/// A parsed template, owned by the task that mutates it.
#[derive(Debug, Clone)]
pub struct TemplateDocument {
    root: Element,
    namespace: String,
}

impl TemplateDocument {
    /// Parse a template and infer its namespace from the root element.
    pub fn parse(bytes: &[u8]) -> Result<Self, XmlError> {
        let root = Element::parse(bytes)?;
        let namespace = root
            .namespace
            .clone()
            .unwrap_or_else(|| FALLBACK_NAMESPACE.to_string());
        Ok(Self { root, namespace })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Text of the first descendant matching `path` (`.//a/b` semantics).
    pub fn text(&self, path: &[&str]) -> Option<String> {
        let indexes = descendant_path(&self.root, &self.namespace, path)?;
        element_at(&self.root, &indexes).map(text_of)
    }

    /// Overwrite the text of the first descendant matching `path`.
    ///
    /// Returns `false` when nothing matches; the document is left untouched.
    pub fn set_text(&mut self, path: &[&str], text: &str) -> bool {
        let Some(indexes) = descendant_path(&self.root, &self.namespace, path) else {
            return false;
        };
        match element_at_mut(&mut self.root, &indexes) {
            Some(element) => {
                replace_text(element, text);
                true
            }
            None => false,
        }
    }

    /// Every attachment-like element in document order, as
    /// (filename, content) pairs.
    pub fn attachments(&self) -> Vec<Attachment> {
        let mut found = Vec::new();
        collect_attachment_like(&self.root, &self.namespace, &mut found);
        found
            .into_iter()
            .map(|element| {
                Attachment::new(
                    child(element, &self.namespace, FILENAME)
                        .map(text_of)
                        .unwrap_or_default(),
                    child(element, &self.namespace, CONTENT)
                        .map(text_of)
                        .unwrap_or_default(),
                )
            })
            .collect()
    }

    /// Remove every attachment-like element below the root.
    ///
    /// Returns how many elements were removed.
    pub fn remove_all_attachments(&mut self) -> usize {
        strip_attachment_like(&mut self.root, &self.namespace)
    }

    /// Remove every attachment-like element in the document and insert one
    /// clone of the first one per attachment, where that first one stood.
    /// An empty slice strips all attachments instead.
    pub fn inject_attachments(&mut self, attachments: &[Attachment]) -> Result<(), XmlError> {
        if attachments.is_empty() {
            self.remove_all_attachments();
            return Ok(());
        }

        let namespace = self.namespace.clone();
        if is_attachment_like(&self.root, &namespace) {
            return Err(XmlError::NoAttachmentContainer);
        }

        let is_template = |e: &Element| is_attachment_like(e, &namespace);
        let template_path =
            find_descendant(&self.root, &is_template).ok_or(XmlError::NoAttachmentTemplate)?;
        let (template_index, container_path) = template_path
            .split_last()
            .ok_or(XmlError::NoAttachmentContainer)?;

        // The template's slot is held by a comment while the rest of the
        // tree is stripped; index paths shift, the comment does not.
        let container = element_at_mut(&mut self.root, container_path)
            .ok_or(XmlError::NoAttachmentContainer)?;
        let slot = container
            .children
            .get_mut(*template_index)
            .ok_or(XmlError::NoAttachmentTemplate)?;
        let marker = XMLNode::Comment(INSERTION_MARKER.to_string());
        let template = match std::mem::replace(slot, marker) {
            XMLNode::Element(template) => template,
            _ => return Err(XmlError::NoAttachmentTemplate),
        };

        strip_attachment_like(&mut self.root, &namespace);

        let marker_path = find_marker(&self.root).ok_or(XmlError::NoAttachmentContainer)?;
        let (marker_index, container_path) = marker_path
            .split_last()
            .ok_or(XmlError::NoAttachmentContainer)?;
        let container = element_at_mut(&mut self.root, container_path)
            .ok_or(XmlError::NoAttachmentContainer)?;

        let clones = attachments.iter().enumerate().map(|(index, attachment)| {
            XMLNode::Element(fill_clone(&template, &namespace, attachment, index + 1))
        });
        let tail = container.children.split_off(*marker_index + 1);
        container.children.pop();
        container.children.extend(clones);
        container.children.extend(tail);

        Ok(())
    }

    /// Serialize with an XML declaration, UTF-8, indented.
    pub fn to_bytes(&self) -> Result<Vec<u8>, XmlError> {
        let mut buffer = Vec::new();
        let config = EmitterConfig::new()
            .perform_indent(true)
            .write_document_declaration(true);
        self.root.write_with_config(&mut buffer, config)?;
        Ok(buffer)
    }
}

/// Build one attachment element from the template.
fn fill_clone(template: &Element, namespace: &str, attachment: &Attachment, sequence: usize) -> Element {
    let mut clone = template.clone();

    for name in [MIMETYPE, FILENAME, CONTENT] {
        if child(&clone, namespace, name).is_none() {
            let mut element = Element::new(name);
            element.namespace = Some(namespace.to_string());
            element.prefix = template.prefix.clone();
            clone.children.push(XMLNode::Element(element));
        }
    }

    set_child_text(&mut clone, namespace, MIMETYPE, PDF_MIMETYPE);
    set_child_text(&mut clone, namespace, FILENAME, &attachment.filename);
    set_child_text(&mut clone, namespace, CONTENT, &attachment.content);

    let sequence = sequence.to_string();
    for name in SEQUENCE_FIELDS {
        set_child_text(&mut clone, namespace, name, &sequence);
    }

    clone
}

fn is_named(element: &Element, namespace: &str, name: &str) -> bool {
    element.name == name && element.namespace.as_deref() == Some(namespace)
}

fn is_attachment_like(element: &Element, namespace: &str) -> bool {
    child(element, namespace, CONTENT).is_some() && child(element, namespace, FILENAME).is_some()
}

fn child<'a>(element: &'a Element, namespace: &str, name: &str) -> Option<&'a Element> {
    element.children.iter().find_map(|node| match node {
        XMLNode::Element(child) if is_named(child, namespace, name) => Some(child),
        _ => None,
    })
}

fn child_index(element: &Element, namespace: &str, name: &str) -> Option<usize> {
    element.children.iter().position(|node| {
        matches!(node, XMLNode::Element(child) if is_named(child, namespace, name))
    })
}

fn set_child_text(element: &mut Element, namespace: &str, name: &str, text: &str) {
    if let Some(index) = child_index(element, namespace, name) {
        if let Some(XMLNode::Element(child)) = element.children.get_mut(index) {
            replace_text(child, text);
        }
    }
}

fn replace_text(element: &mut Element, text: &str) {
    element
        .children
        .retain(|node| !matches!(node, XMLNode::Text(_) | XMLNode::CData(_)));
    element.children.insert(0, XMLNode::Text(text.to_string()));
}

fn text_of(element: &Element) -> String {
    element
        .children
        .iter()
        .filter_map(|node| match node {
            XMLNode::Text(text) | XMLNode::CData(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

/// Child-index path to the first descendant (document order, root excluded)
/// satisfying `predicate`.
fn find_descendant<F>(root: &Element, predicate: &F) -> Option<Vec<usize>>
where
    F: Fn(&Element) -> bool,
{
    let mut path = Vec::new();
    find_descendant_in(root, predicate, &mut path).then_some(path)
}

fn find_descendant_in<F>(element: &Element, predicate: &F, path: &mut Vec<usize>) -> bool
where
    F: Fn(&Element) -> bool,
{
    for (index, node) in element.children.iter().enumerate() {
        if let XMLNode::Element(child) = node {
            path.push(index);
            if predicate(child) || find_descendant_in(child, predicate, path) {
                return true;
            }
            path.pop();
        }
    }
    false
}

/// Resolve `.//first/second/...`: the first descendant named `first` whose
/// direct children continue the path.
fn descendant_path(root: &Element, namespace: &str, path: &[&str]) -> Option<Vec<usize>> {
    let (first, rest) = path.split_first()?;
    let mut indexes = find_descendant(root, &|element: &Element| {
        is_named(element, namespace, first) && child_path(element, namespace, rest).is_some()
    })?;
    let anchor = element_at(root, &indexes)?;
    indexes.extend(child_path(anchor, namespace, rest)?);
    Some(indexes)
}

fn child_path(element: &Element, namespace: &str, names: &[&str]) -> Option<Vec<usize>> {
    let mut indexes = Vec::with_capacity(names.len());
    let mut current = element;
    for name in names {
        let index = child_index(current, namespace, name)?;
        indexes.push(index);
        current = match &current.children[index] {
            XMLNode::Element(child) => child,
            _ => return None,
        };
    }
    Some(indexes)
}

fn element_at<'a>(mut element: &'a Element, path: &[usize]) -> Option<&'a Element> {
    for &index in path {
        element = match element.children.get(index)? {
            XMLNode::Element(child) => child,
            _ => return None,
        };
    }
    Some(element)
}

fn element_at_mut<'a>(mut element: &'a mut Element, path: &[usize]) -> Option<&'a mut Element> {
    for &index in path {
        element = match element.children.get_mut(index)? {
            XMLNode::Element(child) => child,
            _ => return None,
        };
    }
    Some(element)
}

/// Child-index path to the insertion marker comment.
fn find_marker(element: &Element) -> Option<Vec<usize>> {
    for (index, node) in element.children.iter().enumerate() {
        match node {
            XMLNode::Comment(text) if text == INSERTION_MARKER => return Some(vec![index]),
            XMLNode::Element(child) => {
                if let Some(mut path) = find_marker(child) {
                    path.insert(0, index);
                    return Some(path);
                }
            }
            _ => {}
        }
    }
    None
}

fn collect_attachment_like<'a>(element: &'a Element, namespace: &str, found: &mut Vec<&'a Element>) {
    if is_attachment_like(element, namespace) {
        found.push(element);
    }
    for node in &element.children {
        if let XMLNode::Element(child) = node {
            collect_attachment_like(child, namespace, found);
        }
    }
}

fn strip_attachment_like(element: &mut Element, namespace: &str) -> usize {
    let before = element.children.len();
    element.children.retain(|node| {
        !matches!(node, XMLNode::Element(child) if is_attachment_like(child, namespace))
    });
    let mut removed = before - element.children.len();
    for node in element.children.iter_mut() {
        if let XMLNode::Element(child) = node {
            removed += strip_attachment_like(child, namespace);
        }
    }
    removed
}
