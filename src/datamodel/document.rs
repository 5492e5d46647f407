//! Data-model document loading
//!
//! The document is an iTop XML data model (`datamodel-production.xml` or a
//! module's `datamodel.*.xml`). Namespace declarations and prefixes are
//! normalized away before parsing so that `xsi:type` reads as `type`.

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

use super::types::{
    ClassDecl, FieldDecl, FieldKind, EXTERNAL_FIELD, EXTERNAL_KEY, HIERARCHICAL_KEY,
    LINKED_SET_INDIRECT,
};
use crate::error::{ItopError, ItopResult};

static XMLNS_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\s+xmlns(?::[A-Za-z_][\w.\-]*)?\s*=\s*(?:"[^"]*"|'[^']*')"#)
        .expect("valid xmlns pattern")
});
static ELEMENT_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(/?)[A-Za-z_][\w.\-]*:").expect("valid element prefix pattern"));
static ATTRIBUTE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(\s)[A-Za-z_][\w.\-]*:([A-Za-z_][\w.\-]*\s*=\s*["'])"#)
        .expect("valid attribute prefix pattern")
});

/// Read access to the classes of a data model.
///
/// `SchemaIndex` only talks to the document through this trait. Parent
/// chains must be acyclic.
pub trait DataModel: Send + Sync {
    /// Identified classes in document order
    fn schemas(&self) -> Vec<String>;

    /// The merged declaration of a class, if declared
    fn class(&self, name: &str) -> Option<&ClassDecl>;
}

/// Removes namespace declarations and `prefix:` adornments from element and
/// attribute names.
pub fn strip_namespaces(xml: &str) -> String {
    let without_decls = XMLNS_DECL.replace_all(xml, "");
    let without_elements = ELEMENT_PREFIX.replace_all(&without_decls, "<${1}");
    ATTRIBUTE_PREFIX
        .replace_all(&without_elements, "${1}${2}")
        .into_owned()
}

/// Parsed, immutable view of the data-model document
#[derive(Debug, Clone, Default)]
pub struct SchemaDocument {
    classes: Vec<ClassDecl>,
    positions: HashMap<String, usize>,
}

impl SchemaDocument {
    /// Parses a data-model document held in memory
    pub fn parse(xml: &str) -> ItopResult<Self> {
        let normalized = strip_namespaces(xml);
        let doc = roxmltree::Document::parse(&normalized)
            .map_err(|e| ItopError::Parse(format!("Invalid data model XML: {}", e)))?;

        let mut document = SchemaDocument::default();
        for node in doc
            .descendants()
            .filter(|n| n.is_element() && n.has_tag_name("class"))
        {
            let Some(id) = node.attribute("id") else {
                continue;
            };
            document.merge(read_class(node, id));
        }

        if document.classes.is_empty() {
            return Err(ItopError::Parse(
                "Data model declares no identified <class> elements".to_string(),
            ));
        }

        document.check_inheritance()?;

        info!("Loaded data model with {} classes", document.classes.len());
        Ok(document)
    }

    /// Parses raw bytes, replacing invalid UTF-8 sequences
    pub fn from_bytes(bytes: &[u8]) -> ItopResult<Self> {
        Self::parse(&String::from_utf8_lossy(bytes))
    }

    /// Reads and parses a data-model file
    pub fn from_file<P: AsRef<Path>>(path: P) -> ItopResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        info!(
            "Loading data model from file: {}, content length: {}",
            path.display(),
            bytes.len()
        );
        Self::from_bytes(&bytes)
    }

    /// Number of distinct classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    // Follows every class's parent pointers; a class reached twice on one
    // walk closes a cycle.
    fn check_inheritance(&self) -> ItopResult<()> {
        for class in &self.classes {
            let mut chain = vec![class.id.as_str()];
            let mut current = class.parent.as_deref();
            while let Some(parent) = current {
                if chain.contains(&parent) {
                    return Err(ItopError::Parse(format!(
                        "Inheritance cycle: {} -> {}",
                        chain.join(" -> "),
                        parent
                    )));
                }
                chain.push(parent);
                current = self.class(parent).and_then(|c| c.parent.as_deref());
            }
        }
        Ok(())
    }

    // Repeated declarations of a class (delta definitions) extend the first one.
    fn merge(&mut self, class: ClassDecl) {
        match self.positions.get(&class.id) {
            Some(&pos) => {
                let existing = &mut self.classes[pos];
                if existing.parent.is_none() {
                    existing.parent = class.parent;
                }
                for field in class.fields {
                    if existing.field(&field.id).is_none() {
                        existing.fields.push(field);
                    }
                }
            }
            None => {
                self.positions.insert(class.id.clone(), self.classes.len());
                self.classes.push(class);
            }
        }
    }
}

impl DataModel for SchemaDocument {
    fn schemas(&self) -> Vec<String> {
        self.classes.iter().map(|c| c.id.clone()).collect()
    }

    fn class(&self, name: &str) -> Option<&ClassDecl> {
        self.positions.get(name).map(|&pos| &self.classes[pos])
    }
}

fn read_class(node: roxmltree::Node<'_, '_>, id: &str) -> ClassDecl {
    let mut class = ClassDecl::new(id);
    class.parent = child_text(node, "parent");

    let mut fields = Vec::new();
    collect_fields(node, &mut fields);
    for field in fields {
        if class.field(&field.id).is_none() {
            class.fields.push(field);
        }
    }
    class
}

// Walks the class subtree without entering nested classes.
fn collect_fields(node: roxmltree::Node<'_, '_>, out: &mut Vec<FieldDecl>) {
    for child in node.children().filter(|n| n.is_element()) {
        if child.has_tag_name("class") {
            continue;
        }
        if child.has_tag_name("field") {
            match child.attribute("id") {
                Some(id) => out.push(FieldDecl {
                    id: id.to_string(),
                    kind: classify(child),
                }),
                None => debug!("Skipping <field> without id"),
            }
            continue;
        }
        collect_fields(child, out);
    }
}

fn classify(field: roxmltree::Node<'_, '_>) -> FieldKind {
    match field.attribute("type").unwrap_or_default() {
        EXTERNAL_FIELD => FieldKind::ExternalField {
            key_field: child_text(field, "extkey_attcode"),
            target_field: child_text(field, "target_attcode"),
        },
        EXTERNAL_KEY => FieldKind::ExternalKey {
            target_class: child_text(field, "target_class"),
        },
        HIERARCHICAL_KEY => FieldKind::HierarchicalKey,
        LINKED_SET_INDIRECT => FieldKind::LinkedSetIndirect {
            linked_class: child_text(field, "linked_class"),
            key_to_me: child_text(field, "ext_key_to_me"),
            key_to_remote: child_text(field, "ext_key_to_remote"),
        },
        other => FieldKind::Other(other.to_string()),
    }
}

fn child_text(node: roxmltree::Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|n| n.is_element() && n.has_tag_name(tag))
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
