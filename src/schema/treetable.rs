//! Neutral tree-table input IR (§4.F): the shape an external XSD parser is
//! assumed to hand us — one table per schema document, element-keyed, with
//! `include`/`import`/`redefine` already resolved by that collaborator.
//!
//! Grounded on `original_source/src/grammarGen/include/treeTable.h`'s
//! `TreeTable`/`TreeTableEntry` (a flat array of typed entries per schema
//! document, cross-referenced by name during grammar construction) and on
//! `treeTableToGrammars.c`'s entry-kind dispatch in `processTreeTable`.

use std::rc::Rc;

/// A reference to a type or a named group, resolved by name against this or
/// an imported tree table during building — not yet a `QNameId` (the string
/// table isn't touched until [`super::builder::build_schema`] runs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Builtin(super::types::BuiltinAtomic),
    Named(String),
    /// `xs:anyType` — the ur-type, handled by its own proto-grammar recipe
    /// (`createComplexUrTypeGrammar`).
    AnyType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QNameRef {
    pub uri: Option<String>,
    pub local_name: String,
}

impl QNameRef {
    pub fn new(uri: Option<&str>, local_name: &str) -> Self {
        Self {
            uri: uri.map(str::to_owned),
            local_name: local_name.to_owned(),
        }
    }
}

/// `##any` / `##other` / `##targetNamespace` / `##local` or an explicit URI
/// list, per the `<xsd:any>`/`<xsd:anyAttribute>` `namespace` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WildcardNamespace {
    Any,
    Other,
    TargetNamespace,
    Local,
    Enumerated(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxOccurs {
    Bounded(u32),
    Unbounded,
}

/// An XSD particle: `min..max` repetitions of `term`.
#[derive(Debug, Clone)]
pub struct Particle {
    pub min_occurs: u32,
    pub max_occurs: MaxOccurs,
    pub term: Term,
}

impl Particle {
    pub fn single(term: Term) -> Self {
        Self {
            min_occurs: 1,
            max_occurs: MaxOccurs::Bounded(1),
            term,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Term {
    Element(ElementTerm),
    Wildcard(WildcardNamespace),
    Sequence(Vec<Particle>),
    Choice(Vec<Particle>),
    /// `<xsd:all>` — unsupported (§4.F explicit non-goal, carried from
    /// `treeTableToGrammars.c`'s stubbed `all`-model-group branch).
    All(Vec<Particle>),
    GroupRef(String),
}

#[derive(Debug, Clone)]
pub struct ElementTerm {
    pub qname: QNameRef,
    pub type_ref: TypeRef,
    pub nillable: bool,
}

#[derive(Debug, Clone)]
pub struct AttributeUseDecl {
    pub qname: QNameRef,
    pub type_ref: TypeRef,
    pub required: bool,
}

#[derive(Debug, Clone)]
pub struct ElementEntry {
    pub qname: QNameRef,
    pub type_ref: TypeRef,
    pub nillable: bool,
}

#[derive(Debug, Clone)]
pub struct AttributeEntry {
    pub qname: QNameRef,
    pub type_ref: TypeRef,
}

#[derive(Debug, Clone)]
pub enum SimpleVariety {
    Atomic(super::types::BuiltinAtomic),
    Restriction {
        base: TypeRef,
        facets: super::types::Facets,
    },
    /// `<xsd:list>` — unsupported (§4.F / §1 `NOT_IMPLEMENTED_YET`).
    List { item: TypeRef },
    /// `<xsd:union>` — unsupported for the same reason.
    Union { members: Vec<TypeRef> },
}

#[derive(Debug, Clone)]
pub struct SimpleTypeEntry {
    pub name: String,
    pub variety: SimpleVariety,
}

#[derive(Debug, Clone)]
pub enum ContentEntry {
    Empty,
    /// Simple content: the type's character data carries this simple type.
    Simple(TypeRef),
    Complex(Particle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivation {
    Restriction,
    Extension,
}

#[derive(Debug, Clone)]
pub struct ComplexTypeEntry {
    pub name: String,
    pub base: Option<TypeRef>,
    pub derivation: Derivation,
    pub attribute_uses: Vec<AttributeUseDecl>,
    pub attribute_wildcard: Option<WildcardNamespace>,
    pub content: ContentEntry,
}

#[derive(Debug, Clone)]
pub struct GroupEntry {
    pub name: String,
    pub particle: Particle,
}

#[derive(Debug, Clone)]
pub struct AttributeGroupEntry {
    pub name: String,
    pub attribute_uses: Vec<AttributeUseDecl>,
}

#[derive(Debug, Clone)]
pub enum TreeTableEntry {
    Element(ElementEntry),
    Attribute(AttributeEntry),
    SimpleType(SimpleTypeEntry),
    ComplexType(ComplexTypeEntry),
    Group(GroupEntry),
    AttributeGroup(AttributeGroupEntry),
}

/// One parsed schema document's worth of global declarations.
#[derive(Debug, Clone, Default)]
pub struct TreeTable {
    pub target_namespace: Option<String>,
    pub entries: Vec<TreeTableEntry>,
}

impl TreeTable {
    pub fn new(target_namespace: Option<&str>) -> Self {
        Self {
            target_namespace: target_namespace.map(str::to_owned),
            entries: Vec::new(),
        }
    }

    pub fn find_simple_type(&self, name: &str) -> Option<&SimpleTypeEntry> {
        self.entries.iter().find_map(|e| match e {
            TreeTableEntry::SimpleType(s) if s.name == name => Some(s),
            _ => None,
        })
    }

    pub fn find_complex_type(&self, name: &str) -> Option<&ComplexTypeEntry> {
        self.entries.iter().find_map(|e| match e {
            TreeTableEntry::ComplexType(c) if c.name == name => Some(c),
            _ => None,
        })
    }

    pub fn find_group(&self, name: &str) -> Option<&GroupEntry> {
        self.entries.iter().find_map(|e| match e {
            TreeTableEntry::Group(g) if g.name == name => Some(g),
            _ => None,
        })
    }

    pub fn find_attribute_group(&self, name: &str) -> Option<&AttributeGroupEntry> {
        self.entries.iter().find_map(|e| match e {
            TreeTableEntry::AttributeGroup(a) if a.name == name => Some(a),
            _ => None,
        })
    }

    pub fn global_elements(&self) -> impl Iterator<Item = &ElementEntry> {
        self.entries.iter().filter_map(|e| match e {
            TreeTableEntry::Element(el) => Some(el),
            _ => None,
        })
    }
}

/// A set of tree tables (one per schema document), looked up across all of
/// them the way `include`/`import`/`redefine` composition requires — that
/// composition itself is assumed already done by the external parser; this
/// just resolves a bare name against whichever document declared it.
pub type SchemaSources = Rc<[TreeTable]>;

pub fn find_simple_type<'a>(tables: &'a [TreeTable], name: &str) -> Option<&'a SimpleTypeEntry> {
    tables.iter().find_map(|t| t.find_simple_type(name))
}

pub fn find_complex_type<'a>(tables: &'a [TreeTable], name: &str) -> Option<&'a ComplexTypeEntry> {
    tables.iter().find_map(|t| t.find_complex_type(name))
}

pub fn find_group<'a>(tables: &'a [TreeTable], name: &str) -> Option<&'a GroupEntry> {
    tables.iter().find_map(|t| t.find_group(name))
}

pub fn find_attribute_group<'a>(tables: &'a [TreeTable], name: &str) -> Option<&'a AttributeGroupEntry> {
    tables.iter().find_map(|t| t.find_attribute_group(name))
}
