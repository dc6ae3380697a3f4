//! Compiled simple/complex type descriptors used while building proto-
//! grammars (§4.F "Simple type"/"Complex type" recipes).
//!
//! Grounded on `original_source/trunk/include/procTypes.h`'s
//! `SimpleType`/`EXIType` enumeration and on `treeTableToGrammars.c`'s
//! `getSimpleTypeProtoGrammar`/`getRestrictionSimpleProtoGrammar` (including
//! the `NOT_IMPLEMENTED_YET` branches for `list` and enumerated
//! decimal/float/dateTime facets, preserved here as [`ErrorCode::NotImplemented`]).

use crate::error::{ErrorCode, Result};
use crate::event::ValueType;

/// The built-in XSD atomic datatypes this builder maps onto EXI's coarser
/// [`ValueType`] set. Kept as its own enum (rather than reusing `ValueType`
/// directly) because facet validation needs to know the specific XSD type
/// name (e.g. `unsignedByte` vs `integer`) even though both encode as
/// `ValueType::Integer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinAtomic {
    String,
    Boolean,
    Decimal,
    Float,
    Double,
    Integer,
    NonNegativeInteger,
    UnsignedByte,
    UnsignedShort,
    UnsignedInt,
    UnsignedLong,
    DateTime,
    Date,
    Time,
    Base64Binary,
    HexBinary,
    AnyUri,
    QName,
}

impl BuiltinAtomic {
    pub const fn value_type(self) -> ValueType {
        match self {
            BuiltinAtomic::String | BuiltinAtomic::AnyUri | BuiltinAtomic::QName => ValueType::String,
            BuiltinAtomic::Boolean => ValueType::Boolean,
            BuiltinAtomic::Decimal => ValueType::Decimal,
            BuiltinAtomic::Float | BuiltinAtomic::Double => ValueType::Float,
            BuiltinAtomic::Integer
            | BuiltinAtomic::NonNegativeInteger
            | BuiltinAtomic::UnsignedByte
            | BuiltinAtomic::UnsignedShort
            | BuiltinAtomic::UnsignedInt
            | BuiltinAtomic::UnsignedLong => ValueType::Integer,
            BuiltinAtomic::DateTime | BuiltinAtomic::Date | BuiltinAtomic::Time => ValueType::DateTime,
            BuiltinAtomic::Base64Binary | BuiltinAtomic::HexBinary => ValueType::Binary,
        }
    }

    /// The `n`-bit unsigned-integer width implied by this type's XSD value
    /// range, for the types §8 scenario 5 exercises (`xs:unsignedByte` ->
    /// 8 bits, `log2(256)`). `None` for types with no fixed bound.
    pub const fn fixed_bit_width(self) -> Option<u8> {
        match self {
            BuiltinAtomic::UnsignedByte => Some(8),
            BuiltinAtomic::UnsignedShort => Some(16),
            BuiltinAtomic::Boolean => Some(1),
            _ => None,
        }
    }
}

/// `minInclusive`/`maxInclusive`/`maxLength`/`enumeration` facets applied by
/// an `<xsd:restriction>` (§4.F "Restrictions clone the base simple type
/// into the simple-type table, applying facets").
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Facets {
    pub min_inclusive: Option<String>,
    pub max_inclusive: Option<String>,
    pub max_length: Option<u32>,
    pub enumeration: Vec<String>,
}

impl Facets {
    pub fn is_empty(&self) -> bool {
        self.min_inclusive.is_none()
            && self.max_inclusive.is_none()
            && self.max_length.is_none()
            && self.enumeration.is_empty()
    }
}

/// A compiled simple type: its EXI-level base datatype plus any restriction
/// facets, with a flag recording whether a named subtype or union exists for
/// it (§4.F "A schema-informed simple type with named subtypes or a union
/// sets a flag that enables a runtime xsi:type production").
#[derive(Debug, Clone)]
pub struct SimpleType {
    pub name: Option<String>,
    pub base: BuiltinAtomic,
    pub facets: Facets,
    pub has_named_subtype_or_union: bool,
}

impl SimpleType {
    pub fn atomic(base: BuiltinAtomic) -> Self {
        Self {
            name: None,
            base,
            facets: Facets::default(),
            has_named_subtype_or_union: false,
        }
    }

    /// Materialises this type's `enumeration` facet into concrete EXI
    /// values, per §4.F "enum values are materialised per base EXI type".
    /// Only `string`-family enumerations are supported; enumerating a
    /// decimal/float/dateTime-based type mirrors the reference builder's
    /// `NOT_IMPLEMENTED_YET` branch for that case.
    pub fn materialize_enumeration(&self) -> Result<Vec<String>> {
        if self.facets.enumeration.is_empty() {
            return Ok(Vec::new());
        }
        match self.base.value_type() {
            ValueType::String | ValueType::Integer | ValueType::Boolean => Ok(self.facets.enumeration.clone()),
            ValueType::Decimal | ValueType::Float | ValueType::DateTime => Err(ErrorCode::NotImplemented),
            ValueType::Binary | ValueType::None => Err(ErrorCode::NotImplemented),
        }
    }
}

/// A compiled complex type's attribute-use list plus a marker for which
/// content-model shape it had — the proto-grammar itself lives in
/// `builder::ProtoGrammar`; this just carries the facts the builder needs
/// while assembling it (e.g. whether it's the empty-content singleton).
#[derive(Debug, Clone)]
pub struct ComplexType {
    pub name: Option<String>,
    pub has_named_subtype: bool,
    pub is_empty_content: bool,
}

impl ComplexType {
    pub fn new(name: Option<String>, is_empty_content: bool) -> Self {
        Self {
            name,
            has_named_subtype: false,
            is_empty_content,
        }
    }
}
