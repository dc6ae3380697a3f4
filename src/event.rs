//! EXI's closed set of grammar events and the event-code tagged variant
//! (spec component D types).

/// The 16 EXI-event notations plus the internal `Void` placeholder used in
/// proto-grammars where a production has no terminal non-terminal on its
/// right-hand side. Numeric values match
/// `original_source/trunk/include/procTypes.h`'s `EVENT_*` constants so that
/// cross-referencing the C reference for an edge case is a direct lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    StartDocument = 0,
    EndDocument = 1,
    AttributeQName = 2,
    AttributeUri = 3,
    AttributeAll = 4,
    StartElementQName = 5,
    StartElementUri = 6,
    StartElementAll = 7,
    EndElement = 8,
    Characters = 9,
    NamespaceDeclaration = 10,
    Comment = 11,
    ProcessingInstruction = 12,
    DocType = 13,
    EntityReference = 14,
    SelfContained = 15,
    Void = 16,
}

impl EventType {
    pub const fn is_attribute(&self) -> bool {
        matches!(
            self,
            EventType::AttributeQName | EventType::AttributeUri | EventType::AttributeAll
        )
    }

    pub const fn is_start_element(&self) -> bool {
        matches!(
            self,
            EventType::StartElementQName | EventType::StartElementUri | EventType::StartElementAll
        )
    }

    /// Specificity rank used when scanning a rule for the best-matching
    /// production on encode: exact qname beats uri-wildcard beats full
    /// wildcard (§4.E "exact SE(qname) > SE(uri:*) > SE(*)").
    pub const fn specificity(&self) -> u8 {
        match self {
            EventType::StartElementQName | EventType::AttributeQName => 2,
            EventType::StartElementUri | EventType::AttributeUri => 1,
            EventType::StartElementAll | EventType::AttributeAll => 0,
            _ => 0,
        }
    }
}

/// The datatype carried by an event's content, used when a schema pins a
/// concrete type for CH/AT values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    None,
    String,
    Integer,
    Float,
    Decimal,
    DateTime,
    Boolean,
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExiEvent {
    pub event_type: EventType,
    pub value_type: ValueType,
}

impl ExiEvent {
    pub const fn new(event_type: EventType, value_type: ValueType) -> Self {
        Self {
            event_type,
            value_type,
        }
    }

    pub const fn untyped(event_type: EventType) -> Self {
        Self::new(event_type, ValueType::None)
    }
}

/// A 1-to-3-integer event code, represented as a small fixed-size struct
/// with an explicit arity discriminator rather than a variable-length array
/// (§9 "Event code as tagged variant" — avoids an allocation per code).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventCode {
    parts: [u32; 3],
    len: u8,
}

impl EventCode {
    pub const fn l1(a: u32) -> Self {
        Self {
            parts: [a, 0, 0],
            len: 1,
        }
    }

    pub const fn l2(a: u32, b: u32) -> Self {
        Self {
            parts: [a, b, 0],
            len: 2,
        }
    }

    pub const fn l3(a: u32, b: u32, c: u32) -> Self {
        Self {
            parts: [a, b, c],
            len: 3,
        }
    }

    pub fn parts(&self) -> &[u32] {
        &self.parts[..self.len as usize]
    }

    pub fn len(&self) -> u8 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl std::fmt::Display for EventCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.parts().iter().map(|p| p.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_code_display_matches_dotted_notation() {
        assert_eq!(EventCode::l1(0).to_string(), "0");
        assert_eq!(EventCode::l2(1, 0).to_string(), "1.0");
        assert_eq!(EventCode::l3(1, 1, 0).to_string(), "1.1.0");
    }

    #[test]
    fn specificity_orders_qname_over_uri_over_wildcard() {
        assert!(EventType::StartElementQName.specificity() > EventType::StartElementUri.specificity());
        assert!(EventType::StartElementUri.specificity() > EventType::StartElementAll.specificity());
    }
}
