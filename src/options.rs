//! EXI processing options (spec component G): alignment, fidelity
//! (`Preserve`), string table sizing, and schema identification.
//!
//! Grounded on `original_source/trunk/include/procTypes.h`'s `EXIOptions`
//! struct and the `PRESERVE_*`/`BIT_PACKED`/`BYTE_ALIGNMENT`/`PRE_COMPRESSION`
//! constants. Modeled as a plain data struct with a `bitflags`-free bitmask
//! newtype, the way the teacher keeps `Settings` as a thin wrapper type
//! rather than reaching for a flags crate for a handful of bits.

/// Stream alignment mode. Matches `BIT_PACKED`/`BYTE_ALIGNMENT`/`PRE_COMPRESSION`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    BitPacked,
    ByteAlignment,
    PreCompression,
}

/// Fidelity bitmask: which non-default XML constructs are preserved in the
/// EXI stream rather than being grammar-pruned away. Bit values match
/// `PRESERVE_COMMENTS`/`PRESERVE_PIS`/`PRESERVE_DTD`/`PRESERVE_PREFIXES`/
/// `PRESERVE_LEXVALUES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Preserve(u8);

impl Preserve {
    pub const COMMENTS: Preserve = Preserve(0b0000_0001);
    pub const PIS: Preserve = Preserve(0b0000_0010);
    pub const DTD: Preserve = Preserve(0b0000_0100);
    pub const PREFIXES: Preserve = Preserve(0b0000_1000);
    pub const LEXICAL_VALUES: Preserve = Preserve(0b0001_0000);
    pub const NONE: Preserve = Preserve(0);

    pub const fn bits(&self) -> u8 {
        self.0
    }

    pub const fn from_bits(bits: u8) -> Self {
        Preserve(bits)
    }

    pub const fn contains(&self, flag: Preserve) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub const fn union(self, other: Preserve) -> Preserve {
        Preserve(self.0 | other.0)
    }

    pub const fn is_default_fidelity(&self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for Preserve {
    type Output = Preserve;
    fn bitor(self, rhs: Preserve) -> Preserve {
        self.union(rhs)
    }
}

/// How the schema identifier is communicated in-band, mirroring the EXI
/// header options schema `schemaId` element semantics (§4.G): absent
/// (schema-less, no `xsi:schemaLocation` contract implied), a concrete id
/// string, or the empty string (explicitly schema-less by declaration).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaIdMode {
    Absent,
    Id(String),
    EmptyStringDeclaresSchemaless,
}

impl Default for SchemaIdMode {
    fn default() -> Self {
        SchemaIdMode::Absent
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub alignment: Alignment,
    pub compression: bool,
    pub strict: bool,
    pub fragment: bool,
    pub preserve: Preserve,
    pub self_contained: bool,
    pub schema_id: SchemaIdMode,
    pub block_size: u32,
    /// Maximum string length considered for value-table insertion; `None`
    /// means unbounded (`valueMaxLength == 0` in the C original).
    pub value_max_length: Option<u32>,
    /// Total value-partition capacity; `None` means unbounded.
    pub value_partition_capacity: Option<u32>,
}

impl Default for Options {
    /// Matches `makeDefaultOpts`: bit-packed, no compression, non-strict,
    /// document (not fragment) grammar, default fidelity, no
    /// self-contained, schema-less, unbounded value partitions.
    fn default() -> Self {
        Self {
            alignment: Alignment::BitPacked,
            compression: false,
            strict: false,
            fragment: false,
            preserve: Preserve::NONE,
            self_contained: false,
            schema_id: SchemaIdMode::Absent,
            block_size: 1_000_000,
            value_max_length: None,
            value_partition_capacity: None,
        }
    }
}

impl Options {
    /// Checks the combination rules from `errorHandle.h`'s
    /// `HEADER_OPTIONS_MISMATCH` doc comment, returning `Err` on the first
    /// violated rule. Rule 5 ("presence bit not set, no out-of-band options")
    /// is checked by the header merge logic in [`crate::header`], not here.
    pub fn validate(&self) -> Result<(), crate::error::ErrorCode> {
        use crate::error::ErrorCode;

        // Rule 1: alignment != bit-packed MUST NOT coexist with compression.
        if self.compression && self.alignment != Alignment::BitPacked {
            return Err(ErrorCode::HeaderOptionsMismatch);
        }
        // Rule 2: strict MUST NOT coexist with dtd/prefixes/comments/pis/
        // selfContained (lexicalValues is the one fidelity bit exempted).
        if self.strict {
            let incompatible = self.preserve.contains(Preserve::DTD)
                || self.preserve.contains(Preserve::PREFIXES)
                || self.preserve.contains(Preserve::COMMENTS)
                || self.preserve.contains(Preserve::PIS)
                || self.self_contained;
            if incompatible {
                return Err(ErrorCode::HeaderOptionsMismatch);
            }
        }
        // Rule 3: selfContained MUST NOT coexist with compression,
        // pre-compression, or strict.
        if self.self_contained
            && (self.compression || self.alignment == Alignment::PreCompression || self.strict)
        {
            return Err(ErrorCode::HeaderOptionsMismatch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn default_options_are_valid() {
        assert!(Options::default().validate().is_ok());
    }

    #[test]
    fn strict_with_prefixes_is_a_conflict() {
        let opts = Options {
            strict: true,
            preserve: Preserve::PREFIXES,
            ..Options::default()
        };
        assert_eq!(opts.validate().unwrap_err(), ErrorCode::HeaderOptionsMismatch);
    }

    #[test]
    fn strict_with_lexical_values_only_is_allowed() {
        let opts = Options {
            strict: true,
            preserve: Preserve::LEXICAL_VALUES,
            ..Options::default()
        };
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn compression_with_byte_alignment_is_a_conflict() {
        let opts = Options {
            compression: true,
            alignment: Alignment::ByteAlignment,
            ..Options::default()
        };
        assert_eq!(opts.validate().unwrap_err(), ErrorCode::HeaderOptionsMismatch);
    }

    #[test]
    fn self_contained_with_strict_is_a_conflict() {
        let opts = Options {
            self_contained: true,
            strict: true,
            ..Options::default()
        };
        assert_eq!(opts.validate().unwrap_err(), ErrorCode::HeaderOptionsMismatch);
    }
}
