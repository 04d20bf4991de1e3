use crate::memory::MemoryKind;
use core::fmt;

/// Concrete numeric kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberKind {
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Int128,
    Int256,
    UInt,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    UInt128,
    UInt256,
    Word8,
    Word16,
    Word32,
    Word64,
    Fix64,
    UFix64,
}

/// Abstract numeric supertypes usable in annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberSupertype {
    Number,
    SignedNumber,
    Integer,
    SignedInteger,
    FixedPoint,
    SignedFixedPoint,
}

/// Scale of the fixed-point kinds: eight decimal digits.
pub const FIX64_SCALE: u32 = 8;
pub const FIX64_FACTOR: i64 = 100_000_000;

impl NumberKind {
    pub const ALL: [NumberKind; 20] = [
        NumberKind::Int,
        NumberKind::Int8,
        NumberKind::Int16,
        NumberKind::Int32,
        NumberKind::Int64,
        NumberKind::Int128,
        NumberKind::Int256,
        NumberKind::UInt,
        NumberKind::UInt8,
        NumberKind::UInt16,
        NumberKind::UInt32,
        NumberKind::UInt64,
        NumberKind::UInt128,
        NumberKind::UInt256,
        NumberKind::Word8,
        NumberKind::Word16,
        NumberKind::Word32,
        NumberKind::Word64,
        NumberKind::Fix64,
        NumberKind::UFix64,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NumberKind::Int => "Int",
            NumberKind::Int8 => "Int8",
            NumberKind::Int16 => "Int16",
            NumberKind::Int32 => "Int32",
            NumberKind::Int64 => "Int64",
            NumberKind::Int128 => "Int128",
            NumberKind::Int256 => "Int256",
            NumberKind::UInt => "UInt",
            NumberKind::UInt8 => "UInt8",
            NumberKind::UInt16 => "UInt16",
            NumberKind::UInt32 => "UInt32",
            NumberKind::UInt64 => "UInt64",
            NumberKind::UInt128 => "UInt128",
            NumberKind::UInt256 => "UInt256",
            NumberKind::Word8 => "Word8",
            NumberKind::Word16 => "Word16",
            NumberKind::Word32 => "Word32",
            NumberKind::Word64 => "Word64",
            NumberKind::Fix64 => "Fix64",
            NumberKind::UFix64 => "UFix64",
        }
    }

    pub fn from_name(name: &str) -> Option<NumberKind> {
        NumberKind::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Bit width of bounded kinds, `None` for `Int` and `UInt`.
    pub fn bits(self) -> Option<u32> {
        match self {
            NumberKind::Int | NumberKind::UInt => None,
            NumberKind::Int8 | NumberKind::UInt8 | NumberKind::Word8 => Some(8),
            NumberKind::Int16 | NumberKind::UInt16 | NumberKind::Word16 => Some(16),
            NumberKind::Int32 | NumberKind::UInt32 | NumberKind::Word32 => Some(32),
            NumberKind::Int64
            | NumberKind::UInt64
            | NumberKind::Word64
            | NumberKind::Fix64
            | NumberKind::UFix64 => Some(64),
            NumberKind::Int128 | NumberKind::UInt128 => Some(128),
            NumberKind::Int256 | NumberKind::UInt256 => Some(256),
        }
    }

    /// Constant metered size in bytes, `None` for the unbounded kinds whose
    /// size depends on the value.
    pub fn byte_size(self) -> Option<u64> {
        self.bits().map(|bits| u64::from(bits / 8))
    }

    /// Category the kind's values are metered under.
    pub fn memory_kind(self) -> MemoryKind {
        if self.is_big() {
            MemoryKind::BigInt
        } else {
            MemoryKind::Number
        }
    }

    /// Kinds backed by an arbitrary-precision representation.
    pub fn is_big(self) -> bool {
        matches!(
            self,
            NumberKind::Int
                | NumberKind::UInt
                | NumberKind::Int128
                | NumberKind::Int256
                | NumberKind::UInt128
                | NumberKind::UInt256
        )
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            NumberKind::Int
                | NumberKind::Int8
                | NumberKind::Int16
                | NumberKind::Int32
                | NumberKind::Int64
                | NumberKind::Int128
                | NumberKind::Int256
                | NumberKind::Fix64
        )
    }

    pub fn is_word(self) -> bool {
        matches!(
            self,
            NumberKind::Word8 | NumberKind::Word16 | NumberKind::Word32 | NumberKind::Word64
        )
    }

    pub fn is_fixed_point(self) -> bool {
        matches!(self, NumberKind::Fix64 | NumberKind::UFix64)
    }

    pub fn is_integer(self) -> bool {
        !self.is_fixed_point()
    }

    pub fn is_subtype_of(self, supertype: NumberSupertype) -> bool {
        match supertype {
            NumberSupertype::Number => true,
            NumberSupertype::SignedNumber => self.is_signed(),
            NumberSupertype::Integer => self.is_integer(),
            NumberSupertype::SignedInteger => self.is_integer() && self.is_signed(),
            NumberSupertype::FixedPoint => self.is_fixed_point(),
            NumberSupertype::SignedFixedPoint => self == NumberKind::Fix64,
        }
    }
}

impl fmt::Display for NumberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl NumberSupertype {
    pub fn name(self) -> &'static str {
        match self {
            NumberSupertype::Number => "Number",
            NumberSupertype::SignedNumber => "SignedNumber",
            NumberSupertype::Integer => "Integer",
            NumberSupertype::SignedInteger => "SignedInteger",
            NumberSupertype::FixedPoint => "FixedPoint",
            NumberSupertype::SignedFixedPoint => "SignedFixedPoint",
        }
    }
}

impl fmt::Display for NumberSupertype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
