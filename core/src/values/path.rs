//! Account addressing values: addresses, paths, capabilities and links.

use crate::types::{PathDomain, StaticType};
use core::fmt;
use std::rc::Rc;

/// Eight-byte account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 8]);

impl Address {
    pub fn from_u64(value: u64) -> Self {
        Address(value.to_be_bytes())
    }

    pub fn to_u64(self) -> u64 {
        u64::from_be_bytes(self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.to_u64())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathValue {
    pub domain: PathDomain,
    pub identifier: Rc<str>,
}

impl PathValue {
    pub fn new(domain: PathDomain, identifier: &str) -> Self {
        Self {
            domain,
            identifier: Rc::from(identifier),
        }
    }
}

impl fmt::Display for PathValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.domain.identifier(), self.identifier)
    }
}

/// Capability to borrow the object linked at `path` in `address`.
#[derive(Debug, Clone)]
pub struct CapabilityValue<'a> {
    pub address: Address,
    pub path: PathValue,
    pub borrow_type: Option<StaticType<'a>>,
}

impl fmt::Display for CapabilityValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.borrow_type {
            Some(ty) => write!(
                f,
                "Capability<{}>(address: {}, path: {})",
                ty, self.address, self.path
            ),
            None => write!(f, "Capability(address: {}, path: {})", self.address, self.path),
        }
    }
}

/// Stored at a public or private path, pointing at another path.
#[derive(Debug, Clone)]
pub struct LinkValue<'a> {
    pub target: PathValue,
    pub borrow_type: StaticType<'a>,
}

impl fmt::Display for LinkValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Link<{}>({})", self.borrow_type, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Address::from_u64(1).to_string(), "0x0000000000000001");
        assert_eq!(PathValue::new(PathDomain::Public, "r").to_string(), "/public/r");
        let link = LinkValue {
            target: PathValue::new(PathDomain::Storage, "r"),
            borrow_type: StaticType::Bool,
        };
        assert_eq!(link.to_string(), "Link<Bool>(/storage/r)");
    }
}
