use std::collections::HashSet;

use crate::domain::VendorCode;

/// Process-lifetime set of vendor codes seen so far.
///
/// The catalog backend has no real vendor-creation API; registration here
/// is local bookkeeping. The caller fires a best-effort notification to
/// the catalog when a code is newly seen, and that side effect must never
/// block or fail the vendor switch itself.
#[derive(Debug, Default)]
pub struct VendorRegistry {
    known: HashSet<VendorCode>,
}

impl VendorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the code was not previously known.
    pub fn ensure_registered(&mut self, code: &VendorCode) -> bool {
        self.known.insert(code.clone())
    }

    pub fn is_known(&self, code: &VendorCode) -> bool {
        self.known.contains(code)
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_registration_is_new_second_is_not() {
        let mut reg = VendorRegistry::new();
        let acme = VendorCode::new("ACME");

        assert!(reg.ensure_registered(&acme));
        assert!(!reg.ensure_registered(&acme));
        assert!(reg.is_known(&acme));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn codes_differing_only_in_case_collapse() {
        let mut reg = VendorRegistry::new();
        assert!(reg.ensure_registered(&VendorCode::new("acme")));
        assert!(!reg.ensure_registered(&VendorCode::new("ACME")));
    }
}
