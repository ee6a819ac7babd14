//! Rotation labels and their classification.
//!
//! The application supplies free-text labels ("CCU", "Nights", "Cath Lab").
//! Every label is resolved through an exact-match [`RotationTable`] into the
//! closed [`Rotation`] enumeration before any rule looks at it. No rule ever
//! does substring matching on a label.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    Clinical,
    Icu,
    Floor,
    NightCoverage,
    Research,
    Administrative,
    Unassigned,
}

impl Rotation {
    pub fn is_night_coverage(self) -> bool {
        self == Rotation::NightCoverage
    }

    pub fn name(self) -> &'static str {
        match self {
            Rotation::Clinical       => "clinical",
            Rotation::Icu            => "icu",
            Rotation::Floor          => "floor",
            Rotation::NightCoverage  => "night_coverage",
            Rotation::Research       => "research",
            Rotation::Administrative => "administrative",
            Rotation::Unassigned     => "unassigned",
        }
    }
}

/// Label → rotation classification table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RotationTable {
    labels: HashMap<String, Rotation>,
}

impl RotationTable {
    pub fn new(labels: HashMap<String, Rotation>) -> Self {
        Self { labels }
    }

    /// Resolve a label. The empty string (after trimming) is always
    /// `Unassigned`; anything else must be listed exactly.
    pub fn classify(&self, label: &str) -> Option<Rotation> {
        let label = label.trim();
        if label.is_empty() {
            return Some(Rotation::Unassigned);
        }
        self.labels.get(label).copied()
    }

    pub fn insert(&mut self, label: impl Into<String>, rotation: Rotation) {
        self.labels.insert(label.into(), rotation);
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RotationTable {
        let mut t = RotationTable::default();
        t.insert("Cath", Rotation::Clinical);
        t.insert("Nights", Rotation::NightCoverage);
        t
    }

    #[test]
    fn empty_label_is_unassigned() {
        assert_eq!(table().classify(""), Some(Rotation::Unassigned));
        assert_eq!(table().classify("   "), Some(Rotation::Unassigned));
    }

    #[test]
    fn partial_labels_do_not_match() {
        let t = table();
        assert_eq!(t.classify("Cath"), Some(Rotation::Clinical));
        assert_eq!(t.classify("Cath 2"), None);
        assert_eq!(t.classify("Night"), None);
    }
}
