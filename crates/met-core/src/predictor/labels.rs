//! Canonical class table
//!
//! Every output encoding indexes classes in this order: tensor positions,
//! hard labels and probability-map keys all resolve through it.

use crate::models::MetClass;

/// Class names in index order
pub const CLASS_NAMES: [&str; 4] = ["Sedentary", "Light", "Moderate", "Vigorous"];

/// Fixed index <-> name mapping for the activity classes
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassLabelSet;

impl ClassLabelSet {
    pub const fn len(&self) -> usize {
        CLASS_NAMES.len()
    }

    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Name of the class at `index`
    pub fn name(&self, index: usize) -> Option<&'static str> {
        CLASS_NAMES.get(index).copied()
    }

    /// Class at `index`, or `None` outside the table
    pub fn class_at(&self, index: usize) -> Option<MetClass> {
        MetClass::ALL.get(index).copied()
    }

    /// Class for a signed engine label
    pub fn class_for_label(&self, label: i64) -> Option<MetClass> {
        usize::try_from(label).ok().and_then(|i| self.class_at(i))
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        CLASS_NAMES.iter().position(|n| *n == name)
    }

    /// Names paired with their classes, in index order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, MetClass)> {
        CLASS_NAMES.into_iter().zip(MetClass::ALL)
    }
}
