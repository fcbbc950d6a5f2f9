//! Bidirectional value ↔ label tables.

use super::DecodeError;

/// Enumeration of the labels a table accepts.
///
/// Object safe so a [`DecodeError`] can carry any table without knowing its
/// value type.
pub trait Labels: Sync {
    /// Call `f` once per label, in table order.
    fn for_each_label(&self, f: &mut dyn FnMut(&'static str));
}

/// Ordered `(value, label)` pairs.
///
/// Lookups scan in order and stop at the first match in either direction, so
/// a table may list aliases for a value after its canonical label.
#[derive(Debug)]
pub struct ValueToStringMapping<T: 'static> {
    entries: &'static [(T, &'static str)],
}

impl<T: 'static> ValueToStringMapping<T> {
    /// Wrap a static table.
    pub const fn new(entries: &'static [(T, &'static str)]) -> Self {
        Self { entries }
    }

    /// The raw table.
    pub fn entries(&self) -> &'static [(T, &'static str)] {
        self.entries
    }
}

impl<T: Copy + PartialEq + Sync + 'static> ValueToStringMapping<T> {
    /// Value registered under `label`.
    pub fn value_of(&self, label: &str) -> Option<T> {
        self.entries
            .iter()
            .find(|(_, candidate)| *candidate == label)
            .map(|(value, _)| *value)
    }

    /// First label registered for `value`.
    pub fn label_of(&self, value: &T) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == value)
            .map(|(_, label)| *label)
    }

    /// Decode `token`; an unknown token reports this table's labels.
    pub fn decode(&'static self, token: &str) -> Result<T, DecodeError> {
        self.value_of(token).ok_or(DecodeError::UnknownLabel(self))
    }
}

impl<T: Sync + 'static> Labels for ValueToStringMapping<T> {
    fn for_each_label(&self, f: &mut dyn FnMut(&'static str)) {
        for (_, label) in self.entries {
            f(label);
        }
    }
}
