//! Change tracking for request models.
//!
//! A model records which of its fields were explicitly assigned so that only
//! those fields go on the wire. The remote API treats an omitted parameter
//! differently from one sent with its default value (omitted `sort_by` means
//! "best match"), so a full fixed payload is not equivalent.

use std::collections::BTreeSet;

use crate::query::{QueryParams, QueryValue};

/// A settable field with a fixed external identifier.
pub trait WireField: Copy + Ord + 'static {
    fn wire_name(self) -> &'static str;
}

/// The set of fields assigned at least once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Touched<F: WireField> {
    fields: BTreeSet<F>,
}

impl<F: WireField> Default for Touched<F> {
    fn default() -> Self {
        Self {
            fields: BTreeSet::new(),
        }
    }
}

impl<F: WireField> Touched<F> {
    /// Records `field`. Returns `false` if it was already recorded.
    pub fn mark(&mut self, field: F) -> bool {
        self.fields.insert(field)
    }

    #[must_use]
    pub fn contains(&self, field: F) -> bool {
        self.fields.contains(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = F> + '_ {
        self.fields.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }
}

/// Implemented by models whose setters mark fields in a [`Touched`] set.
pub trait ChangeTracked {
    type Field: WireField;

    fn touched(&self) -> &Touched<Self::Field>;

    /// Current value of `field`, or `None` when it holds nothing.
    fn current_value(&self, field: Self::Field) -> Option<QueryValue>;

    /// Wire name → current value for every touched field that holds a
    /// non-empty value. A model with no mutations yields an empty map.
    fn changed_fields(&self) -> QueryParams {
        self.touched()
            .iter()
            .filter_map(|field| {
                self.current_value(field)
                    .filter(|value| !value.is_empty())
                    .map(|value| (field.wire_name().to_owned(), value))
            })
            .collect()
    }
}
