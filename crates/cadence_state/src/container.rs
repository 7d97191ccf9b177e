//! Per-workload field store.
//!
//! Fields are split across two maps encoding intent: `readable` holds the
//! workload's outputs, `writable` its inputs. A field is declared in exactly
//! one of the two; the split drives introspection and binding semantics
//! while [`StateContainer::get`] keeps a single access path (writables are
//! readable-through).

use std::collections::HashMap;

use crate::error::StateError;
use crate::value::Value;

/// Dual map of readable and writable fields for one workload.
///
/// The container itself is unsynchronised. The owning workload wraps it in a
/// mutex and holds that lock only for the duration of a map access.
#[derive(Debug, Default)]
pub struct StateContainer {
    /// Output fields, keyed by name.
    readable: HashMap<String, Value>,
    /// Input fields, keyed by name.
    writable: HashMap<String, Value>,
}

impl StateContainer {
    /// Create an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an output field with a default value.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::DuplicateField`] if the name exists in either
    /// map; the readable and writable namespaces are disjoint.
    pub fn declare_readable(
        &mut self,
        field: impl Into<String>,
        default: Value,
    ) -> Result<(), StateError> {
        let field = field.into();
        if self.readable.contains_key(&field) || self.writable.contains_key(&field) {
            return Err(StateError::DuplicateField(field));
        }
        self.readable.insert(field, default);
        Ok(())
    }

    /// Declare an input field with a default value.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::DuplicateField`] if the name exists in either
    /// map.
    pub fn declare_writable(
        &mut self,
        field: impl Into<String>,
        default: Value,
    ) -> Result<(), StateError> {
        let field = field.into();
        if self.readable.contains_key(&field) || self.writable.contains_key(&field) {
            return Err(StateError::DuplicateField(field));
        }
        self.writable.insert(field, default);
        Ok(())
    }

    /// Read a field: `writable` first, else `readable`, else `None`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<Value> {
        self.writable
            .get(field)
            .or_else(|| self.readable.get(field))
            .cloned()
    }

    /// Write a field into whichever map declares it.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::UnknownField`] if the field is declared in
    /// neither map.
    pub fn set(&mut self, field: &str, value: Value) -> Result<(), StateError> {
        if let Some(slot) = self.writable.get_mut(field) {
            *slot = value;
            Ok(())
        } else if let Some(slot) = self.readable.get_mut(field) {
            *slot = value;
            Ok(())
        } else {
            Err(StateError::UnknownField(field.to_string()))
        }
    }

    /// Returns `true` if the field is declared in either map.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.writable.contains_key(field) || self.readable.contains_key(field)
    }

    /// Names of the declared output fields.
    #[must_use]
    pub fn readable_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = self.readable.keys().cloned().collect();
        fields.sort();
        fields
    }

    /// Names of the declared input fields.
    #[must_use]
    pub fn writable_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = self.writable.keys().cloned().collect();
        fields.sort();
        fields
    }
}
