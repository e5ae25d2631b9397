//! Generic entity model.
//!
//! The server defines its own schema, so an [`Entity`] is a type tag plus a
//! bag of named, multi-valued string fields. Typed values are parsed on read.
//! All types here are plain values: `Clone` is a full deep copy, so a copy
//! never observes mutation of the original and vice versa.

use crate::{Error, Result};
use std::str::FromStr;

/// One named field holding an ordered list of string values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: String,
    values: Vec<String>,
}

impl Field {
    /// Creates a field without values.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }

    /// Creates a field holding a single value.
    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: vec![value.into()],
        }
    }

    /// Creates a field holding the given values, in order.
    pub fn with_values<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// The field name. It cannot change after construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Mutable access to the value list.
    pub fn values_mut(&mut self) -> &mut Vec<String> {
        &mut self.values
    }

    /// The first value, if any.
    pub fn first_value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    /// Replaces all values with `value`.
    pub fn set_single(&mut self, value: impl Into<String>) {
        self.values.clear();
        self.values.push(value.into());
    }
}

/// An ordered field bag, keyed by field name for lookup.
///
/// The structure itself tolerates duplicate names (as received from the
/// server); lookups return the first match. [`Fields::set`] keeps names
/// unique by replacing in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    list: Vec<Field>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Looks up a field by name.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.list.iter().find(|f| f.name == name)
    }

    /// Looks up a field by name for mutation.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.list.iter_mut().find(|f| f.name == name)
    }

    /// Appends a field without checking for an existing one of the same name.
    pub fn push(&mut self, field: Field) {
        self.list.push(field);
    }

    /// Sets `name` to the single value `value`, replacing the values of an
    /// existing field or appending a new one.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        match self.get_mut(name) {
            Some(field) => field.set_single(value),
            None => self.list.push(Field::with_value(name, value)),
        }
    }

    /// Removes and returns the first field with the given name.
    pub fn remove(&mut self, name: &str) -> Option<Field> {
        let index = self.list.iter().position(|f| f.name == name)?;
        Some(self.list.remove(index))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.list.iter()
    }
}

impl<'a> IntoIterator for &'a Fields {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.iter()
    }
}

impl IntoIterator for Fields {
    type Item = Field;
    type IntoIter = std::vec::IntoIter<Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.into_iter()
    }
}

impl FromIterator<Field> for Fields {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Self {
            list: iter.into_iter().collect(),
        }
    }
}

/// A server record: a type tag such as `test`, `run` or `test-set-folder`
/// plus its field bag.
///
/// # Examples
///
/// ```
/// use alm_connector::{Entity, Field};
///
/// let mut run = Entity::new("run");
/// run.fields_mut().push(Field::with_value("id", "1017"));
/// run.fields_mut().set("status", "Passed");
///
/// assert_eq!(run.id().unwrap(), 1017);
/// assert_eq!(run.string_value("status").unwrap(), "Passed");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entity {
    entity_type: String,
    fields: Fields,
}

impl Entity {
    /// Creates an entity of the given type with no fields.
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            fields: Fields::new(),
        }
    }

    /// Creates an entity from an existing field bag.
    pub fn with_fields(entity_type: impl Into<String>, fields: Fields) -> Self {
        Self {
            entity_type: entity_type.into(),
            fields,
        }
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }

    /// Sets a single-valued field, replacing any previous values.
    pub fn set_value(&mut self, name: &str, value: impl Into<String>) {
        self.fields.set(name, value);
    }

    /// The numeric `id` field, or `0` if the entity has none yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFieldValue`] if the field holds something
    /// other than an integer.
    pub fn id(&self) -> Result<i64> {
        match self.first_value("id") {
            None => Ok(0),
            Some(_) => self.long_value("id"),
        }
    }

    /// The first value of `name`, if the field exists and is not empty.
    pub fn first_value(&self, name: &str) -> Option<&str> {
        self.fields.get(name)?.first_value()
    }

    /// The first value of `name` as a string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] if there is no such field or it has no values.
    pub fn string_value(&self, name: &str) -> Result<&str> {
        self.first_value(name)
            .ok_or_else(|| Error::MissingField(name.to_string()))
    }

    /// The first value of `name` parsed as an integer.
    pub fn long_value(&self, name: &str) -> Result<i64> {
        self.value(name)
    }

    /// The first value of `name` parsed into any `FromStr` type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] if the field is absent and
    /// [`Error::InvalidFieldValue`] if parsing fails.
    pub fn value<T>(&self, name: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.string_value(name)?;
        raw.trim().parse().map_err(|e: T::Err| Error::InvalidFieldValue {
            field: name.to_string(),
            value: raw.to_string(),
            reason: e.to_string(),
        })
    }
}
