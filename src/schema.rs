//! Declarative field tables and the validation rules driven by them.
//!
//! Every record shape lists its fields once, in a static [`FieldSpec`] table. The store never
//! looks at a concrete struct while validating; it asks the candidate for each declared field
//! through the [`Fields`] trait and receives a [`Slot`] describing what was supplied.
use serde::{Deserialize, Deserializer};

use crate::error::{Reason, ValidationError};

/// How a field participates in validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// must be present and no two records may share a value
    RequiredUnique,
    /// must be present, no cross-record constraint
    Required,
    /// may be absent or null
    Optional,
}

impl FieldKind {
    /// true for both required kinds
    pub fn is_required(self) -> bool {
        !matches!(self, FieldKind::Optional)
    }
}

/// Format rules that can be attached to a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `local@domain.tld` shape
    Email,
}

impl Format {
    /// returns true if `value` satisfies this format
    pub fn accepts(self, value: &Value<'_>) -> bool {
        match (self, value) {
            (Format::Email, Value::Text(text)) => is_email(text),
            (Format::Email, _) => false,
        }
    }
}

/// One row of a record's schema table
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// the field name, as it appears on the wire
    pub name: &'static str,
    /// required/unique/optional
    pub kind: FieldKind,
    /// optional format rule checked before uniqueness
    pub format: Option<Format>,
}

impl FieldSpec {
    /// a required field that must be unique across the collection
    pub const fn unique(name: &'static str, format: Option<Format>) -> Self {
        FieldSpec { name, kind: FieldKind::RequiredUnique, format }
    }

    /// a required field
    pub const fn required(name: &'static str) -> Self {
        FieldSpec { name, kind: FieldKind::Required, format: None }
    }

    /// an optional field
    pub const fn optional(name: &'static str) -> Self {
        FieldSpec { name, kind: FieldKind::Optional, format: None }
    }
}

/// A borrowed, typed view of a single field value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    /// string fields
    Text(&'a str),
    /// integer fields
    Integer(i64),
    /// floating point fields
    Float(f64),
}

impl Value<'_> {
    /// text that is empty once trimmed counts as "not supplied"
    pub fn is_blank(&self) -> bool {
        matches!(self, Value::Text(text) if text.trim().is_empty())
    }

    /// equality used by uniqueness checks. Text compares exactly, case included, once
    /// surrounding whitespace is trimmed, matching how required checks treat blank text.
    pub fn same_as(&self, other: &Value<'_>) -> bool {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a.trim() == b.trim(),
            _ => self == other,
        }
    }

    /// compares this value against a query string taken from a request.
    ///
    /// Text compares case-insensitively. Numbers compare numerically; a query that does not
    /// parse as a number never matches.
    pub fn matches(&self, query: &str) -> bool {
        match self {
            Value::Text(text) => text.to_lowercase() == query.to_lowercase(),
            Value::Integer(n) => query.trim().parse::<i64>().map_or(false, |q| q == *n),
            Value::Float(x) => query.trim().parse::<f64>().map_or(false, |q| q == *x),
        }
    }
}

/// What a candidate, patch or stored record holds for a field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slot<'a> {
    /// the field was not mentioned at all (patches only)
    Absent,
    /// the field was mentioned with no value
    Null,
    /// the field holds a value
    Value(Value<'a>),
}

impl<'a> Slot<'a> {
    /// slot for a field that always holds a value
    pub fn of<T: AsValue>(value: &'a T) -> Self {
        Slot::Value(value.as_value())
    }

    /// slot for a nullable field
    pub fn of_option<T: AsValue>(value: &'a Option<T>) -> Self {
        match value {
            Some(value) => Slot::of(value),
            None => Slot::Null,
        }
    }

    /// slot for a patch field, where the outer `Option` records whether it was mentioned
    pub fn of_patch<T: AsValue>(value: &'a Option<Option<T>>) -> Self {
        match value {
            Some(inner) => Slot::of_option(inner),
            None => Slot::Absent,
        }
    }

    /// the value held by this slot, if any
    pub fn value(&self) -> Option<Value<'a>> {
        match self {
            Slot::Value(value) => Some(*value),
            _ => None,
        }
    }

    /// absent, null, or blank text
    pub fn is_missing(&self) -> bool {
        match self {
            Slot::Value(value) => value.is_blank(),
            _ => true,
        }
    }
}

/// Field types that can be viewed as a [`Value`]
pub trait AsValue {
    /// borrow as a [`Value`]
    fn as_value(&self) -> Value<'_>;
}

impl AsValue for String {
    fn as_value(&self) -> Value<'_> {
        Value::Text(self)
    }
}

impl AsValue for i64 {
    fn as_value(&self) -> Value<'_> {
        Value::Integer(*self)
    }
}

impl AsValue for f64 {
    fn as_value(&self) -> Value<'_> {
        Value::Float(*self)
    }
}

/// Name-based field access, implemented by records, drafts and patches.
pub trait Fields {
    /// returns the slot for `name`; undeclared names are [`Slot::Absent`]
    fn field(&self, name: &str) -> Slot<'_>;
}

/// Validates a full candidate (insert or replace).
///
/// Runs the three passes in order and reports the first failure: every required field is
/// present, every unique field passes its format rule, no unique value is held by one of
/// `others`. The caller leaves the record being replaced out of `others`.
pub fn validate_full<'r, C, R, I>(
    schema: &[FieldSpec],
    candidate: &C,
    others: I,
) -> Result<(), ValidationError>
where
    C: Fields,
    R: Fields + 'r,
    I: IntoIterator<Item = &'r R> + Clone,
{
    for spec in schema.iter().filter(|spec| spec.kind.is_required()) {
        if candidate.field(spec.name).is_missing() {
            return Err(ValidationError::new(spec.name, Reason::Missing));
        }
    }

    for spec in unique_fields(schema) {
        check_format(spec, candidate.field(spec.name))?;
    }

    for spec in unique_fields(schema) {
        check_unique(spec, candidate.field(spec.name), others.clone())?;
    }

    Ok(())
}

/// Validates a partial update, field by field in schema order.
///
/// Fields the patch does not mention are skipped. Required fields may not be cleared; unique
/// fields are format-checked and then checked against `others`.
pub fn validate_patch<'r, P, R, I>(
    schema: &[FieldSpec],
    patch: &P,
    others: I,
) -> Result<(), ValidationError>
where
    P: Fields,
    R: Fields + 'r,
    I: IntoIterator<Item = &'r R> + Clone,
{
    for spec in schema {
        let slot = patch.field(spec.name);
        if slot == Slot::Absent {
            continue;
        }
        if spec.kind.is_required() && slot.is_missing() {
            return Err(ValidationError::new(spec.name, Reason::Missing));
        }
        if spec.kind == FieldKind::RequiredUnique {
            check_format(spec, slot)?;
            check_unique(spec, slot, others.clone())?;
        }
    }
    Ok(())
}

fn unique_fields(schema: &[FieldSpec]) -> impl Iterator<Item = &FieldSpec> {
    schema
        .iter()
        .filter(|spec| spec.kind == FieldKind::RequiredUnique)
}

fn check_format(spec: &FieldSpec, slot: Slot<'_>) -> Result<(), ValidationError> {
    match (spec.format, slot.value()) {
        (Some(format), Some(value)) if !format.accepts(&value) => {
            Err(ValidationError::new(spec.name, Reason::Malformed))
        }
        _ => Ok(()),
    }
}

fn check_unique<'r, R, I>(spec: &FieldSpec, slot: Slot<'_>, others: I) -> Result<(), ValidationError>
where
    R: Fields + 'r,
    I: IntoIterator<Item = &'r R>,
{
    let value = match slot.value() {
        Some(value) => value,
        None => return Ok(()),
    };
    if others
        .into_iter()
        .any(|other| {
            other
                .field(spec.name)
                .value()
                .map_or(false, |stored| stored.same_as(&value))
        })
    {
        return Err(ValidationError::new(spec.name, Reason::Duplicate));
    }
    Ok(())
}

/// single `@`, non-empty local part, a dot inside the domain, no whitespace
fn is_email(text: &str) -> bool {
    if text.chars().any(char::is_whitespace) {
        return false;
    }
    match text.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .map_or(false, |(host, _)| !host.is_empty())
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Deserializes a field that is present in the payload (even as `null`) into `Some(..)`.
///
/// Combined with `#[serde(default)]` this distinguishes "not mentioned" (`None`) from
/// "explicitly null" (`Some(None)`).
pub(crate) fn present<'de, T, D>(de: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}
