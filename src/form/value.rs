use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use rust_decimal::Decimal;

use super::controller::{FormError, FormResult};

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FieldName(Arc<str>);

impl FieldName {
    pub fn new(value: impl Into<Arc<str>>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FieldName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for FieldName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FieldName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for FieldName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&FieldName> for FieldName {
    fn from(value: &FieldName) -> Self {
        value.clone()
    }
}

/// Whatever a field holds. Stored as given; nothing in the crate converts
/// between variants.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum FieldValue {
    #[default]
    Empty,
    Text(String),
    Number(Decimal),
    Bool(bool),
    List(Vec<String>),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Text(text) => text.is_empty(),
            FieldValue::Number(_) => false,
            FieldValue::Bool(value) => !value,
            FieldValue::List(items) => items.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            FieldValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<Decimal> for FieldValue {
    fn from(value: Decimal) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(Decimal::from(value))
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

pub trait FieldData: Sized {
    fn to_field_value(&self) -> FieldValue;
    fn from_field_value(value: &FieldValue) -> Option<Self>;
}

impl FieldData for String {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Text(self.clone())
    }

    fn from_field_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Text(text) => Some(text.clone()),
            FieldValue::Empty => Some(String::new()),
            _ => None,
        }
    }
}

impl FieldData for bool {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Bool(*self)
    }

    fn from_field_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Bool(value) => Some(*value),
            FieldValue::Empty => Some(false),
            _ => None,
        }
    }
}

impl FieldData for Decimal {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Number(*self)
    }

    fn from_field_value(value: &FieldValue) -> Option<Self> {
        value.as_number()
    }
}

impl FieldData for Vec<String> {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::List(self.clone())
    }

    fn from_field_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::List(items) => Some(items.clone()),
            FieldValue::Empty => Some(Vec::new()),
            _ => None,
        }
    }
}

impl<T> FieldData for Option<T>
where
    T: FieldData,
{
    fn to_field_value(&self) -> FieldValue {
        match self {
            Some(value) => value.to_field_value(),
            None => FieldValue::Empty,
        }
    }

    fn from_field_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Empty => Some(None),
            other => T::from_field_value(other).map(Some),
        }
    }
}

pub trait FormModel: Sized {
    type Fields;

    fn fields() -> Self::Fields;
    fn to_values(&self) -> BTreeMap<FieldName, FieldValue>;
    fn from_values(values: &BTreeMap<FieldName, FieldValue>) -> FormResult<Self>;
}

#[doc(hidden)]
pub fn read_field<T>(values: &BTreeMap<FieldName, FieldValue>, name: &str) -> FormResult<T>
where
    T: FieldData,
{
    let value = values.get(name).cloned().unwrap_or_default();
    T::from_field_value(&value).ok_or_else(|| FormError::FieldTypeMismatch {
        field: FieldName::new(name),
    })
}
