use regex::Regex;
use rust_decimal::Decimal;

use super::controller::{FormError, FormResult};
use super::messages::{ValidationMessages, ValidationRule};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum InputType {
    #[default]
    Text,
    Email,
    Url,
    Number,
    Password,
    Select,
    Switch,
}

#[derive(Clone, Debug, Default)]
pub struct FieldConstraints {
    pub required: bool,
    pub input_type: InputType,
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Regex>,
    pub messages: ValidationMessages,
}

impl FieldConstraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, value: bool) -> Self {
        self.required = value;
        self
    }

    pub fn input_type(mut self, value: InputType) -> Self {
        self.input_type = value;
        self
    }

    pub fn min(mut self, value: impl Into<Decimal>) -> Self {
        self.min = Some(value.into());
        self
    }

    pub fn max(mut self, value: impl Into<Decimal>) -> Self {
        self.max = Some(value.into());
        self
    }

    pub fn min_length(mut self, value: usize) -> Self {
        self.min_length = Some(value);
        self
    }

    pub fn max_length(mut self, value: usize) -> Self {
        self.max_length = Some(value);
        self
    }

    pub fn pattern(mut self, value: Regex) -> Self {
        self.pattern = Some(value);
        self
    }

    pub fn try_pattern(self, value: &str) -> FormResult<Self> {
        let regex =
            Regex::new(value).map_err(|error| FormError::InvalidPattern(error.to_string()))?;
        Ok(self.pattern(regex))
    }

    pub fn message(mut self, rule: ValidationRule, template: impl Into<String>) -> Self {
        self.messages.set(rule, template);
        self
    }

    pub fn messages(mut self, value: ValidationMessages) -> Self {
        self.messages = value;
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &FieldConstraints::default()
    }
}

impl PartialEq for FieldConstraints {
    fn eq(&self, other: &Self) -> bool {
        self.required == other.required
            && self.input_type == other.input_type
            && self.min == other.min
            && self.max == other.max
            && self.min_length == other.min_length
            && self.max_length == other.max_length
            && self.pattern.as_ref().map(Regex::as_str)
                == other.pattern.as_ref().map(Regex::as_str)
            && self.messages == other.messages
    }
}
