use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;

use super::constraints::{FieldConstraints, InputType};
use super::controller::{FormError, FormResult};
use super::messages::ValidationRule;
use super::value::FieldValue;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    Required,
    Format,
    Range,
    Length,
    Pattern,
    Custom,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldError {
    pub kind: ErrorKind,
    pub message: String,
}

impl FieldError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

pub type ValidationOutcome = FormResult<Option<FieldError>>;

pub type BoxedValidationFuture<'a, T = ValidationOutcome> =
    Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type ValidatorFn = Arc<dyn Fn(FieldValue) -> BoxedValidationFuture<'static> + Send + Sync>;

/// A fault raised by a custom validator. Faults are bugs in the validator,
/// not user input problems, and surface as [`FormError::ValidatorFault`].
pub type ValidatorFault = Box<dyn std::error::Error + Send + Sync>;

pub type CustomResult = Result<Option<String>, ValidatorFault>;

type CustomFn = dyn Fn(FieldValue) -> BoxedValidationFuture<'static, CustomResult> + Send + Sync;

#[derive(Clone)]
pub struct CustomValidator(Arc<CustomFn>);

impl CustomValidator {
    pub fn new<F>(validate: F) -> Self
    where
        F: Fn(&FieldValue) -> Option<String> + Send + Sync + 'static,
    {
        Self(Arc::new(
            move |value: FieldValue| -> BoxedValidationFuture<'static, CustomResult> {
                let result = validate(&value);
                Box::pin(async move { Ok(result) })
            },
        ))
    }

    pub fn fallible<F>(validate: F) -> Self
    where
        F: Fn(&FieldValue) -> CustomResult + Send + Sync + 'static,
    {
        Self(Arc::new(
            move |value: FieldValue| -> BoxedValidationFuture<'static, CustomResult> {
                let result = validate(&value);
                Box::pin(async move { result })
            },
        ))
    }

    pub fn future<F, Fut>(validate: F) -> Self
    where
        F: Fn(FieldValue) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CustomResult> + Send + 'static,
    {
        Self(Arc::new(
            move |value: FieldValue| -> BoxedValidationFuture<'static, CustomResult> {
                Box::pin(validate(value))
            },
        ))
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    async fn run(&self, value: FieldValue) -> CustomResult {
        (self.0)(value).await
    }
}

impl std::fmt::Debug for CustomValidator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("CustomValidator(..)")
    }
}

pub fn compose(constraints: &FieldConstraints, custom: Option<CustomValidator>) -> ValidatorFn {
    let constraints = Arc::new(constraints.clone());
    Arc::new(move |value: FieldValue| -> BoxedValidationFuture<'static> {
        let constraints = constraints.clone();
        let custom = custom.clone();
        Box::pin(async move {
            if let Some(error) = validate_builtin(&constraints, &value) {
                return Ok(Some(error));
            }
            let Some(custom) = custom else {
                return Ok(None);
            };
            match custom.run(value).await {
                Ok(message) => {
                    Ok(message.map(|message| FieldError::new(ErrorKind::Custom, message)))
                }
                Err(fault) => Err(FormError::ValidatorFault {
                    field: None,
                    message: fault.to_string(),
                }),
            }
        })
    })
}

/// Runs the built-in rules in order: required, format, range, length,
/// pattern. Empty values only ever fail `required`.
pub fn validate_builtin(constraints: &FieldConstraints, value: &FieldValue) -> Option<FieldError> {
    let messages = &constraints.messages;

    if value.is_empty() {
        return constraints.required.then(|| {
            FieldError::new(
                ErrorKind::Required,
                messages.render(ValidationRule::Required, &[]),
            )
        });
    }

    if let Some(rule) = format_violation(constraints.input_type, value) {
        return Some(FieldError::new(ErrorKind::Format, messages.render(rule, &[])));
    }

    if constraints.input_type == InputType::Number {
        if let Some(number) = numeric_value(value) {
            if let Some(min) = constraints.min.filter(|min| number < *min) {
                let min = min.normalize().to_string();
                return Some(FieldError::new(
                    ErrorKind::Range,
                    messages.render(ValidationRule::Min, &[("min", &min)]),
                ));
            }
            if let Some(max) = constraints.max.filter(|max| number > *max) {
                let max = max.normalize().to_string();
                return Some(FieldError::new(
                    ErrorKind::Range,
                    messages.render(ValidationRule::Max, &[("max", &max)]),
                ));
            }
        }
    }

    if let Some(length) = measured_length(value) {
        if let Some(min) = constraints.min_length.filter(|min| length < *min) {
            return Some(FieldError::new(
                ErrorKind::Length,
                messages.render(ValidationRule::MinLength, &[("length", &min.to_string())]),
            ));
        }
        if let Some(max) = constraints.max_length.filter(|max| length > *max) {
            return Some(FieldError::new(
                ErrorKind::Length,
                messages.render(ValidationRule::MaxLength, &[("length", &max.to_string())]),
            ));
        }
    }

    if let (Some(pattern), Some(text)) = (&constraints.pattern, value.as_text()) {
        if !pattern.is_match(text) {
            return Some(FieldError::new(
                ErrorKind::Pattern,
                messages.render(ValidationRule::Pattern, &[]),
            ));
        }
    }

    None
}

fn format_violation(input_type: InputType, value: &FieldValue) -> Option<ValidationRule> {
    let text = value.as_text()?;
    match input_type {
        InputType::Email if !text.contains('@') => Some(ValidationRule::Email),
        InputType::Url if url::Url::parse(text).is_err() => Some(ValidationRule::Url),
        InputType::Number if Decimal::from_str(text.trim()).is_err() => {
            Some(ValidationRule::Number)
        }
        _ => None,
    }
}

fn numeric_value(value: &FieldValue) -> Option<Decimal> {
    match value {
        FieldValue::Number(number) => Some(*number),
        FieldValue::Text(text) => Decimal::from_str(text.trim()).ok(),
        _ => None,
    }
}

fn measured_length(value: &FieldValue) -> Option<usize> {
    match value {
        FieldValue::Text(text) => Some(text.chars().count()),
        FieldValue::List(items) => Some(items.len()),
        _ => None,
    }
}
