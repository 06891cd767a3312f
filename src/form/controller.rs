use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::value::FieldName;

static FORM_ID_ALLOCATOR: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FormId(pub u64);

impl FormId {
    pub fn next() -> Self {
        Self(FORM_ID_ALLOCATOR.fetch_add(1, Ordering::SeqCst))
    }
}

impl Display for FormId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "form-{}", self.0)
    }
}

/// Generation of one validation run for one field. Only the run holding the
/// latest ticket may commit its result.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ValidationTicket(pub u64);

impl ValidationTicket {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubmitState {
    Idle,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValidationMode {
    OnChange,
    OnBlur,
    OnSubmit,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FormOptions {
    pub validate_mode: ValidationMode,
    pub focus_first_error_on_submit: bool,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            validate_mode: ValidationMode::OnBlur,
            focus_first_error_on_submit: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FieldMeta {
    pub touched: bool,
    pub dirty: bool,
    pub validating: bool,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FormError {
    StatePoisoned(&'static str),
    ScopeUnmounted(&'static str),
    ValidatorFault { field: Option<FieldName>, message: String },
    InvalidPattern(String),
    FieldTypeMismatch { field: FieldName },
    InvalidStateTransition { from: SubmitState, to: SubmitState },
    AlreadySubmitting,
    SubmitFailed(String),
}

impl FormError {
    pub(super) fn for_field(self, name: &FieldName) -> Self {
        match self {
            FormError::ValidatorFault {
                field: None,
                message,
            } => FormError::ValidatorFault {
                field: Some(name.clone()),
                message,
            },
            other => other,
        }
    }
}

impl Display for FormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormError::StatePoisoned(context) => {
                write!(f, "form state lock poisoned while {context}")
            }
            FormError::ScopeUnmounted(scope) => {
                write!(f, "{scope} was used after it was unmounted")
            }
            FormError::ValidatorFault {
                field: Some(field),
                message,
            } => write!(f, "validator for field `{field}` failed: {message}"),
            FormError::ValidatorFault {
                field: None,
                message,
            } => write!(f, "validator failed: {message}"),
            FormError::InvalidPattern(error) => write!(f, "invalid validation pattern: {error}"),
            FormError::FieldTypeMismatch { field } => {
                write!(f, "field `{field}` holds a value of an unexpected type")
            }
            FormError::InvalidStateTransition { from, to } => {
                write!(f, "invalid submit state transition: {from:?} -> {to:?}")
            }
            FormError::AlreadySubmitting => f.write_str("form submit is already in progress"),
            FormError::SubmitFailed(error) => write!(f, "submit handler failed: {error}"),
        }
    }
}

impl std::error::Error for FormError {}

pub type FormResult<T> = Result<T, FormError>;

pub(super) fn transition_submit_state(
    current: &mut SubmitState,
    next: SubmitState,
) -> FormResult<()> {
    if *current == next {
        return Ok(());
    }

    let allowed = matches!(
        (*current, next),
        (SubmitState::Idle, SubmitState::Validating)
            | (SubmitState::Validating, SubmitState::Submitting)
            | (SubmitState::Validating, SubmitState::Failed)
            | (SubmitState::Submitting, SubmitState::Succeeded)
            | (SubmitState::Submitting, SubmitState::Failed)
            | (SubmitState::Succeeded, SubmitState::Validating)
            | (SubmitState::Failed, SubmitState::Validating)
            | (_, SubmitState::Idle)
    );
    if !allowed {
        return Err(FormError::InvalidStateTransition {
            from: *current,
            to: next,
        });
    }
    *current = next;
    Ok(())
}

pub(super) fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| FormError::StatePoisoned(context))
}

pub(super) fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| FormError::StatePoisoned(context))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_transitions_follow_the_table() {
        let mut state = SubmitState::Idle;
        transition_submit_state(&mut state, SubmitState::Validating).expect("idle -> validating");
        transition_submit_state(&mut state, SubmitState::Submitting)
            .expect("validating -> submitting");
        assert_eq!(
            transition_submit_state(&mut state, SubmitState::Validating),
            Err(FormError::InvalidStateTransition {
                from: SubmitState::Submitting,
                to: SubmitState::Validating,
            })
        );
        transition_submit_state(&mut state, SubmitState::Idle).expect("anything -> idle");
        assert_eq!(state, SubmitState::Idle);
    }

    #[test]
    fn validator_fault_picks_up_field_name() {
        let error = FormError::ValidatorFault {
            field: None,
            message: "boom".into(),
        }
        .for_field(&FieldName::from("email"));
        assert_eq!(
            error.to_string(),
            "validator for field `email` failed: boom"
        );
    }
}
