use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, trace};

use super::constraints::FieldConstraints;
use super::controller::{FieldMeta, FormError, FormResult, ValidationTicket, read_lock, write_lock};
use super::validation::{CustomValidator, FieldError, ValidatorFn, compose};
use super::value::FieldValue;
use crate::contracts::ControlHandle;
use crate::id::FieldId;

#[derive(Clone, Debug, Default)]
pub struct FormControlOptions {
    pub id: Option<FieldId>,
    pub initial_value: FieldValue,
    pub disabled: bool,
    pub required: bool,
    pub constraints: FieldConstraints,
    pub custom: Option<CustomValidator>,
}

impl FormControlOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, value: impl Into<std::sync::Arc<str>>) -> Self {
        self.id = Some(FieldId::new(value));
        self
    }

    pub fn initial_value(mut self, value: impl Into<FieldValue>) -> Self {
        self.initial_value = value.into();
        self
    }

    pub fn disabled(mut self, value: bool) -> Self {
        self.disabled = value;
        self
    }

    pub fn required(mut self, value: bool) -> Self {
        self.required = value;
        self
    }

    pub fn constraints(mut self, value: FieldConstraints) -> Self {
        self.constraints = value;
        self
    }

    pub fn custom(mut self, value: CustomValidator) -> Self {
        self.custom = Some(value);
        self
    }
}

struct ControlState {
    mounted: bool,
    value: FieldValue,
    initial: FieldValue,
    error: Option<FieldError>,
    meta: FieldMeta,
    ticket: ValidationTicket,
    disabled: bool,
    required: bool,
    constraints: FieldConstraints,
    custom: Option<CustomValidator>,
    own_validator: ValidatorFn,
    field_validator: Option<ValidatorFn>,
    controls: Vec<ControlHandle>,
}

impl ControlState {
    fn validator(&self) -> ValidatorFn {
        self.field_validator
            .clone()
            .unwrap_or_else(|| self.own_validator.clone())
    }

    fn recompose(&mut self) {
        let constraints = self
            .constraints
            .clone()
            .required(self.constraints.required || self.required);
        self.own_validator = compose(&constraints, self.custom.clone());
    }
}

/// Authority for exactly one field. Clones share the same state.
#[derive(Clone)]
pub struct FormControl {
    field_id: FieldId,
    state: Arc<RwLock<ControlState>>,
}

impl FormControl {
    pub fn new(options: FormControlOptions) -> Self {
        let field_id = options
            .id
            .unwrap_or_else(|| FieldId::allocate("calm-control"));
        let mut state = ControlState {
            mounted: true,
            value: options.initial_value.clone(),
            initial: options.initial_value,
            error: None,
            meta: FieldMeta::default(),
            ticket: ValidationTicket::default(),
            disabled: options.disabled,
            required: options.required,
            constraints: options.constraints,
            custom: options.custom,
            own_validator: compose(&FieldConstraints::default(), None),
            field_validator: None,
            controls: Vec::new(),
        };
        state.recompose();
        Self {
            field_id,
            state: Arc::new(RwLock::new(state)),
        }
    }

    pub fn field_id(&self) -> &FieldId {
        &self.field_id
    }

    pub fn is_mounted(&self) -> bool {
        self.state.read().is_ok_and(|state| state.mounted)
    }

    pub fn unmount(&self) -> FormResult<()> {
        let mut state = write_lock(&self.state, "unmounting form control")?;
        state.mounted = false;
        state.controls.clear();
        state.field_validator = None;
        debug!(control = %self.field_id, "form control unmounted");
        Ok(())
    }

    pub fn value(&self) -> FormResult<FieldValue> {
        Ok(self.read_state("reading control value")?.value.clone())
    }

    pub fn error(&self) -> FormResult<Option<FieldError>> {
        Ok(self.read_state("reading control error")?.error.clone())
    }

    pub fn visible_error(&self) -> FormResult<Option<FieldError>> {
        let state = self.read_state("reading visible control error")?;
        Ok(state.error.clone().filter(|_| state.meta.touched))
    }

    pub fn meta(&self) -> FormResult<FieldMeta> {
        Ok(self.read_state("reading control meta")?.meta)
    }

    pub fn is_valid(&self) -> FormResult<bool> {
        Ok(self.read_state("reading control validity")?.error.is_none())
    }

    pub fn is_disabled(&self) -> FormResult<bool> {
        Ok(self.read_state("reading control disabled flag")?.disabled)
    }

    pub fn is_required(&self) -> FormResult<bool> {
        Ok(self.read_state("reading control required flag")?.required)
    }

    pub fn set_disabled(&self, disabled: bool) -> FormResult<()> {
        self.write_state("setting control disabled flag")?.disabled = disabled;
        Ok(())
    }

    pub fn set_required(&self, required: bool) -> FormResult<()> {
        let mut state = self.write_state("setting control required flag")?;
        state.required = required;
        state.recompose();
        Ok(())
    }

    /// Stores the value and re-validates it. A result that arrives after a
    /// newer `set_value`/`validate` started is dropped.
    pub async fn set_value(&self, value: impl Into<FieldValue>) -> FormResult<()> {
        let value = value.into();
        {
            let mut state = self.write_state("setting control value")?;
            state.value = value.clone();
            state.meta.dirty = state.value != state.initial;
        }
        self.run_validation(value).await
    }

    pub async fn validate(&self) -> FormResult<()> {
        let value = self.value()?;
        self.run_validation(value).await
    }

    pub fn set_touched(&self, touched: bool) -> FormResult<()> {
        self.write_state("setting control touched")?.meta.touched = touched;
        Ok(())
    }

    pub fn register_control(&self, handle: ControlHandle) -> FormResult<()> {
        let mut state = self.write_state("registering control element")?;
        if !state.controls.iter().any(|known| known.same_as(&handle)) {
            state.controls.push(handle);
            trace!(control = %self.field_id, "control element registered");
        }
        Ok(())
    }

    pub fn unregister_control(&self, handle: &ControlHandle) -> FormResult<()> {
        let mut state = self.write_state("unregistering control element")?;
        state.controls.retain(|known| !known.same_as(handle));
        Ok(())
    }

    pub fn registered_controls(&self) -> FormResult<usize> {
        Ok(self.read_state("counting control elements")?.controls.len())
    }

    /// Replaces the control's own validator with one supplied by the field
    /// it wraps.
    pub fn register_validator(&self, validator: ValidatorFn) -> FormResult<()> {
        self.write_state("registering control validator")?.field_validator = Some(validator);
        Ok(())
    }

    pub fn unregister_validator(&self) -> FormResult<()> {
        self.write_state("unregistering control validator")?.field_validator = None;
        Ok(())
    }

    pub fn focus(&self) -> FormResult<bool> {
        let handle = self
            .read_state("reading control elements")?
            .controls
            .first()
            .cloned();
        let Some(handle) = handle else {
            return Ok(false);
        };
        handle.focus();
        Ok(true)
    }

    async fn run_validation(&self, value: FieldValue) -> FormResult<()> {
        let (validator, ticket) = {
            let mut state = self.write_state("starting control validation")?;
            state.ticket = state.ticket.next();
            state.meta.validating = true;
            (state.validator(), state.ticket)
        };

        let outcome = validator(value).await;

        let mut state = write_lock(&self.state, "finishing control validation")?;
        if !state.mounted || state.ticket != ticket {
            debug!(
                control = %self.field_id,
                ticket = ticket.0,
                "discarding stale control validation result"
            );
            return outcome.map(|_| ());
        }
        state.meta.validating = false;
        state.error = outcome?;
        Ok(())
    }

    fn read_state(&self, context: &'static str) -> FormResult<RwLockReadGuard<'_, ControlState>> {
        let state = read_lock(&self.state, context)?;
        if !state.mounted {
            return Err(FormError::ScopeUnmounted("form control"));
        }
        Ok(state)
    }

    fn write_state(
        &self,
        context: &'static str,
    ) -> FormResult<RwLockWriteGuard<'_, ControlState>> {
        let state = write_lock(&self.state, context)?;
        if !state.mounted {
            return Err(FormError::ScopeUnmounted("form control"));
        }
        Ok(state)
    }
}

impl std::fmt::Debug for FormControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormControl")
            .field("field_id", &self.field_id)
            .field("mounted", &self.is_mounted())
            .finish_non_exhaustive()
    }
}
