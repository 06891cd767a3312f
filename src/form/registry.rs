use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use futures::future::join_all;
use futures_timer::Delay;
use tracing::{debug, trace};

use super::controller::{
    FieldMeta, FormError, FormId, FormOptions, FormResult, SubmitState, ValidationTicket,
    read_lock, transition_submit_state, write_lock,
};
use super::validation::{FieldError, ValidationOutcome, ValidatorFn};
use super::value::{FieldName, FieldValue, FormModel};
use crate::contracts::ControlHandle;

#[derive(Clone, Debug, PartialEq)]
pub struct FieldSnapshot {
    pub value: FieldValue,
    pub error: Option<FieldError>,
    pub meta: FieldMeta,
}

#[derive(Clone, Debug)]
pub struct FormSnapshot {
    pub id: FormId,
    pub values: BTreeMap<FieldName, FieldValue>,
    pub submit_state: SubmitState,
    pub submit_count: u32,
    pub is_dirty: bool,
    pub is_valid: bool,
    pub fields: BTreeMap<FieldName, FieldSnapshot>,
}

#[derive(Clone)]
struct RegisteredValidator {
    validator: ValidatorFn,
    debounce: Duration,
}

struct FieldEntry {
    value: FieldValue,
    initial: FieldValue,
    error: Option<FieldError>,
    meta: FieldMeta,
}

impl FieldEntry {
    fn new(initial: FieldValue) -> Self {
        Self {
            value: initial.clone(),
            initial,
            error: None,
            meta: FieldMeta::default(),
        }
    }

    fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot {
            value: self.value.clone(),
            error: self.error.clone(),
            meta: self.meta,
        }
    }
}

struct FormState {
    id: FormId,
    mounted: bool,
    submit_state: SubmitState,
    submit_count: u32,
    initial_values: BTreeMap<FieldName, FieldValue>,
    fields: BTreeMap<FieldName, FieldEntry>,
    tickets: BTreeMap<FieldName, ValidationTicket>,
}

impl FormState {
    fn ensure_field(&mut self, name: &FieldName) -> &mut FieldEntry {
        let initial_values = &self.initial_values;
        self.fields.entry(name.clone()).or_insert_with(|| {
            FieldEntry::new(initial_values.get(name).cloned().unwrap_or_default())
        })
    }

    fn next_ticket(&mut self, name: &FieldName) -> ValidationTicket {
        let next = self.tickets.get(name).copied().unwrap_or_default().next();
        self.tickets.insert(name.clone(), next);
        next
    }

    fn is_latest(&self, name: &FieldName, ticket: ValidationTicket) -> bool {
        self.tickets.get(name).copied() == Some(ticket)
    }

    fn values(&self) -> BTreeMap<FieldName, FieldValue> {
        let mut values = self.initial_values.clone();
        for (name, field) in &self.fields {
            values.insert(name.clone(), field.value.clone());
        }
        values
    }

    fn shows_error(&self, field: &FieldEntry) -> bool {
        field.error.is_some() && (field.meta.touched || self.submit_count > 0)
    }
}

/// Multi-field form store. Clones share the same state; every mutation goes
/// through the methods below.
#[derive(Clone)]
pub struct FormRegistry {
    options: FormOptions,
    state: Arc<RwLock<FormState>>,
    validators: Arc<RwLock<BTreeMap<FieldName, RegisteredValidator>>>,
    focus_handles: Arc<RwLock<BTreeMap<FieldName, ControlHandle>>>,
}

impl FormRegistry {
    pub fn new(options: FormOptions) -> Self {
        Self::with_initial_values(options, BTreeMap::new())
    }

    pub fn with_initial_values(
        options: FormOptions,
        initial_values: BTreeMap<FieldName, FieldValue>,
    ) -> Self {
        Self {
            options,
            state: Arc::new(RwLock::new(FormState {
                id: FormId::next(),
                mounted: true,
                submit_state: SubmitState::Idle,
                submit_count: 0,
                initial_values,
                fields: BTreeMap::new(),
                tickets: BTreeMap::new(),
            })),
            validators: Arc::new(RwLock::new(BTreeMap::new())),
            focus_handles: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    pub fn from_model<M>(model: &M, options: FormOptions) -> Self
    where
        M: FormModel,
    {
        Self::with_initial_values(options, model.to_values())
    }

    pub fn options(&self) -> FormOptions {
        self.options
    }

    pub fn id(&self) -> FormResult<FormId> {
        Ok(self.read_state("reading form id")?.id)
    }

    pub fn is_mounted(&self) -> bool {
        self.state.read().is_ok_and(|state| state.mounted)
    }

    /// Drops every field entry and validator. Any later call fails with
    /// [`FormError::ScopeUnmounted`].
    pub fn dispose(&self) -> FormResult<()> {
        {
            let mut state = write_lock(&self.state, "disposing form")?;
            state.mounted = false;
            state.fields.clear();
            state.tickets.clear();
            debug!(form = %state.id, "form disposed");
        }
        write_lock(&self.validators, "clearing validators on dispose")?.clear();
        write_lock(&self.focus_handles, "clearing focus handles on dispose")?.clear();
        Ok(())
    }

    pub fn register_field(
        &self,
        name: impl Into<FieldName>,
        validator: ValidatorFn,
    ) -> FormResult<()> {
        self.register_field_debounced(name, validator, Duration::ZERO)
    }

    pub fn register_field_debounced(
        &self,
        name: impl Into<FieldName>,
        validator: ValidatorFn,
        debounce: Duration,
    ) -> FormResult<()> {
        let name = name.into();
        {
            let mut state = self.write_state("registering field")?;
            state.ensure_field(&name);
            trace!(form = %state.id, field = %name, "field validator registered");
        }
        write_lock(&self.validators, "registering field validator")?.insert(
            name,
            RegisteredValidator {
                validator,
                debounce,
            },
        );
        Ok(())
    }

    pub fn unregister_field(&self, name: &FieldName) -> FormResult<()> {
        let form = self.id()?;
        write_lock(&self.validators, "unregistering field validator")?.remove(name);
        write_lock(&self.focus_handles, "unregistering focus handle")?.remove(name);
        trace!(form = %form, field = %name, "field validator unregistered");
        Ok(())
    }

    pub fn is_registered(&self, name: &FieldName) -> FormResult<bool> {
        Ok(read_lock(&self.validators, "checking field registration")?.contains_key(name))
    }

    pub fn registered_fields(&self) -> FormResult<Vec<FieldName>> {
        Ok(read_lock(&self.validators, "listing registered fields")?
            .keys()
            .cloned()
            .collect())
    }

    pub fn register_focus_handle(
        &self,
        name: impl Into<FieldName>,
        handle: ControlHandle,
    ) -> FormResult<()> {
        let form = self.id()?;
        let name = name.into();
        trace!(form = %form, field = %name, "focus handle registered");
        write_lock(&self.focus_handles, "registering focus handle")?.insert(name, handle);
        Ok(())
    }

    pub fn set_field_value(
        &self,
        name: impl Into<FieldName>,
        value: impl Into<FieldValue>,
    ) -> FormResult<()> {
        let name = name.into();
        let mut state = self.write_state("setting field value")?;
        let field = state.ensure_field(&name);
        field.value = value.into();
        field.meta.dirty = field.value != field.initial;
        Ok(())
    }

    pub fn set_field_touched(&self, name: impl Into<FieldName>, touched: bool) -> FormResult<()> {
        let name = name.into();
        let mut state = self.write_state("setting field touched")?;
        state.ensure_field(&name).meta.touched = touched;
        Ok(())
    }

    /// Runs the registered validator against `value` and stores the result,
    /// unless a newer validation for the same field started in the meantime.
    pub async fn validate_field(
        &self,
        name: impl Into<FieldName>,
        value: impl Into<FieldValue>,
    ) -> FormResult<()> {
        let name = name.into();
        let value = value.into();
        let registered = read_lock(&self.validators, "reading field validator")?
            .get(&name)
            .cloned();
        let ticket = {
            let mut state = self.write_state("starting field validation")?;
            let ticket = state.next_ticket(&name);
            state.ensure_field(&name).meta.validating = registered.is_some();
            ticket
        };

        let Some(registered) = registered else {
            return self.finish_validation(&name, ticket, Ok(None));
        };

        if !registered.debounce.is_zero() {
            Delay::new(registered.debounce).await;
            if !self.is_latest_ticket(&name, ticket)? {
                trace!(field = %name, ticket = ticket.0, "debounced validation superseded");
                return Ok(());
            }
        }

        let outcome = (registered.validator)(value).await;
        self.finish_validation(&name, ticket, outcome)
    }

    pub fn field_error(&self, name: &FieldName) -> FormResult<Option<FieldError>> {
        Ok(self
            .read_state("reading field error")?
            .fields
            .get(name)
            .and_then(|field| field.error.clone()))
    }

    pub fn should_show_error(&self, name: &FieldName) -> FormResult<bool> {
        let state = self.read_state("reading error visibility")?;
        Ok(state
            .fields
            .get(name)
            .is_some_and(|field| state.shows_error(field)))
    }

    pub fn visible_error(&self, name: &FieldName) -> FormResult<Option<FieldError>> {
        let state = self.read_state("reading visible error")?;
        Ok(state
            .fields
            .get(name)
            .filter(|field| state.shows_error(field))
            .and_then(|field| field.error.clone()))
    }

    pub fn value(&self, name: &FieldName) -> FormResult<Option<FieldValue>> {
        let state = self.read_state("reading field value")?;
        Ok(state
            .fields
            .get(name)
            .map(|field| field.value.clone())
            .or_else(|| state.initial_values.get(name).cloned()))
    }

    pub fn values(&self) -> FormResult<BTreeMap<FieldName, FieldValue>> {
        Ok(self.read_state("reading form values")?.values())
    }

    pub fn field_meta(&self, name: &FieldName) -> FormResult<Option<FieldMeta>> {
        Ok(self
            .read_state("reading field meta")?
            .fields
            .get(name)
            .map(|field| field.meta))
    }

    pub fn submit_attempted(&self) -> FormResult<bool> {
        Ok(self.read_state("reading submit count")?.submit_count > 0)
    }

    /// Marks every registered field touched, validates all of them
    /// concurrently and reports whether none of them holds an error.
    pub async fn submit(&self) -> FormResult<bool> {
        let names = self.registered_fields()?;
        let pending = {
            let mut state = self.write_state("preparing submit")?;
            state.submit_count = state.submit_count.saturating_add(1);
            names
                .into_iter()
                .map(|name| {
                    let field = state.ensure_field(&name);
                    field.meta.touched = true;
                    let value = field.value.clone();
                    (name, value)
                })
                .collect::<Vec<_>>()
        };

        let results = join_all(
            pending
                .into_iter()
                .map(|(name, value)| self.validate_field(name, value)),
        )
        .await;
        results.into_iter().collect::<FormResult<Vec<()>>>()?;

        let is_valid = self.is_valid()?;
        if !is_valid && self.options.focus_first_error_on_submit {
            self.focus_first_error()?;
        }
        debug!(form = %self.id()?, is_valid, "form submit validated");
        Ok(is_valid)
    }

    /// Validates like [`FormRegistry::submit`] and, when every field passes,
    /// hands the current values to `handler`.
    pub async fn submit_with<F, Fut>(&self, handler: F) -> FormResult<bool>
    where
        F: FnOnce(BTreeMap<FieldName, FieldValue>) -> Fut,
        Fut: Future<Output = FormResult<()>>,
    {
        {
            let mut state = self.write_state("preparing submit handler")?;
            if matches!(
                state.submit_state,
                SubmitState::Validating | SubmitState::Submitting
            ) {
                return Err(FormError::AlreadySubmitting);
            }
            transition_submit_state(&mut state.submit_state, SubmitState::Validating)?;
        }

        let is_valid = match self.submit().await {
            Ok(is_valid) => is_valid,
            Err(error) => {
                self.move_submit_state(SubmitState::Failed)?;
                return Err(error);
            }
        };
        if !is_valid {
            self.move_submit_state(SubmitState::Failed)?;
            return Ok(false);
        }

        let values = {
            let mut state = self.write_state("moving submit state to submitting")?;
            transition_submit_state(&mut state.submit_state, SubmitState::Submitting)?;
            state.values()
        };
        let result = handler(values).await;

        if result.is_ok() {
            self.move_submit_state(SubmitState::Succeeded)?;
        } else {
            self.move_submit_state(SubmitState::Failed)?;
        }
        result.map(|()| true)
    }

    pub fn submit_state(&self) -> FormResult<SubmitState> {
        Ok(self.read_state("reading submit state")?.submit_state)
    }

    /// Restores initial values and clears meta. Validations still in flight
    /// are invalidated and will not commit.
    pub fn reset(&self) -> FormResult<()> {
        let mut state = self.write_state("resetting form")?;
        state.submit_state = SubmitState::Idle;
        state.submit_count = 0;
        for ticket in state.tickets.values_mut() {
            *ticket = ticket.next();
        }
        for field in state.fields.values_mut() {
            field.value = field.initial.clone();
            field.error = None;
            field.meta = FieldMeta::default();
        }
        Ok(())
    }

    pub fn snapshot(&self) -> FormResult<FormSnapshot> {
        let registered = self.registered_fields()?;
        let state = self.read_state("creating form snapshot")?;
        let is_valid = registered.iter().all(|name| {
            state
                .fields
                .get(name)
                .is_none_or(|field| field.error.is_none())
        });
        Ok(FormSnapshot {
            id: state.id,
            values: state.values(),
            submit_state: state.submit_state,
            submit_count: state.submit_count,
            is_dirty: state.fields.values().any(|field| field.meta.dirty),
            is_valid,
            fields: state
                .fields
                .iter()
                .map(|(name, field)| (name.clone(), field.snapshot()))
                .collect(),
        })
    }

    pub fn is_dirty(&self) -> FormResult<bool> {
        Ok(self.snapshot()?.is_dirty)
    }

    pub fn is_valid(&self) -> FormResult<bool> {
        Ok(self.snapshot()?.is_valid)
    }

    pub fn model<M>(&self) -> FormResult<M>
    where
        M: FormModel,
    {
        M::from_values(&self.values()?)
    }

    /// Focuses the first registered field (in name order) that holds an
    /// error and has a focus handle.
    pub fn focus_first_error(&self) -> FormResult<bool> {
        let invalid = {
            let state = self.read_state("reading first error")?;
            state
                .fields
                .iter()
                .filter(|(_, field)| field.error.is_some())
                .map(|(name, _)| name.clone())
                .collect::<Vec<_>>()
        };
        let handle = {
            let handles = read_lock(&self.focus_handles, "reading focus handles")?;
            invalid.iter().find_map(|name| handles.get(name).cloned())
        };
        let Some(handle) = handle else {
            return Ok(false);
        };
        handle.focus();
        Ok(true)
    }

    fn finish_validation(
        &self,
        name: &FieldName,
        ticket: ValidationTicket,
        outcome: ValidationOutcome,
    ) -> FormResult<()> {
        let mut state = write_lock(&self.state, "finishing field validation")?;
        if !state.mounted {
            debug!(field = %name, "validation finished after form was disposed");
            return outcome.map(|_| ()).map_err(|error| error.for_field(name));
        }
        let latest = state.is_latest(name, ticket);
        match outcome {
            Err(error) => {
                if latest {
                    state.ensure_field(name).meta.validating = false;
                }
                Err(error.for_field(name))
            }
            Ok(_) if !latest => {
                debug!(field = %name, ticket = ticket.0, "discarding stale validation result");
                Ok(())
            }
            Ok(error) => {
                let field = state.ensure_field(name);
                field.meta.validating = false;
                field.error = error;
                Ok(())
            }
        }
    }

    fn is_latest_ticket(&self, name: &FieldName, ticket: ValidationTicket) -> FormResult<bool> {
        Ok(self
            .read_state("checking latest validation ticket")?
            .is_latest(name, ticket))
    }

    fn move_submit_state(&self, next: SubmitState) -> FormResult<()> {
        let mut state = write_lock(&self.state, "moving submit state")?;
        transition_submit_state(&mut state.submit_state, next)
    }

    fn read_state(&self, context: &'static str) -> FormResult<RwLockReadGuard<'_, FormState>> {
        let state = read_lock(&self.state, context)?;
        if !state.mounted {
            return Err(FormError::ScopeUnmounted("form"));
        }
        Ok(state)
    }

    fn write_state(&self, context: &'static str) -> FormResult<RwLockWriteGuard<'_, FormState>> {
        let state = write_lock(&self.state, context)?;
        if !state.mounted {
            return Err(FormError::ScopeUnmounted("form"));
        }
        Ok(state)
    }
}

impl std::fmt::Debug for FormRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("FormRegistry");
        debug.field("options", &self.options);
        if let Ok(state) = self.state.read() {
            debug.field("id", &state.id).field("mounted", &state.mounted);
        }
        debug.finish_non_exhaustive()
    }
}
