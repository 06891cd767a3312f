//! Field resolution: one entry point every input-like component goes
//! through, whether it sits in a [`FormRegistry`], inside a [`FormControl`],
//! or on its own.
//!
//! Scopes are passed in explicitly through [`FieldScopes`]. Precedence is
//! fixed: a mounted form wins when the field has a name, then a mounted
//! control, then standalone. Scopes that were unmounted count as absent.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::{debug, warn};

use super::constraints::FieldConstraints;
use super::control::FormControl;
use super::controller::{FormResult, ValidationMode, ValidationTicket, read_lock, write_lock};
use super::registry::FormRegistry;
use super::validation::{CustomValidator, FieldError, compose};
use super::value::{FieldName, FieldValue};
use crate::contracts::{ControlHandle, FieldLike};
use crate::id::FieldId;

pub type ChangeCallback = Arc<dyn Fn(&FieldValue) + Send + Sync>;
pub type ValidationErrorCallback = Arc<dyn Fn(Option<&FieldError>) + Send + Sync>;

#[derive(Clone, Default)]
pub struct FieldOptions {
    pub name: Option<FieldName>,
    pub value: FieldValue,
    pub constraints: FieldConstraints,
    pub custom: Option<CustomValidator>,
    pub disabled: bool,
    pub required: bool,
    pub debounce: Duration,
    pub control: Option<ControlHandle>,
    pub on_change: Option<ChangeCallback>,
    pub on_validation_error: Option<ValidationErrorCallback>,
}

impl FieldOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, value: impl Into<FieldName>) -> Self {
        self.name = Some(value.into());
        self
    }

    pub fn value(mut self, value: impl Into<FieldValue>) -> Self {
        self.value = value.into();
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

    pub fn disabled(mut self, value: bool) -> Self {
        self.disabled = value;
        self
    }

    pub fn required(mut self, value: bool) -> Self {
        self.required = value;
        self
    }

    pub fn debounce(mut self, value: Duration) -> Self {
        self.debounce = value;
        self
    }

    pub fn control(mut self, value: ControlHandle) -> Self {
        self.control = Some(value);
        self
    }

    pub fn on_change(mut self, handler: impl Fn(&FieldValue) + Send + Sync + 'static) -> Self {
        self.on_change = Some(Arc::new(handler));
        self
    }

    pub fn on_validation_error(
        mut self,
        handler: impl Fn(Option<&FieldError>) + Send + Sync + 'static,
    ) -> Self {
        self.on_validation_error = Some(Arc::new(handler));
        self
    }

    fn is_required(&self) -> bool {
        self.required || self.constraints.required
    }

    fn declares_validation(&self) -> bool {
        self.is_required() || self.custom.is_some() || !self.constraints.is_empty()
    }

    fn effective_constraints(&self) -> FieldConstraints {
        self.constraints.clone().required(self.is_required())
    }

    fn same_registration(&self, other: &FieldOptions) -> bool {
        let same_custom = match (&self.custom, &other.custom) {
            (Some(left), Some(right)) => left.ptr_eq(right),
            (None, None) => true,
            _ => false,
        };
        let same_control = match (&self.control, &other.control) {
            (Some(left), Some(right)) => left.same_as(right),
            (None, None) => true,
            _ => false,
        };
        self.name == other.name
            && self.required == other.required
            && self.debounce == other.debounce
            && self.constraints == other.constraints
            && same_custom
            && same_control
    }
}

#[derive(Clone, Debug, Default)]
pub struct FieldScopes {
    form: Option<FormRegistry>,
    control: Option<FormControl>,
}

impl FieldScopes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn form(mut self, form: &FormRegistry) -> Self {
        self.form = Some(form.clone());
        self
    }

    pub fn control(mut self, control: &FormControl) -> Self {
        self.control = Some(control.clone());
        self
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldMode {
    Form,
    Control,
    Standalone,
}

#[derive(Clone, Debug)]
pub enum FieldAuthority {
    Form { form: FormRegistry, name: FieldName },
    Control(FormControl),
    Standalone,
}

impl FieldAuthority {
    pub fn resolve(scopes: &FieldScopes, name: Option<&FieldName>) -> Self {
        if let (Some(form), Some(name)) = (&scopes.form, name) {
            if form.is_mounted() {
                return FieldAuthority::Form {
                    form: form.clone(),
                    name: name.clone(),
                };
            }
            debug!(field = %name, "form scope is unmounted, ignoring it");
        }
        if let Some(control) = &scopes.control {
            if control.is_mounted() {
                return FieldAuthority::Control(control.clone());
            }
            debug!(control = %control.field_id(), "form control is unmounted, ignoring it");
        }
        FieldAuthority::Standalone
    }

    pub fn mode(&self) -> FieldMode {
        match self {
            FieldAuthority::Form { .. } => FieldMode::Form,
            FieldAuthority::Control(_) => FieldMode::Control,
            FieldAuthority::Standalone => FieldMode::Standalone,
        }
    }
}

/// Everything a rendering component needs for one field. `error` is only
/// set when the error should be visible.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldContract {
    pub field_id: FieldId,
    pub mode: FieldMode,
    pub value: FieldValue,
    pub error: Option<FieldError>,
    pub is_disabled: bool,
    pub is_required: bool,
    pub is_invalid: bool,
    pub is_validating: bool,
    pub should_render_label: bool,
    pub should_render_error: bool,
}

impl FieldContract {
    pub fn present<C>(&self, component: C) -> C
    where
        C: FieldLike,
    {
        let mut component = component
            .id(self.field_id.as_str())
            .required(self.is_required)
            .disabled(self.is_disabled)
            .invalid(self.is_invalid);
        if self.should_render_error {
            if let Some(error) = &self.error {
                component = component.error(error.message());
            }
        }
        component
    }
}

enum Registration {
    Form {
        form: FormRegistry,
        name: FieldName,
    },
    Control {
        control: FormControl,
        handle: Option<ControlHandle>,
        validator: bool,
    },
}

impl Registration {
    fn mode(&self) -> FieldMode {
        match self {
            Registration::Form { .. } => FieldMode::Form,
            Registration::Control { .. } => FieldMode::Control,
        }
    }

    fn release(self) -> FormResult<()> {
        match self {
            Registration::Form { form, name } => {
                if form.is_mounted() {
                    form.unregister_field(&name)?;
                }
            }
            Registration::Control {
                control,
                handle,
                validator,
            } => {
                if control.is_mounted() {
                    if validator {
                        control.unregister_validator()?;
                    }
                    if let Some(handle) = handle {
                        control.unregister_control(&handle)?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct StandaloneCell {
    error: Option<FieldError>,
    ticket: ValidationTicket,
}

/// One mounted field. Registration happens on [`FormField::mount`] and is
/// undone on [`FormField::unmount`] or drop. When a scope unmounts under a
/// live field, the next call moves the registration to the authority that
/// now resolves.
pub struct FormField {
    field_id: FieldId,
    scopes: FieldScopes,
    options: FieldOptions,
    standalone: RwLock<StandaloneCell>,
    registration: RwLock<Option<Registration>>,
}

impl FormField {
    pub fn mount(scopes: FieldScopes, options: FieldOptions) -> FormResult<Self> {
        let authority = FieldAuthority::resolve(&scopes, options.name.as_ref());
        let field_id = match &authority {
            FieldAuthority::Form { form, name } => FieldId::for_form_field(form.id()?, name),
            FieldAuthority::Control(control) => control.field_id().clone(),
            FieldAuthority::Standalone => FieldId::allocate("calm-field"),
        };
        let field = Self {
            field_id,
            scopes,
            options,
            standalone: RwLock::new(StandaloneCell::default()),
            registration: RwLock::new(None),
        };
        field.authority()?;
        Ok(field)
    }

    pub fn field_id(&self) -> &FieldId {
        &self.field_id
    }

    pub fn options(&self) -> &FieldOptions {
        &self.options
    }

    /// Resolves the current authority and keeps the registration in step
    /// with it.
    pub fn authority(&self) -> FormResult<FieldAuthority> {
        let authority = FieldAuthority::resolve(&self.scopes, self.options.name.as_ref());
        let mut registration = write_lock(&self.registration, "syncing field registration")?;
        let registered = registration
            .as_ref()
            .map_or(FieldMode::Standalone, Registration::mode);
        if registered != authority.mode() {
            if registration.is_some() {
                debug!(
                    field = %self.field_id,
                    from = ?registered,
                    to = ?authority.mode(),
                    "field authority changed, moving registration"
                );
            }
            if let Some(previous) = registration.take() {
                previous.release()?;
            }
            *registration = self.register(&authority)?;
        }
        Ok(authority)
    }

    /// Applies new props. Validation-affecting changes re-register the
    /// field; stored values and meta are untouched either way.
    pub fn update(&mut self, options: FieldOptions) -> FormResult<()> {
        let reregister = !self.options.same_registration(&options);
        self.options = options;
        if reregister {
            self.unregister()?;
            self.authority()?;
        }
        Ok(())
    }

    pub fn unmount(self) -> FormResult<()> {
        self.unregister()
    }

    pub fn resolve(&self) -> FormResult<FieldContract> {
        let authority = self.authority()?;
        let mode = authority.mode();
        let (value, error, is_validating, scope_disabled, scope_required) = match &authority {
            FieldAuthority::Form { form, name } => (
                form.value(name)?.unwrap_or_default(),
                form.visible_error(name)?,
                form.field_meta(name)?.is_some_and(|meta| meta.validating),
                false,
                false,
            ),
            FieldAuthority::Control(control) => (
                control.value()?,
                control.visible_error()?,
                control.meta()?.validating,
                control.is_disabled()?,
                control.is_required()?,
            ),
            FieldAuthority::Standalone => (
                self.options.value.clone(),
                read_lock(&self.standalone, "reading standalone field error")?
                    .error
                    .clone(),
                false,
                false,
                false,
            ),
        };
        let wrapped = mode == FieldMode::Control;
        Ok(FieldContract {
            field_id: self.field_id.clone(),
            mode,
            value,
            is_invalid: error.is_some(),
            error,
            is_disabled: self.options.disabled || scope_disabled,
            is_required: self.options.is_required() || scope_required,
            is_validating,
            should_render_label: !wrapped,
            should_render_error: !wrapped,
        })
    }

    pub async fn handle_change(&self, value: impl Into<FieldValue>) -> FormResult<()> {
        let value = value.into();
        match self.authority()? {
            FieldAuthority::Form { form, name } => {
                form.set_field_value(name.clone(), value.clone())?;
                if form.options().validate_mode == ValidationMode::OnChange {
                    form.validate_field(name, value.clone()).await?;
                }
            }
            FieldAuthority::Control(control) => control.set_value(value.clone()).await?,
            FieldAuthority::Standalone => {}
        }
        if let Some(on_change) = &self.options.on_change {
            on_change(&value);
        }
        Ok(())
    }

    pub async fn handle_blur(&self, value: impl Into<FieldValue>) -> FormResult<()> {
        let value = value.into();
        match self.authority()? {
            FieldAuthority::Form { form, name } => {
                form.set_field_touched(name.clone(), true)?;
                if form.options().validate_mode != ValidationMode::OnSubmit {
                    form.validate_field(name, value).await?;
                }
                Ok(())
            }
            FieldAuthority::Control(control) => control.set_touched(true),
            FieldAuthority::Standalone => self.validate_standalone(value).await,
        }
    }

    async fn validate_standalone(&self, value: FieldValue) -> FormResult<()> {
        if value.is_empty() {
            return Ok(());
        }
        let ticket = {
            let mut cell = write_lock(&self.standalone, "starting standalone validation")?;
            cell.ticket = cell.ticket.next();
            cell.ticket
        };
        let validator = compose(
            &self.options.effective_constraints(),
            self.options.custom.clone(),
        );
        let error = validator(value).await?;
        {
            let mut cell = write_lock(&self.standalone, "finishing standalone validation")?;
            if cell.ticket != ticket {
                debug!(field = %self.field_id, "discarding stale standalone validation result");
                return Ok(());
            }
            cell.error = error.clone();
        }
        if let Some(on_validation_error) = &self.options.on_validation_error {
            on_validation_error(error.as_ref());
        }
        Ok(())
    }

    fn register(&self, authority: &FieldAuthority) -> FormResult<Option<Registration>> {
        let registration = match authority {
            FieldAuthority::Form { form, name } => {
                let validator = compose(
                    &self.options.effective_constraints(),
                    self.options.custom.clone(),
                );
                form.register_field_debounced(name.clone(), validator, self.options.debounce)?;
                if let Some(handle) = &self.options.control {
                    form.register_focus_handle(name.clone(), handle.clone())?;
                }
                Some(Registration::Form {
                    form: form.clone(),
                    name: name.clone(),
                })
            }
            FieldAuthority::Control(control) => {
                let validator = self.options.declares_validation();
                if validator {
                    let required = self.options.is_required() || control.is_required()?;
                    let constraints = self.options.constraints.clone().required(required);
                    control.register_validator(compose(&constraints, self.options.custom.clone()))?;
                }
                if let Some(handle) = &self.options.control {
                    control.register_control(handle.clone())?;
                }
                Some(Registration::Control {
                    control: control.clone(),
                    handle: self.options.control.clone(),
                    validator,
                })
            }
            FieldAuthority::Standalone => None,
        };
        Ok(registration)
    }

    fn unregister(&self) -> FormResult<()> {
        let previous = write_lock(&self.registration, "releasing field registration")?.take();
        match previous {
            Some(registration) => registration.release(),
            None => Ok(()),
        }
    }
}

impl Drop for FormField {
    fn drop(&mut self) {
        if let Err(error) = self.unregister() {
            warn!(field = %self.field_id, %error, "failed to unregister field");
        }
    }
}

impl std::fmt::Debug for FormField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormField")
            .field("field_id", &self.field_id)
            .field(
                "mode",
                &FieldAuthority::resolve(&self.scopes, self.options.name.as_ref()).mode(),
            )
            .finish_non_exhaustive()
    }
}
