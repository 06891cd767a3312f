pub use crate::contracts::{ControlHandle, FieldLike, Focusable};
pub use crate::form::{
    CustomValidator, ErrorKind, FieldConstraints, FieldContract, FieldError, FieldMode,
    FieldName, FieldOptions, FieldScopes, FieldValue, FormControl, FormControlOptions,
    FormError, FormField, FormModel, FormOptions, FormRegistry, FormResult, InputType,
    ValidationMode, ValidationRule, compose,
};
pub use crate::id::FieldId;
