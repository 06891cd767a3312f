mod constraints;
mod control;
mod controller;
mod field;
mod messages;
mod registry;
mod validation;
mod value;


pub use calmform_derive::FormModel;
pub use constraints::{FieldConstraints, InputType};
pub use control::{FormControl, FormControlOptions};
pub use controller::{
    FieldMeta, FormError, FormId, FormOptions, FormResult, SubmitState, ValidationMode,
    ValidationTicket,
};
pub use field::{
    ChangeCallback, FieldAuthority, FieldContract, FieldMode, FieldOptions, FieldScopes,
    FormField, ValidationErrorCallback,
};
pub use messages::{ValidationMessages, ValidationRule};
pub use registry::{FieldSnapshot, FormRegistry, FormSnapshot};
pub use validation::{
    BoxedValidationFuture, CustomResult, CustomValidator, ErrorKind, FieldError,
    ValidationOutcome, ValidatorFault, ValidatorFn, compose, validate_builtin,
};
pub use value::{FieldData, FieldName, FieldValue, FormModel};

#[doc(hidden)]
pub use value::read_field;
