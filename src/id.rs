use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::form::{FieldName, FormId};

static FIELD_ID_ALLOCATOR: AtomicU64 = AtomicU64::new(1);

/// DOM-style id shared by a field and its label/error elements.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FieldId(Arc<str>);

impl FieldId {
    pub fn new(value: impl Into<Arc<str>>) -> Self {
        Self(value.into())
    }

    pub fn allocate(prefix: &str) -> Self {
        let sequence = FIELD_ID_ALLOCATOR.fetch_add(1, Ordering::SeqCst);
        Self::new(format!("{prefix}-{sequence:x}"))
    }

    pub fn for_form_field(form: FormId, name: &FieldName) -> Self {
        Self::new(format!("{form}-{}", slug(name.as_str())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FieldId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn slug(input: &str) -> String {
    input
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '-'
            }
        })
        .collect()
}
