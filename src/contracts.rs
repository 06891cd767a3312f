use std::sync::Arc;

/// Builder surface a rendering component exposes so a field contract can be
/// applied to it.
pub trait FieldLike: Sized {
    fn id(self, value: impl Into<String>) -> Self;
    fn error(self, value: impl Into<String>) -> Self;
    fn required(self, value: bool) -> Self;
    fn disabled(self, value: bool) -> Self;
    fn invalid(self, value: bool) -> Self;
}

pub trait Focusable: Send + Sync {
    fn focus(&self);
}

impl<F> Focusable for F
where
    F: Fn() + Send + Sync,
{
    fn focus(&self) {
        (self)()
    }
}

/// Reference to a rendered element. Two handles are the same element only if
/// they were cloned from one another.
#[derive(Clone)]
pub struct ControlHandle(Arc<dyn Focusable>);

impl ControlHandle {
    pub fn new(target: impl Focusable + 'static) -> Self {
        Self(Arc::new(target))
    }

    pub fn focus(&self) {
        self.0.focus();
    }

    pub fn same_as(&self, other: &ControlHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for ControlHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ControlHandle(..)")
    }
}
