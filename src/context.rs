use std::{
    any::{type_name, Any, TypeId},
    collections::HashMap,
    fmt,
    sync::Arc,
};

type Entry = (&'static str, Arc<dyn Any + Send + Sync>);

/// The typed key/value bag threaded through a middleware chain.
///
/// Values are keyed by their Rust type. A context is immutable once handed to a middleware, adding a value produces a new context and leaves the original untouched.
///
/// ```rust
/// use ptsq::Context;
///
/// #[derive(Debug, PartialEq)]
/// struct UserId(u32);
///
/// let ctx = Context::new().with(UserId(42));
/// assert_eq!(ctx.get::<UserId>(), Some(&UserId(42)));
/// ```
#[derive(Clone, Default)]
pub struct Context {
    values: Arc<HashMap<TypeId, Entry>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any existing value of the same type.
    pub fn with<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        let value: Arc<dyn Any + Send + Sync> = Arc::new(value);
        Arc::make_mut(&mut self.values).insert(TypeId::of::<T>(), (type_name::<T>(), value));
        self
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|(_, value)| (**value).downcast_ref::<T>())
    }

    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.values.contains_key(&TypeId::of::<T>())
    }

    pub(crate) fn contains_key(&self, key: &ContextKey) -> bool {
        self.values.contains_key(&key.id)
    }

    /// Shallow merge `patch` over this context. Values in `patch` win.
    pub fn merge(&self, patch: &Context) -> Context {
        if patch.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return patch.clone();
        }

        let mut values = (*self.values).clone();
        values.extend(patch.values.iter().map(|(k, v)| (*k, v.clone())));
        Self {
            values: Arc::new(values),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = self.values.values().map(|(name, _)| *name).collect::<Vec<_>>();
        names.sort_unstable();
        f.debug_tuple("Context").field(&names).finish()
    }
}

/// Identifies a context value a router expects to be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextKey {
    id: TypeId,
    name: &'static str,
}

impl ContextKey {
    pub fn of<T: Send + Sync + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct A(u8);
    #[derive(Debug, PartialEq)]
    struct B(&'static str);

    #[test]
    fn merge_is_shallow_and_patch_wins() {
        let base = Context::new().with(A(1)).with(B("base"));
        let patch = Context::new().with(A(2));

        let merged = base.merge(&patch);
        assert_eq!(merged.get::<A>(), Some(&A(2)));
        assert_eq!(merged.get::<B>(), Some(&B("base")));

        // The original is untouched
        assert_eq!(base.get::<A>(), Some(&A(1)));
    }

    #[test]
    fn with_does_not_leak_into_clones() {
        let base = Context::new().with(A(1));
        let extended = base.clone().with(B("x"));
        assert!(!base.contains::<B>());
        assert!(extended.contains::<B>());
        assert_eq!(extended.len(), 2);
    }

    #[test]
    fn context_keys() {
        let ctx = Context::new().with(A(1));
        assert!(ctx.contains_key(&ContextKey::of::<A>()));
        assert!(!ctx.contains_key(&ContextKey::of::<B>()));
        assert!(ContextKey::of::<A>().name().ends_with("A"));
    }
}
