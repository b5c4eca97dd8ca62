//! Keyed store of long-lived objects that outlive a single composition.
//!
//! A host keeps one [`ScopedObjectStore`] per retention scope. Recreating the
//! composition asks the store for the same key again and gets the same
//! instance back; [`ScopedObjectStore::clear`] is the terminal teardown.

use std::any::{self, Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use circuit_runtime::CompositionLocal;
use indexmap::IndexMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("cannot create scoped object of type {type_name} for key `{key}`")]
    UnknownType { key: String, type_name: &'static str },
    #[error("scoped object stored under `{key}` is not a {expected}")]
    TypeMismatch { key: String, expected: &'static str },
}

/// Object held by a [`ScopedObjectStore`].
pub trait ScopedObject: Any {
    /// Called once when the owning store is cleared for good.
    fn on_cleared(&self) {}
}

/// Describes the object a store needs its factory to build.
#[derive(Debug, Clone, Copy)]
pub struct ObjectRequest<'a> {
    key: &'a str,
    type_id: TypeId,
    type_name: &'static str,
}

impl<'a> ObjectRequest<'a> {
    fn of<T: ScopedObject>(key: &'a str) -> Self {
        Self {
            key,
            type_id: TypeId::of::<T>(),
            type_name: any::type_name::<T>(),
        }
    }

    pub fn key(&self) -> &str {
        self.key
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: ScopedObject>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// The error a factory returns when it does not know the requested type.
    pub fn unknown(&self) -> ScopeError {
        ScopeError::UnknownType {
            key: self.key.to_owned(),
            type_name: self.type_name,
        }
    }
}

/// A freshly constructed object, ready to be stored.
pub struct CreatedObject {
    any: Rc<dyn Any>,
    scoped: Rc<dyn ScopedObject>,
}

impl CreatedObject {
    pub fn new<T: ScopedObject>(value: T) -> Self {
        let value = Rc::new(value);
        Self {
            any: value.clone(),
            scoped: value,
        }
    }
}

impl fmt::Debug for CreatedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreatedObject").finish_non_exhaustive()
    }
}

pub trait ScopedObjectFactory {
    fn create(&self, request: &ObjectRequest<'_>) -> Result<CreatedObject, ScopeError>;
}

impl<F> ScopedObjectFactory for F
where
    F: Fn(&ObjectRequest<'_>) -> Result<CreatedObject, ScopeError>,
{
    fn create(&self, request: &ObjectRequest<'_>) -> Result<CreatedObject, ScopeError> {
        self(request)
    }
}

#[derive(Default)]
pub struct ScopedObjectStore {
    objects: RefCell<IndexMap<String, CreatedObject>>,
}

impl ScopedObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the object stored under `key`, asking `factory` to build it
    /// on first use.
    pub fn get_or_create<T: ScopedObject>(
        &self,
        key: &str,
        factory: &dyn ScopedObjectFactory,
    ) -> Result<Rc<T>, ScopeError> {
        let mismatch = || ScopeError::TypeMismatch {
            key: key.to_owned(),
            expected: any::type_name::<T>(),
        };
        if let Some(existing) = self.objects.borrow().get(key) {
            return existing.any.clone().downcast::<T>().map_err(|_| mismatch());
        }

        let created = factory.create(&ObjectRequest::of::<T>(key))?;
        let typed = created.any.clone().downcast::<T>().map_err(|_| mismatch())?;
        log::debug!("created scoped object `{key}` ({})", any::type_name::<T>());
        self.objects.borrow_mut().insert(key.to_owned(), created);
        Ok(typed)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.borrow().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.borrow().is_empty()
    }

    /// Removes a single object and runs its teardown.
    pub fn remove(&self, key: &str) -> bool {
        let removed = self.objects.borrow_mut().shift_remove(key);
        match removed {
            Some(object) => {
                object.scoped.on_cleared();
                true
            }
            None => false,
        }
    }

    /// Terminal teardown: every stored object is cleared in creation order.
    pub fn clear(&self) {
        let objects = std::mem::take(&mut *self.objects.borrow_mut());
        log::debug!("clearing {} scoped objects", objects.len());
        for (_, object) in objects {
            object.scoped.on_cleared();
        }
    }
}

impl fmt::Debug for ScopedObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedObjectStore")
            .field("keys", &self.objects.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}

thread_local! {
    static LOCAL_SCOPED_OBJECT_STORE: CompositionLocal<Option<Rc<ScopedObjectStore>>> =
        CompositionLocal::new(|| None);
}

/// The store of the scope hosting the current composition, if any.
pub fn local_scoped_object_store() -> CompositionLocal<Option<Rc<ScopedObjectStore>>> {
    LOCAL_SCOPED_OBJECT_STORE.with(Clone::clone)
}

#[cfg(test)]
#[path = "tests/scope_tests.rs"]
mod tests;
