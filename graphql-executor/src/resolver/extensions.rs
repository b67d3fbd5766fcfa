//! Typed storage shared along a resolver call.

use std::any::Any;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::ops::DerefMut;
use std::sync::Arc;

type AnyMap = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// A type map of values.
///
/// Each type can be stored once. Values are shared between clones of the map,
/// so a type that needs to change after insertion brings its own interior
/// mutability. Middleware uses the local extensions of a
/// [`super::ResolverContext`] to hand values over to the resolvers they wrap.
#[derive(Default, Clone)]
pub struct Extensions {
    map: Option<Box<AnyMap>>,
}

impl Extensions {
    /// Insert a type into this `Extensions`.
    ///
    /// If a value of this type already existed, it will be returned.
    pub fn insert<T: Send + Sync + 'static>(&mut self, val: T) -> Option<Arc<T>> {
        self.map
            .get_or_insert_with(Default::default)
            .insert(TypeId::of::<T>(), Arc::new(val))
            .and_then(|previous| previous.downcast().ok())
    }

    /// Get a reference to a type previously inserted on this `Extensions`.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.map
            .as_ref()
            .and_then(|map| map.get(&TypeId::of::<T>()))
            .and_then(|value| value.downcast_ref())
    }

    /// Get a shared handle on a type previously inserted on this `Extensions`.
    pub fn get_arc<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.map
            .as_ref()
            .and_then(|map| map.get(&TypeId::of::<T>()))
            .and_then(|value| value.clone().downcast().ok())
    }

    /// Get a value, inserting the value created by `f` if it is not present.
    pub fn get_or_insert_with<T: Send + Sync + 'static, F: FnOnce() -> T>(
        &mut self,
        f: F,
    ) -> Arc<T> {
        if let Some(value) = self.get_arc() {
            return value;
        }
        let value = Arc::new(f());
        self.map
            .get_or_insert_with(Default::default)
            .insert(TypeId::of::<T>(), value.clone());
        value
    }

    /// Returns `true` if a value of this type was inserted.
    pub fn contains_key<T: Send + Sync + 'static>(&self) -> bool {
        self.map
            .as_ref()
            .is_some_and(|map| map.contains_key(&TypeId::of::<T>()))
    }

    /// Remove a type from this `Extensions`.
    pub fn remove<T: Send + Sync + 'static>(&mut self) -> Option<Arc<T>> {
        self.map
            .as_mut()
            .and_then(|map| map.remove(&TypeId::of::<T>()))
            .and_then(|value| value.downcast().ok())
    }

    /// Returns `true` if there are no values stored.
    pub fn is_empty(&self) -> bool {
        self.map.as_ref().is_none_or(|map| map.is_empty())
    }

    /// Returns the number of values stored.
    pub fn len(&self) -> usize {
        self.map.as_ref().map_or(0, |map| map.len())
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions").field("len", &self.len()).finish()
    }
}

/// Extensions shared by every field of one execution, such as data loaders or
/// per-request caches.
///
/// Extensions are thread safe, and must be locked for mutation.
///
/// For example:
/// `ctx.execution_extensions().with_lock(|mut lock| lock.insert::<MyData>(data));`
#[derive(Default, Clone, Debug)]
pub struct ExtensionsMutex {
    extensions: Arc<parking_lot::Mutex<Extensions>>,
}

impl ExtensionsMutex {
    /// Locks the extensions for interaction.
    ///
    /// The lock will be dropped once the closure completes.
    pub fn with_lock<'a, T, F: FnOnce(ExtensionsGuard<'a>) -> T>(&'a self, func: F) -> T {
        let locked = ExtensionsGuard::new(&self.extensions);
        func(locked)
    }
}

impl From<Extensions> for ExtensionsMutex {
    fn from(extensions: Extensions) -> Self {
        Self {
            extensions: Arc::new(parking_lot::Mutex::new(extensions)),
        }
    }
}

/// Locked access to an [`ExtensionsMutex`].
pub struct ExtensionsGuard<'a> {
    guard: parking_lot::MutexGuard<'a, Extensions>,
}

impl<'a> ExtensionsGuard<'a> {
    fn new(guard: &'a parking_lot::Mutex<Extensions>) -> Self {
        Self {
            guard: guard.lock(),
        }
    }
}

impl Deref for ExtensionsGuard<'_> {
    type Target = Extensions;

    fn deref(&self) -> &Extensions {
        &self.guard
    }
}

impl DerefMut for ExtensionsGuard<'_> {
    fn deref_mut(&mut self) -> &mut Extensions {
        &mut self.guard
    }
}
