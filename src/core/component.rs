//! Components - the values a factory builds.
//!
//! Built values are stored type-erased as `Arc<dyn Component>`. The
//! [`Component`] trait carries the narrow capability accessors (startable,
//! preparable, closable) so the resolver never needs reflection to find them.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use anyhow::Result;

use crate::core::name::Name;

/// Runs automatically when [`Factory::start`](crate::Factory::start) is called.
pub trait AutoStartable: Send + Sync {
    fn start(&self) -> Result<()>;
}

/// Runs when [`Factory::prepare`](crate::Factory::prepare) is called, once per
/// request or context.
pub trait AutoPreparable: Send + Sync {
    fn prepare(&self) -> Result<()>;
}

/// Releases resources when the owning warehouse closes the component's box.
pub trait AutoClosable: Send + Sync {
    fn close(&self) -> Result<()>;
}

/// Upcasting helpers, implemented for every `Any + Send + Sync` type.
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A value that can be stored in a warehouse.
///
/// Override the capability accessors to make a component startable,
/// preparable or closable:
///
/// ```rust,ignore
/// impl Component for Pool {
///     fn as_closable(&self) -> Option<&dyn AutoClosable> {
///         Some(self)
///     }
/// }
/// ```
pub trait Component: AsAny {
    fn as_startable(&self) -> Option<&dyn AutoStartable> {
        None
    }

    fn as_preparable(&self) -> Option<&dyn AutoPreparable> {
        None
    }

    fn as_closable(&self) -> Option<&dyn AutoClosable> {
        None
    }
}

macro_rules! plain_components {
    ($($ty:ty),* $(,)?) => {
        $(impl Component for $ty {})*
    };
}

plain_components!(
    String,
    &'static str,
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    std::path::PathBuf,
    std::time::Duration,
);

impl<T: Any + Send + Sync> Component for Vec<T> {}

impl<T: Any + Send + Sync> Component for Option<T> {}

impl<K, V> Component for std::collections::BTreeMap<K, V>
where
    K: Any + Send + Sync,
    V: Any + Send + Sync,
{
}

/// A built component together with its name and priority.
///
/// Cheap to clone: the component itself is shared.
#[derive(Clone)]
pub struct NamedComponent {
    name: Name,
    priority: i32,
    component: Arc<dyn Component>,
}

impl NamedComponent {
    /// Wrap a value under the given name, priority 0.
    pub fn new<T: Component>(name: Name, component: T) -> Self {
        Self::with_priority(name, 0, component)
    }

    /// Wrap a value under the given name and priority.
    pub fn with_priority<T: Component>(name: Name, priority: i32, component: T) -> Self {
        NamedComponent {
            name,
            priority,
            component: Arc::new(component),
        }
    }

    /// Wrap an already shared, type-erased value.
    pub fn from_shared(name: Name, priority: i32, component: Arc<dyn Component>) -> Self {
        NamedComponent {
            name,
            priority,
            component,
        }
    }

    /// Shortcut for `NamedComponent::new(Name::of::<T>(id), component)`.
    pub fn of<T: Component>(id: impl Into<String>, component: T) -> Self {
        Self::new(Name::of::<T>(id), component)
    }

    pub fn name(&self) -> Name {
        self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// The type-erased component.
    pub fn component(&self) -> &Arc<dyn Component> {
        &self.component
    }

    /// Borrow the component as `T`, if it is one.
    pub fn value<T: Component>(&self) -> Option<&T> {
        // deref first: `Arc<dyn Component>` is itself `Any`
        (*self.component).as_any().downcast_ref::<T>()
    }

    /// Get a shared handle to the component as `T`, if it is one.
    pub fn downcast<T: Component>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.component).into_any().downcast::<T>().ok()
    }

    /// Replace the component, keeping name and priority.
    pub fn map<T: Component>(self, component: T) -> Self {
        NamedComponent {
            component: Arc::new(component),
            ..self
        }
    }

    /// Whether both refer to the very same instance.
    pub fn same_instance(&self, other: &NamedComponent) -> bool {
        Arc::ptr_eq(&self.component, &other.component)
    }
}

impl fmt::Debug for NamedComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedComponent")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish()
    }
}

impl fmt::Display for NamedComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NamedComponent{{name={}, priority={}}}",
            self.name, self.priority
        )
    }
}
