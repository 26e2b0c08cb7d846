//! Component identity - WHAT component (declared type + raw type + id).
//!
//! A Name labels a component both when it is requested and when it is built.
//! Names are interned for cheap comparison and copying.

use std::any::TypeId;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{LazyLock, PoisonError, RwLock};

use crate::core::component::Component;

/// Global name interner
static NAME_INTERNER: LazyLock<RwLock<HashMap<NameInner, &'static NameInner>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// A runtime type tag: the `TypeId` plus the type name used for display and
/// activation keys.
///
/// Works for sized types as well as capability trait objects
/// (`ComponentType::of::<dyn AutoStartable>()`).
#[derive(Clone, Copy)]
pub struct ComponentType {
    id: TypeId,
    name: &'static str,
}

impl ComponentType {
    /// Tag for the type `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        ComponentType {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The wildcard type, matched by every component.
    pub fn any() -> Self {
        Self::of::<dyn Component>()
    }

    /// Whether this is the wildcard type.
    pub fn is_any(&self) -> bool {
        self.id == TypeId::of::<dyn Component>()
    }

    /// The underlying `TypeId`.
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name, e.g. `alloc::string::String`.
    pub fn type_name(&self) -> &'static str {
        self.name
    }

    /// Type name without module paths, e.g. `String` or `Generic<i32>`.
    pub fn simple_name(&self) -> String {
        simplify_type_name(self.name)
    }

    /// Whether a component of type `candidate` satisfies a request for `self`.
    pub fn accepts(&self, candidate: &ComponentType) -> bool {
        self.is_any() || self == candidate
    }
}

impl PartialEq for ComponentType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComponentType {}

impl Hash for ComponentType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Strip module paths from every path segment of a type name.
fn simplify_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();

    for c in full.chars() {
        match c {
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&' | ';' => {
                out.push_str(last_path_segment(&segment));
                segment.clear();
                out.push(c);
            }
            _ => segment.push(c),
        }
    }
    out.push_str(last_path_segment(&segment));
    out
}

fn last_path_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

/// A unique identifier for a component (interned).
///
/// Two Names are equal iff declared type, raw type and id all match, so
/// distinctly parameterized components under the same raw type never collide.
#[derive(Clone, Copy)]
pub struct Name {
    inner: &'static NameInner,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct NameInner {
    declared: ComponentType,
    raw: ComponentType,
    id: String,
    canonical: String,
}

impl Name {
    /// Name for a component of type `T` with the given id.
    pub fn of<T: ?Sized + 'static>(id: impl Into<String>) -> Self {
        let ty = ComponentType::of::<T>();
        Self::new(ty, ty, id)
    }

    /// Name for a component of type `T`, using the simple type name as id.
    pub fn of_type<T: ?Sized + 'static>() -> Self {
        let ty = ComponentType::of::<T>();
        Self::new(ty, ty, ty.simple_name())
    }

    /// Name for a parameterized component: declared type `T`, raw family `Raw`.
    ///
    /// The raw type groups related components, e.g. `Settings<Db>` and
    /// `Settings<Http>` both under the raw `Settings` family.
    pub fn parameterized<T: ?Sized + 'static, Raw: ?Sized + 'static>(
        id: impl Into<String>,
    ) -> Self {
        Self::new(ComponentType::of::<T>(), ComponentType::of::<Raw>(), id)
    }

    /// Create a name from explicit type tags.
    pub fn new(declared: ComponentType, raw: ComponentType, id: impl Into<String>) -> Self {
        let id = id.into();
        let canonical = format!("[{}]{}", declared.name, id);
        Self::intern(NameInner {
            declared,
            raw,
            id,
            canonical,
        })
    }

    fn intern(inner: NameInner) -> Self {
        // Fast path: check if already interned
        {
            let interner = NAME_INTERNER.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(&interned) = interner.get(&inner) {
                return Name { inner: interned };
            }
        }

        // Slow path: intern the new name
        let mut interner = NAME_INTERNER.write().unwrap_or_else(PoisonError::into_inner);

        // Double-check after acquiring write lock
        if let Some(&interned) = interner.get(&inner) {
            return Name { inner: interned };
        }

        let leaked: &'static NameInner = Box::leak(Box::new(inner.clone()));
        interner.insert(inner, leaked);

        Name { inner: leaked }
    }

    /// The string identifier.
    pub fn id(&self) -> &'static str {
        &self.inner.id
    }

    /// The declared (most specific) type.
    pub fn declared(&self) -> ComponentType {
        self.inner.declared
    }

    /// The raw (erased) type family.
    pub fn raw(&self) -> ComponentType {
        self.inner.raw
    }

    /// Canonical form `[declared type]id`, used for deterministic ordering.
    pub fn as_id(&self) -> &'static str {
        &self.inner.canonical
    }

    /// Short display form: the type name alone when it matches the id,
    /// otherwise `id[Type]`.
    pub fn simple_name(&self) -> String {
        let simple = self.inner.declared.simple_name();
        if simple.eq_ignore_ascii_case(&self.inner.id) {
            simple
        } else {
            format!("{}[{}]", self.inner.id, simple)
        }
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.inner, other.inner)
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self.inner, state)
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner
            .canonical
            .cmp(&other.inner.canonical)
            .then_with(|| self.inner.raw.name.cmp(other.inner.raw.name))
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Name")
            .field("id", &self.inner.id)
            .field("declared", &self.inner.declared)
            .field("raw", &self.inner.raw)
            .finish()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name{{name='{}', type={}}}", self.inner.id, self.inner.declared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    struct Generic<T>(T);

    #[test]
    fn test_name_interning() {
        let a = Name::of::<String>("test");
        let b = Name::of::<String>("test");

        assert_eq!(a, b);
        assert!(std::ptr::eq(a.inner, b.inner));
    }

    #[test]
    fn test_name_considers_full_triple() {
        let by_type = Name::of::<String>("test");
        let other_type = Name::of::<u32>("test");
        let other_id = Name::of::<String>("test2");

        assert_ne!(by_type, other_type);
        assert_ne!(by_type, other_id);

        let int_generic = Name::parameterized::<Generic<i32>, Generic<()>>("one");
        let uint_generic = Name::parameterized::<Generic<u32>, Generic<()>>("one");
        assert_ne!(int_generic, uint_generic);
        assert_eq!(int_generic.raw(), uint_generic.raw());
    }

    #[test]
    fn test_name_ordering_is_canonical() {
        let a = Name::of::<String>("a");
        let b = Name::of::<String>("b");

        assert!(a < b);
        assert_eq!(a.as_id(), "[alloc::string::String]a");
    }

    #[test]
    fn test_simple_names() {
        assert_eq!(ComponentType::of::<String>().simple_name(), "String");
        assert_eq!(
            ComponentType::of::<Generic<String>>().simple_name(),
            "Generic<String>"
        );
        assert_eq!(Name::of_type::<String>().id(), "String");
        assert_eq!(Name::of_type::<String>().simple_name(), "String");
        assert_eq!(Name::of::<String>("mode").simple_name(), "mode[String]");
    }

    #[test]
    fn test_any_type_accepts_everything() {
        let any = ComponentType::any();
        assert!(any.is_any());
        assert!(any.accepts(&ComponentType::of::<u8>()));
        assert!(!ComponentType::of::<u16>().accepts(&ComponentType::of::<u8>()));
    }
}
