//! Activation flags.
//!
//! A component is deactivated by providing a `String` component named after
//! its activation key with the value `"false"`. Keys are derived from a type
//! and the component id: `factory.activation::<type>::<id>`.

use crate::core::name::{ComponentType, Name};

/// Prefix of every activation key.
pub const ACTIVATION_PREFIX: &str = "factory.activation";

/// The flag value turning a component off.
pub const DEACTIVATED: &str = "false";

/// Activation key of the component `id` owned by type `T`.
pub fn activation_key<T: ?Sized + 'static>(id: &str) -> String {
    activation_key_for(ComponentType::of::<T>(), id)
}

/// Activation key of the component `id` owned by `ty`.
pub fn activation_key_for(ty: ComponentType, id: &str) -> String {
    format!("{}::{}::{}", ACTIVATION_PREFIX, ty.type_name(), id)
}

/// Name of the flag component holding an activation key.
pub fn activation_name(key: &str) -> Name {
    Name::of::<String>(key)
}

/// Whether `name` is itself an activation flag; flags are never deactivated.
pub fn is_activation_name(name: &Name) -> bool {
    name.declared() == ComponentType::of::<String>() && name.id().starts_with(ACTIVATION_PREFIX)
}

/// Flag names to check for `name`, from most to least specific type.
pub(crate) fn activation_names(name: &Name, exposes: &[ComponentType]) -> Vec<Name> {
    let mut types = vec![name.declared()];
    for ty in std::iter::once(name.raw()).chain(exposes.iter().copied()) {
        if !types.contains(&ty) {
            types.push(ty);
        }
    }

    types
        .into_iter()
        .map(|ty| activation_name(&activation_key_for(ty, name.id())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::component::AutoStartable;

    #[test]
    fn test_activation_key() {
        assert_eq!(
            activation_key::<String>("test"),
            "factory.activation::alloc::string::String::test"
        );
    }

    #[test]
    fn test_activation_names_walk_types() {
        let name = Name::of::<String>("job");
        let names = activation_names(&name, &[ComponentType::of::<dyn AutoStartable>()]);

        assert_eq!(names.len(), 2);
        assert_eq!(names[0].id(), activation_key::<String>("job"));
        assert_eq!(names[1].id(), activation_key::<dyn AutoStartable>("job"));
        assert!(names.iter().all(is_activation_name));
        assert!(!is_activation_name(&name));
    }
}
