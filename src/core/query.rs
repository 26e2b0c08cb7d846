//! Queries - the request vocabulary.
//!
//! A query asks either for one exact [`Name`] or for every component of a
//! [`ComponentType`]. Queries are pure values; they are executed against a
//! [`Factory`](crate::Factory) through [`BoundQuery`](crate::BoundQuery).

use std::fmt;

use crate::core::name::{ComponentType, Name};

/// What a query matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// Exactly one Name, single result.
    ByName(Name),
    /// Every Name whose component has (or exposes) this type.
    ByType(ComponentType),
}

/// A request for component(s), mandatory or optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Query {
    kind: QueryKind,
    mandatory: bool,
}

impl Query {
    /// Query a single component by name. Mandatory by default.
    pub fn by_name(name: Name) -> Self {
        Query {
            kind: QueryKind::ByName(name),
            mandatory: true,
        }
    }

    /// Query every component of type `T`. Optional by default.
    pub fn by_type<T: ?Sized + 'static>() -> Self {
        Self::by_component_type(ComponentType::of::<T>())
    }

    /// Query every component of the given type. Optional by default.
    pub fn by_component_type(ty: ComponentType) -> Self {
        Query {
            kind: QueryKind::ByType(ty),
            mandatory: false,
        }
    }

    /// An empty result becomes an unsatisfied dependency error.
    pub fn mandatory(self) -> Self {
        Query {
            mandatory: true,
            ..self
        }
    }

    /// An empty result is acceptable.
    pub fn optional(self) -> Self {
        Query {
            mandatory: false,
            ..self
        }
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    /// Whether the query may yield several components.
    pub fn is_multiple(&self) -> bool {
        matches!(self.kind, QueryKind::ByType(_))
    }

    /// The queried name, for single-name queries.
    pub fn name(&self) -> Option<Name> {
        match self.kind {
            QueryKind::ByName(name) => Some(name),
            QueryKind::ByType(_) => None,
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            QueryKind::ByName(name) => write!(f, "QueryByName{{name={}}}", name),
            QueryKind::ByType(ty) => write!(f, "QueryByType{{type={}}}", ty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let by_name = Query::by_name(Name::of::<String>("test"));
        let by_type = Query::by_type::<String>();

        assert!(by_name.is_mandatory());
        assert!(!by_name.is_multiple());
        assert!(!by_type.is_mandatory());
        assert!(by_type.is_multiple());
        assert!(by_type.mandatory().is_mandatory());
        assert!(!by_name.optional().is_mandatory());
    }

    #[test]
    fn test_display() {
        let query = Query::by_name(Name::of::<String>("test"));
        assert_eq!(
            query.to_string(),
            "QueryByName{name=Name{name='test', type=alloc::string::String}}"
        );
    }
}
