//! Bills of materials - declared vs. resolved dependencies of a recipe.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::core::component::{Component, NamedComponent};
use crate::core::query::Query;
use crate::resolver::errors::FactoryError;

/// The dependencies a recipe declares up front.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BillOfMaterials {
    queries: Vec<Query>,
}

impl BillOfMaterials {
    /// A recipe with no dependencies.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from a list of queries; duplicates are dropped.
    pub fn of(queries: impl IntoIterator<Item = Query>) -> Self {
        Self::empty().add_queries(queries)
    }

    /// Return a new bill with the extra queries appended.
    pub fn add_queries(mut self, queries: impl IntoIterator<Item = Query>) -> Self {
        for query in queries {
            if !self.queries.contains(&query) {
                self.queries.push(query);
            }
        }
        self
    }

    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

impl fmt::Display for BillOfMaterials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BillOfMaterials{{")?;
        for (i, query) in self.queries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", query)?;
        }
        write!(f, "}}")
    }
}

/// A bill of materials with every query resolved to its components.
///
/// Built once per build attempt and handed to the recipe's build function.
#[derive(Debug, Clone, Default)]
pub struct SatisfiedBOM {
    bom: BillOfMaterials,
    materials: HashMap<Query, Vec<NamedComponent>>,
}

impl SatisfiedBOM {
    pub fn new(bom: BillOfMaterials, materials: HashMap<Query, Vec<NamedComponent>>) -> Self {
        SatisfiedBOM { bom, materials }
    }

    /// Satisfied bill of a recipe without dependencies.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn bom(&self) -> &BillOfMaterials {
        &self.bom
    }

    /// All components resolved for a query, in deterministic order.
    pub fn get(&self, query: &Query) -> Result<&[NamedComponent], FactoryError> {
        self.materials
            .get(query)
            .map(Vec::as_slice)
            .ok_or_else(|| FactoryError::UnknownQuery {
                query: query.to_string(),
                available: self.bom.queries().iter().map(ToString::to_string).collect(),
            })
    }

    /// The single component resolved for a query, if any.
    pub fn one(&self, query: &Query) -> Result<Option<&NamedComponent>, FactoryError> {
        let components = self.get(query)?;
        match components {
            [] => Ok(None),
            [one] => Ok(Some(one)),
            many => Err(FactoryError::ambiguous(query, many)),
        }
    }

    /// The single component for a query, downcast to `T`.
    pub fn one_as<T: Component>(&self, query: &Query) -> Result<Option<Arc<T>>, FactoryError> {
        self.one(query)?.map(downcast).transpose()
    }

    /// The single component for a mandatory query, downcast to `T`.
    pub fn require<T: Component>(&self, query: &Query) -> Result<Arc<T>, FactoryError> {
        self.one_as::<T>(query)?
            .ok_or_else(|| FactoryError::unsatisfied(query, Vec::new(), "no component resolved"))
    }

    /// Every component for a query, downcast to `T`.
    pub fn all_as<T: Component>(&self, query: &Query) -> Result<Vec<Arc<T>>, FactoryError> {
        self.get(query)?.iter().map(downcast).collect()
    }

    /// Every resolved component, across all queries.
    pub fn all_components(&self) -> impl Iterator<Item = &NamedComponent> {
        self.bom
            .queries()
            .iter()
            .filter_map(|query| self.materials.get(query))
            .flatten()
    }
}

pub(crate) fn downcast<T: Component>(component: &NamedComponent) -> Result<Arc<T>, FactoryError> {
    component
        .downcast::<T>()
        .ok_or_else(|| FactoryError::TypeMismatch {
            name: component.name().to_string(),
            expected: std::any::type_name::<T>(),
        })
}
