//! Resolution error types and diagnostics.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::core::component::NamedComponent;
use crate::core::query::Query;
use crate::resolver::activation::activation_key_for;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// One of several components matching a single-result query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub component: String,
    pub activation_key: String,
}

/// Error during component resolution.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum FactoryError {
    #[error("{query} can't be satisfied: {reason}")]
    #[diagnostic(code(factory::resolve::unsatisfied))]
    Unsatisfied {
        query: String,
        reason: String,
        /// Queries from the root request down to the failing one.
        path: Vec<String>,
        /// Components of the same raw type under other names.
        similar: Vec<String>,
    },

    #[error("more than one component is available for {query}")]
    #[diagnostic(
        code(factory::resolve::ambiguous),
        help("select one with a more specific query, or deactivate the others")
    )]
    Ambiguous {
        query: String,
        candidates: Vec<Candidate>,
    },

    #[error("circular dependency detected while building {root}")]
    #[diagnostic(code(factory::resolve::cycle))]
    CircularDependency {
        root: String,
        cycles: Vec<Vec<String>>,
    },

    #[error("failed to build {name}")]
    #[diagnostic(code(factory::build::failed))]
    Build {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to customize {name} with {customizer}")]
    #[diagnostic(code(factory::build::customize))]
    Customize {
        name: String,
        customizer: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("component {name} is not a `{expected}`")]
    #[diagnostic(code(factory::resolve::type_mismatch))]
    TypeMismatch { name: String, expected: &'static str },

    #[error("unknown query {query} in satisfied bill of materials")]
    #[diagnostic(
        code(factory::bom::unknown_query),
        help("declare the query in the recipe's bill of materials")
    )]
    UnknownQuery {
        query: String,
        available: Vec<String>,
    },

    #[error("failed to {phase} {name}")]
    #[diagnostic(code(factory::lifecycle::failed))]
    Lifecycle {
        name: String,
        phase: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("exception raised while closing {name}")]
    #[diagnostic(code(factory::warehouse::close))]
    Close {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{} failures raised while closing warehouse {warehouse}", .failures.len())]
    #[diagnostic(code(factory::warehouse::close_many))]
    CloseMany {
        warehouse: String,
        #[related]
        failures: Vec<FactoryError>,
    },

    #[error("factory machines can't be built")]
    #[diagnostic(code(factory::bootstrap::unsatisfied))]
    Bootstrap {
        /// (machine name, failure message)
        failures: Vec<(String, String)>,
    },
}

impl FactoryError {
    pub(crate) fn unsatisfied(query: &Query, path: Vec<String>, reason: impl Into<String>) -> Self {
        FactoryError::Unsatisfied {
            query: query.to_string(),
            reason: reason.into(),
            path,
            similar: Vec::new(),
        }
    }

    pub(crate) fn ambiguous(query: &Query, components: &[NamedComponent]) -> Self {
        FactoryError::Ambiguous {
            query: query.to_string(),
            candidates: components
                .iter()
                .map(|component| Candidate {
                    component: component.to_string(),
                    activation_key: activation_key_for(component.name().raw(), component.name().id()),
                })
                .collect(),
        }
    }

    pub(crate) fn build(name: impl ToString, source: anyhow::Error) -> Self {
        FactoryError::Build {
            name: name.to_string(),
            source,
        }
    }

    /// Whether this error comes from a dependency cycle.
    pub fn is_cycle(&self) -> bool {
        matches!(self, FactoryError::CircularDependency { .. })
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            FactoryError::Unsatisfied {
                query,
                reason,
                path,
                similar,
            } => {
                let mut diag = Diagnostic::error(format!("{} can't be satisfied", query))
                    .with_context(reason.clone());

                for (depth, step) in path.iter().enumerate() {
                    diag = diag.with_context(format!("{}+-> {}", "  ".repeat(depth), step));
                }

                if !similar.is_empty() {
                    diag = diag.with_context(format!(
                        "similar components found: {}",
                        similar.join(", ")
                    ));
                    diag = diag.with_suggestion("Query one of the similar components by its name");
                }

                diag.with_suggestion(suggestions::MISSING_MACHINE)
            }

            FactoryError::Ambiguous { query, candidates } => {
                let mut diag = Diagnostic::error(format!(
                    "more than one component is available for {}",
                    query
                ));

                for candidate in candidates {
                    diag = diag.with_context(format!(
                        "{} [activation key: '{}']",
                        candidate.component, candidate.activation_key
                    ));
                }

                diag.with_suggestion("Select the component you want with a query by name")
                    .with_suggestion(suggestions::DEACTIVATE)
            }

            FactoryError::CircularDependency { root, cycles } => {
                let mut diag =
                    Diagnostic::error(format!("circular dependency detected while building {}", root));

                for cycle in cycles {
                    diag = diag.with_context(format!("cycle: {}", cycle.join(" -> ")));
                }

                diag.with_suggestion(suggestions::BREAK_CYCLE)
            }

            FactoryError::Build { name, source } => {
                Diagnostic::error(format!("failed to build {}", name))
                    .with_context(format!("{:#}", source))
            }

            FactoryError::Customize {
                name,
                customizer,
                source,
            } => Diagnostic::error(format!("failed to customize {}", name))
                .with_context(format!("customizer: {}", customizer))
                .with_context(format!("{:#}", source)),

            FactoryError::TypeMismatch { name, expected } => {
                Diagnostic::error(format!("component {} is not a `{}`", name, expected))
                    .with_suggestion("Check the type used in the query and the recipe's name")
            }

            FactoryError::UnknownQuery { query, available } => {
                let mut diag = Diagnostic::error(format!("unknown query {}", query));
                if !available.is_empty() {
                    diag = diag.with_context(format!("available queries: {}", available.join(", ")));
                }
                diag.with_suggestion(suggestions::CHECK_BOM)
            }

            FactoryError::Lifecycle {
                name,
                phase,
                source,
            } => Diagnostic::error(format!("failed to {} {}", phase, name))
                .with_context(format!("{:#}", source)),

            FactoryError::Close { name, source } => {
                Diagnostic::error(format!("exception raised while closing {}", name))
                    .with_context(format!("{:#}", source))
            }

            FactoryError::CloseMany {
                warehouse,
                failures,
            } => {
                let mut diag = Diagnostic::error(format!(
                    "exceptions raised when closing warehouse {}",
                    warehouse
                ));
                for failure in failures {
                    diag = diag.with_context(failure.to_string());
                }
                diag
            }

            FactoryError::Bootstrap { failures } => {
                let mut diag = Diagnostic::error("factory machines can't be built");
                for (machine, message) in failures {
                    diag = diag.with_context(format!("{} -> {}", machine, message));
                }
                diag.with_suggestion(suggestions::MISSING_MACHINE)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::name::Name;

    #[test]
    fn test_unsatisfied_diagnostic() {
        let query = Query::by_name(Name::of::<String>("missing"));
        let err = FactoryError::Unsatisfied {
            query: query.to_string(),
            reason: "no machine found to build it".to_string(),
            path: vec![
                "QueryByName{name=Name{name='test', type=alloc::string::String}}".to_string(),
                query.to_string(),
            ],
            similar: vec!["Name{name='ASIMILARCOMPONENT', type=alloc::string::String}".to_string()],
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("can't be satisfied"));
        assert!(output.contains("+-> QueryByName{name=Name{name='test'"));
        assert!(output.contains("ASIMILARCOMPONENT"));
    }

    #[test]
    fn test_ambiguous_lists_activation_keys() {
        let query = Query::by_type::<String>();
        let err = FactoryError::ambiguous(
            &query,
            &[
                NamedComponent::of("test", "value1".to_string()),
                NamedComponent::of("test2", "value1".to_string()),
            ],
        );

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("more than one component is available"));
        assert!(output.contains("factory.activation::alloc::string::String::test'"));
        assert!(output.contains("factory.activation::alloc::string::String::test2'"));
    }

    #[test]
    fn test_close_many_message() {
        let err = FactoryError::CloseMany {
            warehouse: "001".to_string(),
            failures: vec![
                FactoryError::Close {
                    name: "a".to_string(),
                    source: anyhow::anyhow!("boom"),
                },
                FactoryError::Close {
                    name: "b".to_string(),
                    source: anyhow::anyhow!("bang"),
                },
            ],
        };

        assert_eq!(err.to_string(), "2 failures raised while closing warehouse 001");
    }
}
