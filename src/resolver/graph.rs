//! Dependency graph construction and bottom-up materialization.
//!
//! Resolving one root engine:
//! 1. expand its bill of materials into a graph of build nodes, one per Name
//!    (diamonds share a node, components already in the warehouse are leaves)
//! 2. order the graph with Kahn's algorithm; leftovers are cycles
//! 3. build every node after its dependencies, storing each in the warehouse
//!
//! A dependency node keeps the lower ranked engines for its Name. They take
//! over when the best one can't satisfy its bill of materials during
//! expansion, or fails to build.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, PoisonError};
use std::time::Instant;

use anyhow::anyhow;
use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::core::bom::SatisfiedBOM;
use crate::core::component::NamedComponent;
use crate::core::machine::EngineRef;
use crate::core::name::Name;
use crate::core::query::Query;
use crate::resolver::errors::FactoryError;
use crate::resolver::{sort_components, Factory};

/// One component to materialize.
#[derive(Debug)]
pub(crate) struct BuildNode {
    pub name: Name,
    /// `None` when the component was already available in the warehouse.
    pub engine: Option<EngineRef>,
    /// Engines to fall back to, best first.
    pub alternatives: Vec<EngineRef>,
    /// Names resolved for each query of the engine's bill of materials.
    pub deps: Vec<(Query, Vec<Name>)>,
    /// Queries leading from the root request to this node.
    pub path: Vec<String>,
}

impl BuildNode {
    pub fn new(name: Name, engine: Option<EngineRef>, path: Vec<String>) -> Self {
        BuildNode {
            name,
            engine,
            alternatives: Vec::new(),
            deps: Vec::new(),
            path,
        }
    }

    pub fn with_alternatives(mut self, alternatives: Vec<EngineRef>) -> Self {
        self.alternatives = alternatives;
        self
    }
}

/// Edges go from a node to each of its dependencies.
pub(crate) type BuildGraph = DiGraph<BuildNode, ()>;

/// Build the component of `root`, with its whole dependency closure.
pub(crate) fn materialize(
    factory: &Factory,
    root: EngineRef,
    path: &[String],
) -> Result<NamedComponent, FactoryError> {
    let root_name = root.name();
    let graph = expand(factory, root, path)?;

    let order = topological_order(&graph).map_err(|remaining| {
        let cycles = describe_cycles(&graph, &remaining);
        for cycle in &cycles {
            tracing::error!("circular dependency: {}", cycle.join(" -> "));
        }
        FactoryError::CircularDependency {
            root: root_name.to_string(),
            cycles,
        }
    })?;

    let mut built: HashMap<Name, NamedComponent> = HashMap::with_capacity(order.len());
    for idx in order {
        let node = &graph[idx];
        let component = materialize_node(factory, node, &built)?;
        built.insert(node.name, component);
    }

    built.remove(&root_name).ok_or_else(|| {
        FactoryError::build(root_name, anyhow!("root component missing after materialization"))
    })
}

/// Expand the bill of materials of `root` into a build graph.
///
/// The root is always node 0.
pub(crate) fn expand(
    factory: &Factory,
    root: EngineRef,
    path: &[String],
) -> Result<BuildGraph, FactoryError> {
    let mut graph = BuildGraph::new();
    let mut index: HashMap<Name, NodeIndex> = HashMap::new();

    let root_name = root.name();
    let root_idx = graph.add_node(BuildNode::new(root_name, Some(root), path.to_vec()));
    index.insert(root_name, root_idx);

    let mut pending = vec![root_idx];
    while let Some(idx) = pending.pop() {
        let deps = dependency_names(factory, &mut graph[idx])?;
        let node_path = graph[idx].path.clone();

        for (query, names) in &deps {
            let mut dep_path = node_path.clone();
            dep_path.push(query.to_string());

            for dep in names {
                let dep_idx = match index.get(dep) {
                    Some(&existing) => existing,
                    None => {
                        let dep_node = if factory.warehouse().is_available(dep) {
                            BuildNode::new(*dep, None, dep_path.clone())
                        } else {
                            let mut engines = factory.engines(dep).into_iter();
                            let engine = engines
                                .next()
                                .ok_or_else(|| factory.unsatisfied(query, &node_path))?;
                            BuildNode::new(*dep, Some(engine), dep_path.clone())
                                .with_alternatives(engines.collect())
                        };
                        let expandable = dep_node.engine.is_some();
                        let dep_idx = graph.add_node(dep_node);
                        index.insert(*dep, dep_idx);
                        if expandable {
                            pending.push(dep_idx);
                        }
                        dep_idx
                    }
                };
                graph.update_edge(idx, dep_idx, ());
            }
        }
        graph[idx].deps = deps;
    }

    Ok(graph)
}

/// Names matching each query of the node's engine.
///
/// Moves on to the node's next engine while a mandatory query matches
/// nothing, reporting the failure of the first one when none fits.
fn dependency_names(
    factory: &Factory,
    node: &mut BuildNode,
) -> Result<Vec<(Query, Vec<Name>)>, FactoryError> {
    let mut first_error = None;
    while let Some(engine) = node.engine.clone() {
        let mut deps = Vec::with_capacity(engine.bill_of_materials().queries().len());
        let mut missing = None;
        for query in engine.bill_of_materials().queries() {
            let names = factory.find_names(query);
            if names.is_empty() && query.is_mandatory() {
                missing = Some(factory.unsatisfied(query, &node.path));
                break;
            }
            deps.push((*query, names));
        }

        let Some(e) = missing else {
            return Ok(deps);
        };
        if node.alternatives.is_empty() {
            return Err(first_error.unwrap_or(e));
        }
        tracing::debug!("{:?} can't build {}: {}", engine, node.name, e);
        first_error.get_or_insert(e);
        node.engine = Some(node.alternatives.remove(0));
    }
    Ok(Vec::new())
}

/// Kahn's topological sort, dependencies first.
///
/// Ready nodes are emitted in Name order so the result is deterministic. On
/// failure, returns the nodes that could not be emitted: members of cycles and
/// everything depending on them.
pub(crate) fn topological_order(graph: &BuildGraph) -> Result<Vec<NodeIndex>, Vec<NodeIndex>> {
    let mut outstanding: Vec<usize> = graph
        .node_indices()
        .map(|idx| graph.neighbors_directed(idx, Direction::Outgoing).count())
        .collect();

    let mut ready: BTreeMap<Name, NodeIndex> = graph
        .node_indices()
        .filter(|idx| outstanding[idx.index()] == 0)
        .map(|idx| (graph[idx].name, idx))
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some((_, idx)) = ready.pop_first() {
        order.push(idx);
        for dependent in graph.neighbors_directed(idx, Direction::Incoming) {
            let count = &mut outstanding[dependent.index()];
            *count -= 1;
            if *count == 0 {
                ready.insert(graph[dependent].name, dependent);
            }
        }
    }

    if order.len() == graph.node_count() {
        Ok(order)
    } else {
        Err(graph
            .node_indices()
            .filter(|idx| outstanding[idx.index()] > 0)
            .collect())
    }
}

/// Render every cycle among `remaining` as a chain `a -> b -> a`.
pub(crate) fn describe_cycles(graph: &BuildGraph, remaining: &[NodeIndex]) -> Vec<Vec<String>> {
    let remaining: HashSet<NodeIndex> = remaining.iter().copied().collect();

    let mut cycles: Vec<Vec<String>> = kosaraju_scc(graph)
        .into_iter()
        .filter(|scc| scc.iter().all(|idx| remaining.contains(idx)))
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .map(|scc| {
            cycle_through(graph, &scc)
                .into_iter()
                .map(|idx| graph[idx].name.simple_name())
                .collect()
        })
        .collect();

    cycles.sort();
    cycles
}

/// A simple cycle through the smallest Name of a strongly connected component.
fn cycle_through(graph: &BuildGraph, scc: &[NodeIndex]) -> Vec<NodeIndex> {
    let members: HashSet<NodeIndex> = scc.iter().copied().collect();
    let Some(&start) = scc.iter().min_by_key(|idx| graph[**idx].name) else {
        return Vec::new();
    };

    let mut path = vec![start];
    let mut visited = HashSet::from([start]);
    if walk_back_to(graph, &members, start, start, &mut path, &mut visited) {
        path.push(start);
    }
    path
}

fn walk_back_to(
    graph: &BuildGraph,
    members: &HashSet<NodeIndex>,
    start: NodeIndex,
    current: NodeIndex,
    path: &mut Vec<NodeIndex>,
    visited: &mut HashSet<NodeIndex>,
) -> bool {
    let mut next: Vec<NodeIndex> = graph
        .neighbors(current)
        .filter(|idx| members.contains(idx))
        .collect();
    next.sort_by_key(|idx| graph[*idx].name);

    for idx in next {
        if idx == start {
            return true;
        }
        if visited.insert(idx) {
            path.push(idx);
            if walk_back_to(graph, members, start, idx, path, visited) {
                return true;
            }
            path.pop();
        }
    }
    false
}

/// Checkout `node`, or build, customize and store it.
///
/// When the node's engine fails, each alternative engine is resolved on its
/// own, with its own bill of materials.
fn materialize_node(
    factory: &Factory,
    node: &BuildNode,
    built: &HashMap<Name, NamedComponent>,
) -> Result<NamedComponent, FactoryError> {
    if let Some(component) = factory.warehouse().checkout(&node.name) {
        return Ok(component);
    }

    let Some(engine) = &node.engine else {
        // was available during expansion but got consumed since
        return factory
            .resolve_name(node.name, &node.path)?
            .ok_or_else(|| factory.unsatisfied(&Query::by_name(node.name), &node.path));
    };

    let first_error = match build_node(factory, node, engine, built) {
        Ok(component) => return Ok(component),
        Err(e) => e,
    };
    tracing::debug!("{:?} failed to build {}: {}", engine, node.name, first_error);

    for alternative in &node.alternatives {
        match materialize(factory, Arc::clone(alternative), &node.path) {
            Ok(component) => return Ok(component),
            Err(e) if e.is_cycle() => return Err(e),
            Err(e) => tracing::debug!("{:?} failed to build {}: {}", alternative, node.name, e),
        }
    }
    Err(first_error)
}

fn build_node(
    factory: &Factory,
    node: &BuildNode,
    engine: &EngineRef,
    built: &HashMap<Name, NamedComponent>,
) -> Result<NamedComponent, FactoryError> {
    let gate = factory.gate(node.name);
    let _guard = gate
        .as_ref()
        .map(|gate| gate.lock().unwrap_or_else(PoisonError::into_inner));
    if gate.is_some() {
        if let Some(component) = factory.warehouse().checkout(&node.name) {
            return Ok(component);
        }
    }

    let satisfied = satisfy(node, engine, built);

    tracing::debug!("building {} with {:?}", node.name, engine);
    let started = Instant::now();
    let boxed = engine
        .build(&satisfied)
        .map_err(|source| FactoryError::build(node.name, source))?;
    let boxed = factory.customize(boxed)?;
    let build_time = started.elapsed();

    // picked before checkin: a single-use instance goes to this build only
    let component = boxed
        .pick()
        .ok_or_else(|| FactoryError::build(node.name, anyhow!("built box is empty")))?;
    factory
        .warehouse()
        .checkin(boxed, Arc::new(satisfied), build_time);
    Ok(component)
}

fn satisfy(
    node: &BuildNode,
    engine: &EngineRef,
    built: &HashMap<Name, NamedComponent>,
) -> SatisfiedBOM {
    let materials = node
        .deps
        .iter()
        .map(|(query, names)| {
            let mut components: Vec<NamedComponent> = names
                .iter()
                .filter_map(|name| built.get(name).cloned())
                .collect();
            sort_components(&mut components);
            (*query, components)
        })
        .collect();

    SatisfiedBOM::new(engine.bill_of_materials().clone(), materials)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &str)], nodes: &[&str]) -> BuildGraph {
        let mut graph = BuildGraph::new();
        let mut index = HashMap::new();
        for id in nodes {
            let name = Name::of::<String>(*id);
            index.insert(*id, graph.add_node(BuildNode::new(name, None, Vec::new())));
        }
        for (from, to) in edges {
            graph.update_edge(index[from], index[to], ());
        }
        graph
    }

    fn ids(graph: &BuildGraph, order: &[NodeIndex]) -> Vec<&'static str> {
        order.iter().map(|idx| graph[*idx].name.id()).collect()
    }

    #[test]
    fn test_dependencies_come_first() {
        let graph = graph(
            &[("app", "db"), ("app", "cache"), ("cache", "db"), ("db", "config")],
            &["app", "cache", "config", "db"],
        );

        let order = topological_order(&graph).unwrap();
        assert_eq!(ids(&graph, &order), vec!["config", "db", "cache", "app"]);
    }

    #[test]
    fn test_independent_nodes_sorted_by_name() {
        let graph = graph(&[("root", "b"), ("root", "a"), ("root", "c")], &["root", "c", "b", "a"]);

        let order = topological_order(&graph).unwrap();
        assert_eq!(ids(&graph, &order), vec!["a", "b", "c", "root"]);
    }

    #[test]
    fn test_cycle_detected() {
        let graph = graph(
            &[("root", "a"), ("a", "b"), ("b", "a"), ("root", "ok")],
            &["root", "a", "b", "ok"],
        );

        let remaining = topological_order(&graph).unwrap_err();
        assert_eq!(remaining.len(), 3);

        let cycles = describe_cycles(&graph, &remaining);
        assert_eq!(
            cycles,
            vec![vec![
                "a[String]".to_string(),
                "b[String]".to_string(),
                "a[String]".to_string()
            ]]
        );
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let graph = graph(&[("a", "a")], &["a"]);

        let remaining = topological_order(&graph).unwrap_err();
        let cycles = describe_cycles(&graph, &remaining);
        assert_eq!(cycles, vec![vec!["a[String]".to_string(), "a[String]".to_string()]]);
    }
}
