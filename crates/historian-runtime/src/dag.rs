//! Turns the plumbing table in SPEC_FULL §4.2 from documentation into an
//! enforced invariant: `Analyzer::depends_on()` declarations are wired into
//! a `petgraph` graph and topologically sorted, so an analyzer that depends
//! on a flag nothing upstream produces is caught here rather than silently
//! reading an empty `ConsumeContext::deps` at `consume` time.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;

use historian_core::Analyzer;

use crate::error::RunnerError;

/// Reorders `analyzers` into dependency order: for every `a` at index `i`,
/// every flag in `a.depends_on()` names an analyzer at some index `< i`.
/// Analyzers with no edges between them keep their relative input order
/// (petgraph's toposort is stable for a DAG built by insertion order).
pub fn topological_order(
    analyzers: Vec<Box<dyn Analyzer>>,
) -> Result<Vec<Box<dyn Analyzer>>, RunnerError> {
    let mut graph = DiGraph::<usize, ()>::new();
    let mut nodes: Vec<NodeIndex> = Vec::with_capacity(analyzers.len());
    let mut flag_to_index: FxHashMap<&'static str, usize> = FxHashMap::default();

    for (i, a) in analyzers.iter().enumerate() {
        nodes.push(graph.add_node(i));
        flag_to_index.insert(a.flag(), i);
    }

    for (i, a) in analyzers.iter().enumerate() {
        for dep_flag in a.depends_on() {
            let dep_idx = flag_to_index.get(dep_flag).copied().ok_or_else(|| {
                RunnerError::DagWiring(format!(
                    "{} depends on \"{}\" but no analyzer in this run produces it",
                    a.name(),
                    dep_flag
                ))
            })?;
            // Edge dependency -> dependent, so toposort lists producers first.
            graph.add_edge(nodes[dep_idx], nodes[i], ());
        }
    }

    let order = toposort(&graph, None).map_err(|cycle| {
        RunnerError::DagWiring(format!(
            "plumbing DAG has a cycle at analyzer index {}",
            cycle.node_id().index()
        ))
    })?;

    let mut slots: Vec<Option<Box<dyn Analyzer>>> = analyzers.into_iter().map(Some).collect();
    let mut sorted = Vec::with_capacity(slots.len());
    for node in order {
        let original_index = graph[node];
        sorted.push(slots[original_index].take().expect("each node visited once"));
    }
    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use historian_core::analyzer::{
        ConfigFacts, ConsumeContext, Descriptor, Mode, SerializeFormat,
    };
    use historian_core::errors::AnalyzerError;
    use historian_core::types::Report;
    use std::any::Any;

    struct Stub {
        flag: &'static str,
        deps: &'static [&'static str],
    }

    impl Analyzer for Stub {
        fn into_any(self: Box<Self>) -> Box<dyn Any> {
            self
        }
        fn descriptor(&self) -> Descriptor {
            Descriptor {
                id: self.flag,
                mode: Mode::History,
                description: "",
            }
        }
        fn name(&self) -> &str {
            self.flag
        }
        fn flag(&self) -> &'static str {
            self.flag
        }
        fn depends_on(&self) -> &'static [&'static str] {
            self.deps
        }
        fn list_configuration_options(&self) -> Vec<historian_core::ConfigurationOption> {
            Vec::new()
        }
        fn configure(&mut self, _facts: &ConfigFacts) -> Result<(), AnalyzerError> {
            Ok(())
        }
        fn initialize(&mut self) -> Result<(), AnalyzerError> {
            Ok(())
        }
        fn consume(&mut self, _ctx: &ConsumeContext) -> Result<(), AnalyzerError> {
            Ok(())
        }
        fn finalize(&mut self) -> Report {
            Report::new()
        }
        fn fork(&self, n: usize) -> Vec<Box<dyn Analyzer>> {
            (0..n)
                .map(|_| {
                    Box::new(Stub {
                        flag: self.flag,
                        deps: self.deps,
                    }) as Box<dyn Analyzer>
                })
                .collect()
        }
        fn merge(&mut self, _branches: Vec<Box<dyn Analyzer>>) {}
        fn serialize(
            &self,
            _report: &Report,
            _format: SerializeFormat,
            _writer: &mut dyn std::io::Write,
        ) -> Result<(), AnalyzerError> {
            Ok(())
        }
    }

    #[test]
    fn orders_dependents_after_dependencies() {
        let analyzers: Vec<Box<dyn Analyzer>> = vec![
            Box::new(Stub {
                flag: "c",
                deps: &["b"],
            }),
            Box::new(Stub {
                flag: "a",
                deps: &[],
            }),
            Box::new(Stub {
                flag: "b",
                deps: &["a"],
            }),
        ];
        let sorted = topological_order(analyzers).unwrap();
        let flags: Vec<&str> = sorted.iter().map(|a| a.flag()).collect();
        assert_eq!(flags, vec!["a", "b", "c"]);
    }

    #[test]
    fn unknown_dependency_is_a_wiring_error() {
        let analyzers: Vec<Box<dyn Analyzer>> = vec![Box::new(Stub {
            flag: "a",
            deps: &["ghost"],
        })];
        let err = topological_order(analyzers).unwrap_err();
        assert!(matches!(err, RunnerError::DagWiring(_)));
    }

    #[test]
    fn cycle_is_a_wiring_error() {
        let analyzers: Vec<Box<dyn Analyzer>> = vec![
            Box::new(Stub {
                flag: "a",
                deps: &["b"],
            }),
            Box::new(Stub {
                flag: "b",
                deps: &["a"],
            }),
        ];
        let err = topological_order(analyzers).unwrap_err();
        assert!(matches!(err, RunnerError::DagWiring(_)));
    }
}
