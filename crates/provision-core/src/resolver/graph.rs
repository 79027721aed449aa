use std::collections::{HashMap, VecDeque};

use crate::models::{Dependency, DependencyKey, DependencyKind, DependencyList};
use crate::resolver::ResolutionResult;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VisitState {
    Unvisited,
    InProgress,
    Done,
}

#[derive(Clone, Debug)]
pub struct DependencyGraphNode {
    pub dependency: Dependency,
    /// Package dependencies of the resolved version, in declaration order.
    pub resolved: DependencyList,
    pub state: VisitState,
}

/// Linear install order produced from a dependency graph.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InstallationPlan {
    /// Dependencies before dependents; the root is last.
    pub order: Vec<Dependency>,
    pub has_cycle: bool,
    /// `(parent, child)` edges that closed a cycle and were not traversed.
    pub cycle_edges: Vec<(DependencyKey, DependencyKey)>,
    /// Non-package dependencies found anywhere in the graph. They are never resolved.
    pub other_dependencies: DependencyList,
}

/// Arena of nodes indexed by dependency key. Node 0 is the root.
#[derive(Debug)]
pub struct DependencyGraph {
    nodes: Vec<DependencyGraphNode>,
    index: HashMap<DependencyKey, usize>,
    other_dependencies: DependencyList,
}

impl DependencyGraph {
    /// Expands the graph from `root_dependencies`, calling `resolve` once per
    /// distinct package dependency. The first resolution error aborts the build.
    pub fn build<F>(
        root: Dependency,
        root_dependencies: &DependencyList,
        mut resolve: F,
    ) -> ResolutionResult<Self>
    where
        F: FnMut(&Dependency) -> ResolutionResult<DependencyList>,
    {
        let mut graph = Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            other_dependencies: DependencyList::new(),
        };
        let root_children = graph.package_children(root_dependencies);
        graph.insert(DependencyGraphNode {
            dependency: root,
            resolved: root_children.clone(),
            state: VisitState::Done,
        });

        let mut worklist: VecDeque<Dependency> = root_children.iter().cloned().collect();
        while let Some(dependency) = worklist.pop_front() {
            if graph.index.contains_key(&dependency.key()) {
                continue;
            }

            let position = graph.insert(DependencyGraphNode {
                dependency: dependency.clone(),
                resolved: DependencyList::new(),
                state: VisitState::InProgress,
            });
            let resolved = resolve(&dependency).map_err(|error| {
                tracing::error!(
                    package = %dependency.id,
                    kind = ?error.kind,
                    message = %error.message,
                    "dependency resolution failed"
                );
                error.attributed_to(&dependency.id)
            })?;
            let children = graph.package_children(&resolved);
            for child in &children {
                if !graph.index.contains_key(&child.key()) {
                    worklist.push_back(child.clone());
                }
            }

            let node = &mut graph.nodes[position];
            node.resolved = children;
            node.state = VisitState::Done;
        }

        Ok(graph)
    }

    pub fn node(&self, dependency: &Dependency) -> Option<&DependencyGraphNode> {
        self.index
            .get(&dependency.key())
            .map(|position| &self.nodes[*position])
    }

    /// Every `(parent, child)` package edge, including edges to nodes that
    /// were already resolved through another parent.
    pub fn edges(&self) -> impl Iterator<Item = (&Dependency, &Dependency)> {
        self.nodes.iter().flat_map(|node| {
            node.resolved
                .iter()
                .map(move |child| (&node.dependency, child))
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Post-order walk from the root. An edge to a node still on the current
    /// path is a cycle; it is recorded and skipped.
    pub fn installation_plan(&self) -> InstallationPlan {
        let mut plan = InstallationPlan {
            other_dependencies: self.other_dependencies.clone(),
            ..InstallationPlan::default()
        };
        if self.nodes.is_empty() {
            return plan;
        }

        let mut marks = vec![VisitState::Unvisited; self.nodes.len()];
        let children: Vec<Vec<usize>> = self
            .nodes
            .iter()
            .map(|node| {
                node.resolved
                    .iter()
                    .filter_map(|child| self.index.get(&child.key()).copied())
                    .collect()
            })
            .collect();

        let mut stack: Vec<(usize, usize)> = vec![(0, 0)];
        marks[0] = VisitState::InProgress;

        while let Some((current, next_child)) = stack.last_mut() {
            let current = *current;
            let Some(child) = children[current].get(*next_child).copied() else {
                marks[current] = VisitState::Done;
                plan.order.push(self.nodes[current].dependency.clone());
                stack.pop();
                continue;
            };
            *next_child += 1;

            match marks[child] {
                VisitState::Unvisited => {
                    marks[child] = VisitState::InProgress;
                    stack.push((child, 0));
                }
                VisitState::InProgress => {
                    let parent = self.nodes[current].dependency.key();
                    let closing = self.nodes[child].dependency.key();
                    tracing::warn!(
                        parent = %parent,
                        child = %closing,
                        "dependency cycle detected; edge not traversed"
                    );
                    plan.has_cycle = true;
                    plan.cycle_edges.push((parent, closing));
                }
                VisitState::Done => {}
            }
        }

        plan
    }

    fn insert(&mut self, node: DependencyGraphNode) -> usize {
        let position = self.nodes.len();
        self.index.insert(node.dependency.key(), position);
        self.nodes.push(node);
        position
    }

    /// Package dependencies of `list`; other kinds are set aside.
    fn package_children(&mut self, list: &DependencyList) -> DependencyList {
        let mut packages = DependencyList::new();
        for dependency in list {
            if dependency.kind == DependencyKind::Package {
                packages.add(dependency.clone());
            } else {
                self.other_dependencies.add(dependency.clone());
            }
        }
        packages
    }
}
