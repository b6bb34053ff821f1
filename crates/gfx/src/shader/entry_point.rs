//! A named shader-AST contribution assigned to a stage, ordered relative to
//! its siblings by declared `Before`/`After` constraints.

use crate::enums::Stage;
use crate::shader::block::BlockPtr;
use crate::{error::GfxError, graph};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    Before,
    After,
}

#[derive(Clone)]
pub struct EntryPoint {
    pub stage: Stage,
    pub name: String,
    pub code: BlockPtr,
    pub dependencies: Vec<(String, DependencyKind)>,
}

impl EntryPoint {
    pub fn new(stage: Stage, name: impl Into<String>, code: BlockPtr) -> Self {
        Self { stage, name: name.into(), code, dependencies: Vec::new() }
    }

    pub fn before(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push((name.into(), DependencyKind::Before));
        self
    }

    pub fn after(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push((name.into(), DependencyKind::After));
        self
    }
}

/// Orders the entry points of one stage by their `Before`/`After`
/// constraints (Kahn's algorithm), tie-breaking by declaration order.
/// Missing dependency names are ignored unless `strict` is set.
pub fn sort_entry_points<'a>(entry_points: &[&'a EntryPoint], strict: bool) -> Result<Vec<&'a EntryPoint>, GfxError> {
    let index_of = |name: &str| entry_points.iter().position(|e| e.name == name);

    let mut nodes = vec![graph::Node::default(); entry_points.len()];
    for (i, ep) in entry_points.iter().enumerate() {
        for (dep_name, kind) in &ep.dependencies {
            match index_of(dep_name) {
                Some(j) => match kind {
                    // i declares After(dep): dep must come before i => edge i -> dep (i depends on dep)
                    DependencyKind::After => nodes[i].dependencies.push(j),
                    // i declares Before(dep): i must come before dep => edge dep -> i (dep depends on i)
                    DependencyKind::Before => nodes[j].dependencies.push(i),
                },
                None => {
                    if strict {
                        return Err(GfxError::MissingDependency { name: dep_name.clone() });
                    }
                }
            }
        }
    }

    let order = graph::topological_sort(&graph::Graph { nodes }).ok_or(GfxError::DependencyCycle)?;
    Ok(order.into_iter().map(|i| entry_points[i]).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::blocks::Direct;

    fn ep(stage: Stage, name: &str) -> EntryPoint {
        EntryPoint::new(stage, name, Direct::new(""))
    }

    #[test]
    fn dependency_ordering_scenario() {
        let a = ep(Stage::Fragment, "a").after("b");
        let b = ep(Stage::Fragment, "b");
        let c = ep(Stage::Fragment, "c").before("a");
        let refs = vec![&a, &b, &c];
        let sorted = sort_entry_points(&refs, false).unwrap();
        let names: Vec<_> = sorted.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["c", "b", "a"]);
    }

    #[test]
    fn cycle_is_rejected() {
        let x = ep(Stage::Fragment, "x").after("y");
        let y = ep(Stage::Fragment, "y").after("x");
        let refs = vec![&x, &y];
        assert!(matches!(sort_entry_points(&refs, false), Err(GfxError::DependencyCycle)));
    }

    #[test]
    fn missing_dependency_is_tolerated_by_default() {
        let a = ep(Stage::Fragment, "a").before("nonexistent");
        let refs = vec![&a];
        assert!(sort_entry_points(&refs, false).is_ok());
    }

    #[test]
    fn missing_dependency_fails_strict_sort() {
        let a = ep(Stage::Fragment, "a").before("nonexistent");
        let refs = vec![&a];
        assert!(matches!(sort_entry_points(&refs, true), Err(GfxError::MissingDependency { .. })));
    }
}
