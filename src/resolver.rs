// src/resolver.rs

//! Dependency resolution and build ordering
//!
//! Walks the recipe graph transitively from a root and produces a
//! topological build plan: for every edge `d -> p` ("d is a dependency of
//! p"), `d` precedes `p`; the root comes last. Among packages whose
//! dependencies are all resolved, ties break lexicographically so the plan
//! is deterministic for a given recipe tree.
//!
//! Missing recipes and cycles are detected here, before any fetch happens.

use crate::error::{Error, Result};
use crate::recipe::{Recipe, RecipeStore};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Resolve the build plan for `root`: all reachable recipes in topological
/// order, root last.
pub fn resolve(store: &RecipeStore, root: &str) -> Result<Vec<Recipe>> {
    let mut recipes: HashMap<String, Recipe> = HashMap::new();
    let mut stack = vec![root.to_string()];

    while let Some(name) = stack.pop() {
        if recipes.contains_key(&name) {
            continue;
        }
        let recipe = store.load(&name)?;
        for dep in &recipe.depends {
            if !recipes.contains_key(dep) {
                stack.push(dep.clone());
            }
        }
        recipes.insert(name, recipe);
    }

    let names: BTreeSet<String> = recipes.keys().cloned().collect();
    let order = topo_sort(&names, |name| recipes[name].depends.clone())?;

    Ok(order
        .into_iter()
        .map(|name| recipes.remove(&name).expect("ordered name came from the map"))
        .collect())
}

/// The resolver's ordering restricted to the installed set: edges are only
/// counted between installed packages. Used by rebuild-system.
pub fn order_installed(store: &RecipeStore, installed: &BTreeSet<String>) -> Result<Vec<String>> {
    let mut deps_of: HashMap<String, Vec<String>> = HashMap::new();
    for name in installed {
        let recipe = store.load(name)?;
        deps_of.insert(
            name.clone(),
            recipe
                .depends
                .iter()
                .filter(|d| installed.contains(*d))
                .cloned()
                .collect(),
        );
    }

    topo_sort(installed, |name| deps_of[name].clone())
}

/// Kahn's algorithm with a lexicographic ready set. `deps` returns the
/// in-set dependencies of a node.
fn topo_sort<F>(names: &BTreeSet<String>, deps: F) -> Result<Vec<String>>
where
    F: Fn(&str) -> Vec<String>,
{
    let mut remaining: BTreeMap<String, usize> = BTreeMap::new();
    let mut dependents: HashMap<String, Vec<String>> = HashMap::new();

    for name in names {
        let ds = deps(name);
        remaining.insert(name.clone(), ds.len());
        for d in ds {
            dependents.entry(d).or_default().push(name.clone());
        }
    }

    let mut ready: BTreeSet<String> = remaining
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(name, _)| name.clone())
        .collect();

    let mut order = Vec::with_capacity(names.len());
    while let Some(name) = ready.iter().next().cloned() {
        ready.remove(&name);
        remaining.remove(&name);
        if let Some(deps) = dependents.get(&name) {
            for dependent in deps {
                if let Some(count) = remaining.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(dependent.clone());
                    }
                }
            }
        }
        order.push(name);
    }

    if !remaining.is_empty() {
        return Err(Error::DependencyCycle(remaining.into_keys().collect()));
    }

    Ok(order)
}
