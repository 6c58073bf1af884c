use std::collections::HashSet;
use std::fmt;

use super::resolver::ResolvedDependency;

/// One cross-package type dependency: `from` references `type_name` declared in `to`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub type_name: String,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            type_name: type_name.into(),
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.from, self.to, self.type_name)
    }
}

/// Accumulates the edges of the package being analyzed.
///
/// By default every reference site produces its own edge, so repeated
/// references show up as repeated edges.
pub struct DependencyRecorder {
    package: String,
    dedupe: bool,
    seen: HashSet<Edge>,
    edges: Vec<Edge>,
}

impl DependencyRecorder {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            dedupe: false,
            seen: HashSet::new(),
            edges: Vec::new(),
        }
    }

    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    pub fn record(&mut self, dependency: ResolvedDependency) {
        let edge = Edge::new(self.package.clone(), dependency.package, dependency.type_name);
        if self.dedupe && !self.seen.insert(edge.clone()) {
            return;
        }
        self.edges.push(edge);
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn into_edges(self) -> Vec<Edge> {
        self.edges
    }
}

/// Everything one run produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    pub edges: Vec<Edge>,
    pub failed: Vec<String>,
}

impl RunResult {
    pub fn edges_from<'a>(&'a self, package: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |edge| edge.from == package)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dependency(package: &str, type_name: &str) -> ResolvedDependency {
        ResolvedDependency {
            package: package.to_string(),
            type_name: type_name.to_string(),
            declared_at: 1,
        }
    }

    #[test]
    fn duplicates_are_kept_by_default() {
        let mut recorder = DependencyRecorder::new("a");
        recorder.record(dependency("b", "Foo"));
        recorder.record(dependency("b", "Foo"));
        assert_eq!(recorder.len(), 2);
    }

    #[test]
    fn dedupe_collapses_identical_edges() {
        let mut recorder = DependencyRecorder::new("a").with_dedupe(true);
        recorder.record(dependency("b", "Foo"));
        recorder.record(dependency("b", "Foo"));
        recorder.record(dependency("b", "Bar"));
        let edges = recorder.into_edges();
        assert_eq!(edges, vec![Edge::new("a", "b", "Foo"), Edge::new("a", "b", "Bar")]);
    }

    #[test]
    fn edge_displays_as_csv_line() {
        assert_eq!(Edge::new("a", "b", "Foo").to_string(), "a,b,Foo");
    }
}
