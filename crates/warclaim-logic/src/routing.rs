//! Territory connectivity graph and route finding.
//!
//! `TerritoryGraph` holds adjacency by stable [`TerritoryId`] built from each
//! territory's connection list. Edges are directed as listed: if A lists B,
//! A → B is usable. Name lookup is case-insensitive.
//!
//! The transfer protocol only depends on the [`RouteFinder`] trait.
//! [`GraphRouter`] is the default: BFS for fewest hops, Dijkstra over
//! per-territory tolls for cheapest.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, VecDeque};

use serde::{Deserialize, Serialize};

/// Stable identifier of a territory within one claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TerritoryId(pub u32);

impl TerritoryId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for TerritoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Path-selection policy used when no direct link exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum RouteStyle {
    /// Least total toll through entered territories.
    Cheapest = 0,
    /// Fewest hops.
    #[default]
    Fastest = 1,
}

/// Directed territory graph with per-territory tolls.
#[derive(Debug, Clone, Default)]
pub struct TerritoryGraph {
    names: Vec<String>,
    index: HashMap<String, TerritoryId>,
    adj: Vec<Vec<TerritoryId>>,
    tolls: Vec<u32>,
}

impl TerritoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from `(name, connections)` pairs.
    ///
    /// Connections naming territories that are not in the list are ignored.
    pub fn from_connections<'a, I, C>(territories: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, C)> + Clone,
        C: IntoIterator<Item = &'a str>,
    {
        let mut graph = Self::new();
        for (name, _) in territories.clone() {
            graph.add_territory(name);
        }
        for (name, conns) in territories {
            let Some(from) = graph.id_of(name) else {
                continue;
            };
            for conn in conns {
                if let Some(to) = graph.id_of(conn) {
                    graph.connect(from, to);
                }
            }
        }
        graph
    }

    /// Register a territory, returning the existing id if the name is known.
    pub fn add_territory(&mut self, name: &str) -> TerritoryId {
        let key = name.to_lowercase();
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = TerritoryId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.index.insert(key, id);
        self.adj.push(Vec::new());
        self.tolls.push(1);
        id
    }

    /// Add a directed edge. Duplicate edges and self-loops are ignored.
    pub fn connect(&mut self, from: TerritoryId, to: TerritoryId) {
        if from == to || !self.contains(from) || !self.contains(to) {
            return;
        }
        let edges = &mut self.adj[from.index()];
        if !edges.contains(&to) {
            edges.push(to);
        }
    }

    pub fn id_of(&self, name: &str) -> Option<TerritoryId> {
        self.index.get(&name.to_lowercase()).copied()
    }

    pub fn name_of(&self, id: TerritoryId) -> Option<&str> {
        self.names.get(id.index()).map(|s| s.as_str())
    }

    pub fn neighbors(&self, id: TerritoryId) -> &[TerritoryId] {
        self.adj.get(id.index()).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn contains(&self, id: TerritoryId) -> bool {
        id.index() < self.names.len()
    }

    /// Cost of entering `id` on a cheapest route.
    pub fn toll(&self, id: TerritoryId) -> u32 {
        self.tolls.get(id.index()).copied().unwrap_or(1)
    }

    pub fn set_toll(&mut self, id: TerritoryId, toll: u32) {
        if let Some(t) = self.tolls.get_mut(id.index()) {
            *t = toll;
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = TerritoryId> {
        (0..self.names.len() as u32).map(TerritoryId)
    }
}

/// Route-finding capability consumed by the transfer protocol.
pub trait RouteFinder {
    /// Hops from `from` to `to`, excluding `from` and ending at `to`.
    ///
    /// Empty when `to` is unreachable or equal to `from`.
    fn route(
        &self,
        graph: &TerritoryGraph,
        from: TerritoryId,
        to: TerritoryId,
        style: RouteStyle,
    ) -> Vec<TerritoryId>;
}

/// Default route finder over a [`TerritoryGraph`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphRouter;

impl RouteFinder for GraphRouter {
    fn route(
        &self,
        graph: &TerritoryGraph,
        from: TerritoryId,
        to: TerritoryId,
        style: RouteStyle,
    ) -> Vec<TerritoryId> {
        if from == to || !graph.contains(from) || !graph.contains(to) {
            return Vec::new();
        }
        let parents = match style {
            RouteStyle::Fastest => bfs(graph, from, to),
            RouteStyle::Cheapest => dijkstra(graph, from, to),
        };
        parents
            .map(|p| rebuild_path(&p, from, to))
            .unwrap_or_default()
    }
}

fn bfs(
    graph: &TerritoryGraph,
    from: TerritoryId,
    to: TerritoryId,
) -> Option<Vec<Option<TerritoryId>>> {
    let mut parent: Vec<Option<TerritoryId>> = vec![None; graph.len()];
    let mut visited = vec![false; graph.len()];
    let mut queue = VecDeque::new();
    visited[from.index()] = true;
    queue.push_back(from);

    while let Some(current) = queue.pop_front() {
        for &next in graph.neighbors(current) {
            if visited[next.index()] {
                continue;
            }
            visited[next.index()] = true;
            parent[next.index()] = Some(current);
            if next == to {
                return Some(parent);
            }
            queue.push_back(next);
        }
    }
    None
}

fn dijkstra(
    graph: &TerritoryGraph,
    from: TerritoryId,
    to: TerritoryId,
) -> Option<Vec<Option<TerritoryId>>> {
    // (total toll, hops) per territory; ties go to fewer hops, then lower id
    let mut best: Vec<Option<(u64, u32)>> = vec![None; graph.len()];
    let mut parent: Vec<Option<TerritoryId>> = vec![None; graph.len()];
    let mut heap = BinaryHeap::new();
    best[from.index()] = Some((0, 0));
    heap.push(Reverse((0u64, 0u32, from)));

    while let Some(Reverse((cost, hops, current))) = heap.pop() {
        if best[current.index()] != Some((cost, hops)) {
            continue;
        }
        if current == to {
            return Some(parent);
        }
        for &next in graph.neighbors(current) {
            let candidate = (cost + graph.toll(next) as u64, hops + 1);
            let better = match best[next.index()] {
                None => true,
                Some(existing) => candidate < existing,
            };
            if better {
                best[next.index()] = Some(candidate);
                parent[next.index()] = Some(current);
                heap.push(Reverse((candidate.0, candidate.1, next)));
            }
        }
    }
    None
}

fn rebuild_path(
    parent: &[Option<TerritoryId>],
    from: TerritoryId,
    to: TerritoryId,
) -> Vec<TerritoryId> {
    let mut path = vec![to];
    let mut current = to;
    while let Some(prev) = parent[current.index()] {
        if prev == from {
            break;
        }
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}
