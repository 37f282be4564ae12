//! Column conflict graph for a sparsity pattern.
//!
//! Two columns **conflict** when some row has a possibly-nonzero entry in
//! both; conflicting columns cannot share a color, because their
//! contributions to a group-summed Jacobian-vector product would land on
//! the same output coordinate and become inseparable.
//!
//! The conflict graph has one node per column and one edge per conflicting
//! pair. Greedy coloring walks this graph; its statistics (degree
//! distribution, components) are useful for judging how much compression a
//! pattern admits before any coloring runs.

use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};

use sparjac_core::SparsityPattern;

/// Build the column conflict graph of a pattern.
///
/// Node `j` carries the column index `j`; node indices and column indices
/// coincide by construction.
pub fn conflict_graph(pattern: &SparsityPattern) -> UnGraph<usize, ()> {
    let n = pattern.n_cols();
    let mut graph = UnGraph::<usize, ()>::with_capacity(n, 0);
    for j in 0..n {
        graph.add_node(j);
    }
    for row in pattern.rows() {
        for (pos, &a) in row.iter().enumerate() {
            for &b in &row[pos + 1..] {
                // update_edge keeps the graph simple when pairs repeat
                // across rows.
                graph.update_edge(NodeIndex::new(a), NodeIndex::new(b), ());
            }
        }
    }
    graph
}

/// Summary statistics of a conflict graph (density/degree/components).
#[derive(Debug)]
pub struct ConflictStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub connected_components: usize,
    pub min_degree: usize,
    pub avg_degree: f64,
    pub max_degree: usize,
    pub density: f64,
}

/// Calculates graph-level statistics for a column conflict graph.
pub fn conflict_stats(graph: &UnGraph<usize, ()>) -> ConflictStats {
    let node_count = graph.node_count();
    let edge_count = graph.edge_count();
    let mut degrees = Vec::with_capacity(node_count);
    for node in graph.node_indices() {
        degrees.push(graph.neighbors(node).count());
    }
    let min_degree = *degrees.iter().min().unwrap_or(&0);
    let max_degree = *degrees.iter().max().unwrap_or(&0);
    let avg_degree = if node_count == 0 {
        0.0
    } else {
        degrees.iter().copied().sum::<usize>() as f64 / node_count as f64
    };
    let density = if node_count < 2 {
        0.0
    } else {
        2.0 * edge_count as f64 / (node_count as f64 * (node_count as f64 - 1.0))
    };
    ConflictStats {
        node_count,
        edge_count,
        connected_components: connected_components(graph),
        min_degree,
        avg_degree,
        max_degree,
        density,
    }
}
