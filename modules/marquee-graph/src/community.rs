//! Greedy modularity community detection over the SIMILAR_TO graph.
//!
//! Clauset-Newman-Moore agglomeration: every movie starts in its own
//! community, and the pair of adjacent communities whose merge yields the
//! largest modularity gain is merged until no merge improves modularity.
//! Edge weights are honoured. The result depends only on the input and the
//! optional seed, which reorders the tie-breaking between equal gains.

use std::collections::{BTreeMap, HashMap};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info};

use marquee_common::SimilarityEdge;

/// Movie titles grouped into communities. Community `0` is the largest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    communities: Vec<Vec<String>>,
    by_title: HashMap<String, i64>,
}

impl Partition {
    fn from_groups(mut groups: Vec<Vec<String>>) -> Self {
        for g in &mut groups {
            g.sort();
        }
        groups.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a[0].cmp(&b[0])));

        let by_title = groups
            .iter()
            .enumerate()
            .flat_map(|(id, members)| members.iter().map(move |t| (t.clone(), id as i64)))
            .collect();

        Self {
            communities: groups,
            by_title,
        }
    }

    /// Number of communities, singletons included.
    pub fn len(&self) -> usize {
        self.communities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.communities.is_empty()
    }

    pub fn community_of(&self, title: &str) -> Option<i64> {
        self.by_title.get(title).copied()
    }

    pub fn communities(&self) -> &[Vec<String>] {
        &self.communities
    }

    /// `(title, community id)` pairs in community order, for the graph writer.
    pub fn assignments(&self) -> Vec<(String, i64)> {
        self.communities
            .iter()
            .enumerate()
            .flat_map(|(id, members)| members.iter().map(move |t| (t.clone(), id as i64)))
            .collect()
    }
}

/// Runs greedy modularity maximisation on movies and their similarity edges.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommunityDetector {
    seed: Option<u64>,
}

impl CommunityDetector {
    pub fn new(seed: Option<u64>) -> Self {
        Self { seed }
    }

    pub fn detect(&self, titles: &[String], edges: &[SimilarityEdge]) -> Partition {
        let graph = WeightedGraph::new(titles, edges);
        let n = graph.titles.len();
        if n == 0 {
            return Partition::default();
        }

        let mut rank: Vec<usize> = (0..n).collect();
        if let Some(seed) = self.seed {
            let mut order: Vec<usize> = (0..n).collect();
            order.shuffle(&mut StdRng::seed_from_u64(seed));
            for (r, node) in order.into_iter().enumerate() {
                rank[node] = r;
            }
        }

        let members = if graph.total_weight == 0.0 {
            (0..n).map(|i| vec![i]).collect()
        } else {
            greedy_merge(&graph, &rank)
        };

        let groups: Vec<Vec<String>> = members
            .into_iter()
            .map(|m| m.into_iter().map(|i| graph.titles[i].clone()).collect())
            .collect();
        let partition = Partition::from_groups(groups);

        info!(
            movies = n,
            communities = partition.len(),
            modularity = modularity(titles, edges, &partition),
            "Community detection complete"
        );
        partition
    }
}

/// Newman modularity Q of a partition over the weighted undirected graph.
pub fn modularity(titles: &[String], edges: &[SimilarityEdge], partition: &Partition) -> f64 {
    let graph = WeightedGraph::new(titles, edges);
    let m = graph.total_weight;
    if m == 0.0 {
        return 0.0;
    }

    let comm: Vec<Option<i64>> = graph
        .titles
        .iter()
        .map(|t| partition.community_of(t))
        .collect();

    let mut internal: HashMap<i64, f64> = HashMap::new();
    let mut degree: HashMap<i64, f64> = HashMap::new();
    for (i, neighbors) in graph.adjacency.iter().enumerate() {
        let Some(ci) = comm[i] else { continue };
        for (&j, &w) in neighbors {
            *degree.entry(ci).or_default() += w;
            if comm[j] == Some(ci) {
                // Each internal edge is seen from both ends
                *internal.entry(ci).or_default() += w / 2.0;
            }
        }
    }

    degree
        .iter()
        .map(|(c, d)| internal.get(c).copied().unwrap_or(0.0) / m - (d / (2.0 * m)).powi(2))
        .sum()
}

/// Symmetric weighted adjacency keyed by node index.
struct WeightedGraph {
    titles: Vec<String>,
    adjacency: Vec<BTreeMap<usize, f64>>,
    total_weight: f64,
}

impl WeightedGraph {
    fn new(titles: &[String], edges: &[SimilarityEdge]) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(titles.len());
        let mut index: HashMap<&str, usize> = HashMap::new();
        for t in titles {
            if !index.contains_key(t.as_str()) {
                index.insert(t.as_str(), unique.len());
                unique.push(t.clone());
            }
        }

        let mut adjacency: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); unique.len()];
        let mut skipped = 0usize;
        for e in edges {
            let (Some(&a), Some(&b)) = (index.get(e.title_a.as_str()), index.get(e.title_b.as_str()))
            else {
                skipped += 1;
                continue;
            };
            if a == b || e.weight <= 0.0 {
                skipped += 1;
                continue;
            }
            // Repeated pairs keep the strongest weight
            let w = adjacency[a].get(&b).copied().unwrap_or(0.0).max(e.weight);
            adjacency[a].insert(b, w);
            adjacency[b].insert(a, w);
        }
        if skipped > 0 {
            debug!(skipped, "Ignored edges with unknown endpoints, self-loops or zero weight");
        }

        let total_weight = adjacency
            .iter()
            .enumerate()
            .flat_map(|(a, n)| n.iter().filter(move |(b, _)| **b > a).map(|(_, w)| *w))
            .sum();

        Self {
            titles: unique,
            adjacency,
            total_weight,
        }
    }
}

/// CNM agglomeration. Returns the node indices of each final community.
fn greedy_merge(graph: &WeightedGraph, rank: &[usize]) -> Vec<Vec<usize>> {
    let n = graph.titles.len();
    let two_m = 2.0 * graph.total_weight;

    // e[i][j]: fraction of edge ends joining communities i and j (symmetric).
    // a[i]: fraction of edge ends attached to community i.
    let mut e: Vec<BTreeMap<usize, f64>> = graph
        .adjacency
        .iter()
        .map(|n| n.iter().map(|(&j, &w)| (j, w / two_m)).collect())
        .collect();
    let mut a: Vec<f64> = graph
        .adjacency
        .iter()
        .map(|n| n.values().sum::<f64>() / two_m)
        .collect();
    let mut members: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
    let mut alive = vec![true; n];
    let mut merges = 0usize;

    loop {
        let mut best: Option<(f64, (usize, usize), usize, usize)> = None;
        for i in 0..n {
            if !alive[i] {
                continue;
            }
            for (&j, &e_ij) in &e[i] {
                if j <= i {
                    continue;
                }
                let gain = 2.0 * (e_ij - a[i] * a[j]);
                let tie = (rank[i].min(rank[j]), rank[i].max(rank[j]));
                let better = match &best {
                    None => true,
                    Some((g, t, _, _)) => gain > *g || (gain == *g && tie < *t),
                };
                if better {
                    best = Some((gain, tie, i, j));
                }
            }
        }

        let Some((gain, _, keep, absorb)) = best else { break };
        if gain <= 0.0 {
            break;
        }

        // Fold `absorb` into `keep`
        let absorbed = std::mem::take(&mut e[absorb]);
        for (k, e_jk) in absorbed {
            if k == keep {
                continue;
            }
            *e[keep].entry(k).or_insert(0.0) += e_jk;
            let row = &mut e[k];
            row.remove(&absorb);
            *row.entry(keep).or_insert(0.0) += e_jk;
        }
        e[keep].remove(&absorb);
        a[keep] += a[absorb];
        a[absorb] = 0.0;
        let moved = std::mem::take(&mut members[absorb]);
        members[keep].extend(moved);
        alive[absorb] = false;
        merges += 1;
    }

    debug!(merges, "Greedy modularity merges");

    members
        .into_iter()
        .zip(alive)
        .filter_map(|(m, live)| live.then_some(m))
        .collect()
}
