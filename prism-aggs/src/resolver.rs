//! Pipeline dependency resolution
//!
//! References between metrics are implicit: a pipeline aggregation points at
//! an earlier metric through its `field`, or through the `pipelineAgg` of its
//! pipeline variables. There is no separate graph structure to keep in sync;
//! every function here scans the list. Edges are read from every metric
//! regardless of its current type, so a value left with a stale `field`
//! after a type change still counts as a dependent of what it points at.

use crate::error::Error;
use crate::model::metric::MetricAggregation;
use crate::registry::CapabilityRegistry;
use crate::Result;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::warn;

/// Metric ids `agg` may consume: its `field` and pipeline variable targets
pub fn references(agg: &MetricAggregation) -> Vec<&str> {
    agg.referenced_ids()
}

/// Ids that must not be offered as a reference for a given metric
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ancestors {
    /// The target, every metric depending on it, and any cycle members, in
    /// discovery order
    pub ids: Vec<String>,
    /// Reference cycle found in the list, if any
    pub cycle: Option<Vec<String>>,
}

impl Ancestors {
    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|a| a == id)
    }

    pub fn is_clean(&self) -> bool {
        self.cycle.is_none()
    }

    /// The blocked ids, or `MalformedReferenceGraph` if a cycle was found
    pub fn into_result(self) -> Result<Vec<String>> {
        match self.cycle {
            Some(ids) => Err(Error::MalformedReferenceGraph { ids }),
            None => Ok(self.ids),
        }
    }
}

/// Blocked reference targets for `target`
///
/// Seeds the set with `target` (nothing when resolving for a metric about to
/// be appended) and folds left to right over `metrics`, adding each metric
/// that references something already in the set. A single pass always
/// terminates. If the list contains a reference cycle the cycle is reported
/// and its members are blocked as well.
pub fn ancestors_of(metrics: &[MetricAggregation], target: Option<&str>) -> Ancestors {
    let mut ids: Vec<String> = target.map(str::to_string).into_iter().collect();
    let mut seen: HashSet<String> = ids.iter().cloned().collect();

    for metric in metrics {
        if seen.contains(&metric.id) {
            continue;
        }
        if references(metric).iter().any(|r| seen.contains(*r)) {
            seen.insert(metric.id.clone());
            ids.push(metric.id.clone());
        }
    }

    let cycle = find_cycle(metrics);
    if let Some(cycle) = &cycle {
        warn!(cycle = ?cycle, "reference cycle in metric list");
        for id in cycle {
            if seen.insert(id.clone()) {
                ids.push(id.clone());
            }
        }
    }

    Ancestors { ids, cycle }
}

/// Every metric that transitively consumes `id`, in list order
///
/// Walks "is referenced by" edges with a worklist and a visited set, so the
/// closure terminates on malformed cyclic lists too. `id` itself is never
/// part of the result.
pub fn descendants_of(metrics: &[MetricAggregation], id: &str) -> Vec<String> {
    let mut visited: HashSet<&str> = HashSet::from([id]);
    let mut queue: VecDeque<&str> = VecDeque::from([id]);
    let mut found: HashSet<&str> = HashSet::new();

    while let Some(current) = queue.pop_front() {
        for metric in metrics {
            if references(metric).contains(&current) && visited.insert(&metric.id) {
                found.insert(&metric.id);
                queue.push_back(&metric.id);
            }
        }
    }

    metrics
        .iter()
        .filter(|m| found.contains(m.id.as_str()))
        .map(|m| m.id.clone())
        .collect()
}

/// Metrics a reference picker may offer for `target`
///
/// For an existing metric: the metrics positioned before it, minus its
/// blocked set. For a metric about to be appended (`None`): the basic
/// aggregations of the list.
pub fn reference_options<'a>(
    registry: &CapabilityRegistry,
    metrics: &'a [MetricAggregation],
    target: Option<&str>,
) -> Vec<&'a MetricAggregation> {
    let blocked = ancestors_of(metrics, target);

    let candidates: &'a [MetricAggregation] = match target {
        Some(id) => match metrics.iter().position(|m| m.id == id) {
            Some(pos) => &metrics[..pos],
            None => metrics,
        },
        None => metrics,
    };

    candidates
        .iter()
        .filter(|m| target.is_some() || registry.is_basic_aggregation(m))
        .filter(|m| !blocked.contains(&m.id))
        .collect()
}

/// First reference cycle found in `metrics`, as the ids along the cycle
///
/// Iterative depth-first search; references to ids missing from the list
/// are ignored.
pub fn find_cycle(metrics: &[MetricAggregation]) -> Option<Vec<String>> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Unvisited,
        InProgress,
        Done,
    }

    let mut index: HashMap<&str, usize> = HashMap::new();
    for (i, m) in metrics.iter().enumerate() {
        index.entry(m.id.as_str()).or_insert(i);
    }
    let edges: Vec<Vec<usize>> = metrics
        .iter()
        .map(|m| {
            references(m)
                .iter()
                .filter_map(|r| index.get(r).copied())
                .collect()
        })
        .collect();

    let mut marks = vec![Mark::Unvisited; metrics.len()];
    for start in 0..metrics.len() {
        if marks[start] != Mark::Unvisited {
            continue;
        }
        marks[start] = Mark::InProgress;
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];

        while let Some(top) = stack.last_mut() {
            let node = top.0;
            let Some(&next) = edges[node].get(top.1) else {
                marks[node] = Mark::Done;
                stack.pop();
                continue;
            };
            top.1 += 1;

            match marks[next] {
                Mark::Unvisited => {
                    marks[next] = Mark::InProgress;
                    stack.push((next, 0));
                }
                Mark::InProgress => {
                    let pos = stack.iter().position(|(n, _)| *n == next)?;
                    return Some(
                        stack[pos..]
                            .iter()
                            .map(|(n, _)| metrics[*n].id.clone())
                            .collect(),
                    );
                }
                Mark::Done => {}
            }
        }
    }
    None
}

/// Check that every pipeline reference points at an earlier metric
///
/// Cycles over all edges are reported first as `MalformedReferenceGraph`;
/// otherwise the first dangling, self or forward reference held by a
/// pipeline type is returned, in list order. The `field` of any other type
/// names a document field and need not resolve.
pub fn validate_references(
    registry: &CapabilityRegistry,
    metrics: &[MetricAggregation],
) -> Result<()> {
    if let Some(ids) = find_cycle(metrics) {
        return Err(Error::MalformedReferenceGraph { ids });
    }

    for (pos, metric) in metrics.iter().enumerate() {
        let Some(pipeline) = registry.as_pipeline(metric) else {
            continue;
        };
        for target in pipeline.references() {
            match metrics.iter().position(|m| m.id == target) {
                None => {
                    return Err(Error::DanglingReference {
                        id: metric.id.clone(),
                        target: target.to_string(),
                    })
                }
                Some(t) if t >= pos => {
                    return Err(Error::ForwardReference {
                        id: metric.id.clone(),
                        target: target.to_string(),
                    })
                }
                Some(_) => {}
            }
        }
    }
    Ok(())
}
