use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::{FxHashMap, FxHashSet};

/// Enumerate every simple cycle among the `active` nodes of `adjacency`,
/// following dependency direction (a cycle `[x, y, z]` reads "x requires y
/// requires z requires x").
///
/// Johnson's algorithm over the strongly connected components: each cycle is
/// reported exactly once, starting from its smallest node, and the whole
/// enumeration is deterministic. Both the component pass and the circuit
/// search are iterative.
pub(crate) fn simple_cycles(adjacency: &[Vec<usize>], active: &[bool]) -> Vec<Vec<usize>> {
    let mut graph = DiGraph::<(), ()>::with_capacity(adjacency.len(), 0);
    let nodes: Vec<NodeIndex> = (0..adjacency.len()).map(|_| graph.add_node(())).collect();
    for (v, targets) in adjacency.iter().enumerate() {
        if !active[v] {
            continue;
        }
        for &w in targets {
            if active[w] {
                graph.add_edge(nodes[v], nodes[w], ());
            }
        }
    }

    let mut cycles = Vec::new();
    let mut components = petgraph::algo::tarjan_scc(&graph);
    // Components come out in reverse topological order; normalize so the
    // output ordering is stable by smallest member.
    for component in &mut components {
        component.sort_unstable();
    }
    components.sort_unstable_by_key(|component| component.first().copied());

    for component in components {
        let members: Vec<usize> = component.iter().map(|node| node.index()).collect();
        if members.len() == 1 {
            let v = members[0];
            if adjacency[v].contains(&v) && active[v] {
                cycles.push(vec![v]);
            }
            continue;
        }
        cycles_in_component(adjacency, &members, &mut cycles);
    }
    cycles
}

struct Frame {
    node: usize,
    neighbors: Vec<usize>,
    next: usize,
    found: bool,
}

enum Step {
    Cycle,
    Descend(usize),
    Skip,
    Retreat,
}

fn cycles_in_component(adjacency: &[Vec<usize>], members: &[usize], cycles: &mut Vec<Vec<usize>>) {
    let mut nodes = members.to_vec();
    nodes.sort_unstable();

    for (i, &start) in nodes.iter().enumerate() {
        // Each pass only visits nodes at or after `start`, so every cycle is
        // found once, rooted at its smallest node.
        let allowed: FxHashSet<usize> = nodes[i..].iter().copied().collect();
        let neighbors_of = |v: usize| -> Vec<usize> {
            adjacency[v]
                .iter()
                .copied()
                .filter(|w| allowed.contains(w))
                .collect()
        };

        let mut blocked: FxHashSet<usize> = FxHashSet::default();
        let mut blocked_by: FxHashMap<usize, FxHashSet<usize>> = FxHashMap::default();
        let mut path: Vec<usize> = vec![start];
        blocked.insert(start);
        let mut frames = vec![Frame {
            node: start,
            neighbors: neighbors_of(start),
            next: 0,
            found: false,
        }];

        while !frames.is_empty() {
            let step = {
                let frame = frames.last_mut().expect("frames is non-empty");
                if frame.next < frame.neighbors.len() {
                    let w = frame.neighbors[frame.next];
                    frame.next += 1;
                    if w == start {
                        frame.found = true;
                        Step::Cycle
                    } else if blocked.contains(&w) {
                        Step::Skip
                    } else {
                        Step::Descend(w)
                    }
                } else {
                    Step::Retreat
                }
            };

            match step {
                Step::Cycle => cycles.push(path.clone()),
                Step::Skip => {}
                Step::Descend(w) => {
                    blocked.insert(w);
                    path.push(w);
                    frames.push(Frame {
                        node: w,
                        neighbors: neighbors_of(w),
                        next: 0,
                        found: false,
                    });
                }
                Step::Retreat => {
                    let frame = frames.pop().expect("frames is non-empty");
                    path.pop();
                    if frame.found {
                        unblock(frame.node, &mut blocked, &mut blocked_by);
                    } else {
                        for w in frame.neighbors {
                            blocked_by.entry(w).or_default().insert(frame.node);
                        }
                    }
                    if let Some(parent) = frames.last_mut() {
                        parent.found |= frame.found;
                    }
                }
            }
        }
    }
}

fn unblock(
    node: usize,
    blocked: &mut FxHashSet<usize>,
    blocked_by: &mut FxHashMap<usize, FxHashSet<usize>>,
) {
    let mut stack = vec![node];
    while let Some(node) = stack.pop() {
        if blocked.remove(&node) {
            if let Some(waiters) = blocked_by.remove(&node) {
                stack.extend(waiters);
            }
        }
    }
}
