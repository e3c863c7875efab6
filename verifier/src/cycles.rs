//! Elementary circuit enumeration (Johnson) over an adjacency list.
//!
//! Both the component pass and the circuit search keep explicit stacks, so deep graphs never
//! grow the call stack.

/// Every elementary cycle of `out`, each starting at its least node, in traversal order.
///
/// Cycles are ordered by their least node. A self-edge is a cycle of length one. With `limit`
/// set, enumeration stops after that many cycles.
pub(crate) fn simple_cycles(out: &[Vec<usize>], limit: Option<usize>) -> Vec<Vec<usize>> {
    let n = out.len();
    let mut search = Search {
        out,
        start: 0,
        component: Vec::new(),
        blocked: vec![false; n],
        blocks: vec![Vec::new(); n],
        stack: Vec::new(),
        found: Vec::new(),
        limit,
    };

    let mut from = 0;
    while !search.is_full() {
        let components = Components::of(out, from);
        let Some(start) = (from..n).find(|&v| components.has_cycle(out, v)) else {
            break;
        };
        search.start = start;
        search.component = components.ids;
        search.blocked.fill(false);
        for blocks in &mut search.blocks {
            blocks.clear();
        }
        search.circuits();
        from = start + 1;
    }

    search.found
}

/// Strongly connected components of the subgraph induced by the nodes `from..`.
struct Components {
    /// Component of each node; `usize::MAX` below `from`.
    ids: Vec<usize>,
    sizes: Vec<usize>,
}

impl Components {
    /// Tarjan's algorithm with an explicit work stack.
    fn of(out: &[Vec<usize>], from: usize) -> Self {
        const UNSEEN: usize = usize::MAX;
        let n = out.len();
        let mut index = vec![UNSEEN; n];
        let mut low = vec![0; n];
        let mut on_stack = vec![false; n];
        let mut stack = Vec::new();
        let mut ids = vec![UNSEEN; n];
        let mut sizes = Vec::new();
        let mut next_index = 0;
        let mut work: Vec<(usize, usize)> = Vec::new();

        for root in from..n {
            if index[root] != UNSEEN {
                continue;
            }
            work.push((root, 0));
            while let Some(&(v, edge)) = work.last() {
                if index[v] == UNSEEN {
                    index[v] = next_index;
                    low[v] = next_index;
                    next_index += 1;
                    stack.push(v);
                    on_stack[v] = true;
                }

                if let Some(&w) = out[v].get(edge) {
                    let top = work.len() - 1;
                    work[top].1 += 1;
                    if w < from {
                        continue;
                    }
                    if index[w] == UNSEEN {
                        work.push((w, 0));
                    } else if on_stack[w] {
                        low[v] = low[v].min(index[w]);
                    }
                    continue;
                }

                work.pop();
                if let Some(&(parent, _)) = work.last() {
                    low[parent] = low[parent].min(low[v]);
                }
                if low[v] == index[v] {
                    let id = sizes.len();
                    let mut size = 0;
                    while let Some(w) = stack.pop() {
                        on_stack[w] = false;
                        ids[w] = id;
                        size += 1;
                        if w == v {
                            break;
                        }
                    }
                    sizes.push(size);
                }
            }
        }

        Self { ids, sizes }
    }

    fn has_cycle(&self, out: &[Vec<usize>], v: usize) -> bool {
        self.sizes[self.ids[v]] > 1 || out[v].contains(&v)
    }
}

#[derive(Clone, Copy)]
struct Frame {
    node: usize,
    next: usize,
    closed: bool,
}

impl Frame {
    fn new(node: usize) -> Self {
        Self {
            node,
            next: 0,
            closed: false,
        }
    }
}

struct Search<'a> {
    out: &'a [Vec<usize>],
    start: usize,
    component: Vec<usize>,
    blocked: Vec<bool>,
    blocks: Vec<Vec<usize>>,
    stack: Vec<usize>,
    found: Vec<Vec<usize>>,
    limit: Option<usize>,
}

impl Search<'_> {
    fn is_full(&self) -> bool {
        self.limit.is_some_and(|limit| self.found.len() >= limit)
    }

    /// Nodes the search from `start` may enter: same component, not below `start`.
    fn follows(&self, w: usize) -> bool {
        w >= self.start && self.component[w] == self.component[self.start]
    }

    fn circuits(&mut self) {
        let out = self.out;
        let mut frames = vec![Frame::new(self.start)];
        self.stack.push(self.start);
        self.blocked[self.start] = true;

        while let Some(&Frame { node: v, next, .. }) = frames.last() {
            if self.is_full() {
                break;
            }
            let top = frames.len() - 1;

            if let Some(&w) = out[v].get(next) {
                frames[top].next += 1;
                if !self.follows(w) {
                    continue;
                }
                if w == self.start {
                    self.found.push(self.stack.clone());
                    frames[top].closed = true;
                } else if !self.blocked[w] {
                    self.stack.push(w);
                    self.blocked[w] = true;
                    frames.push(Frame::new(w));
                }
                continue;
            }

            let closed = frames[top].closed;
            frames.truncate(top);
            if closed {
                self.unblock(v);
                if let Some(parent) = frames.last_mut() {
                    parent.closed = true;
                }
            } else {
                for &w in &out[v] {
                    if self.follows(w) && !self.blocks[w].contains(&v) {
                        self.blocks[w].push(v);
                    }
                }
            }
            self.stack.pop();
        }
        self.stack.clear();
    }

    fn unblock(&mut self, u: usize) {
        let mut pending = vec![u];
        while let Some(u) = pending.pop() {
            self.blocked[u] = false;
            for w in std::mem::take(&mut self.blocks[u]) {
                if self.blocked[w] {
                    pending.push(w);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let out = vec![vec![1, 2], vec![2], vec![]];
        assert!(simple_cycles(&out, None).is_empty());
    }

    #[test]
    fn finds_triangle_once() {
        let out = vec![vec![1], vec![2], vec![0]];
        assert_eq!(simple_cycles(&out, None), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn finds_disjoint_and_overlapping_cycles() {
        // 0 <-> 1, 1 -> 2 -> 0, 3 <-> 4
        let out = vec![vec![1], vec![0, 2], vec![0], vec![4], vec![3]];
        assert_eq!(
            simple_cycles(&out, None),
            vec![vec![0, 1], vec![0, 1, 2], vec![3, 4]]
        );
    }

    #[test]
    fn self_edge_is_a_cycle() {
        let out = vec![vec![0, 1], vec![]];
        assert_eq!(simple_cycles(&out, None), vec![vec![0]]);
    }

    #[test]
    fn complete_graph_cycle_count() {
        // K4 has 20 elementary circuits.
        let out: Vec<Vec<usize>> = (0..4)
            .map(|u| (0..4).filter(|v| *v != u).collect())
            .collect();
        assert_eq!(simple_cycles(&out, None).len(), 20);
    }

    #[test]
    fn limit_stops_enumeration() {
        let out: Vec<Vec<usize>> = (0..4)
            .map(|u| (0..4).filter(|v| *v != u).collect())
            .collect();
        assert_eq!(simple_cycles(&out, Some(3)).len(), 3);
    }

    #[test]
    fn long_chain_without_cycles() {
        let n = 100_000;
        let out: Vec<Vec<usize>> = (0..n)
            .map(|v| if v + 1 < n { vec![v + 1] } else { Vec::new() })
            .collect();
        assert!(simple_cycles(&out, None).is_empty());
    }

    #[test]
    fn long_ring_is_one_cycle() {
        let n = 100_000;
        let out: Vec<Vec<usize>> = (0..n).map(|v| vec![(v + 1) % n]).collect();
        let cycles = simple_cycles(&out, None);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), n);
        assert_eq!(cycles[0][0], 0);
    }

    #[test]
    fn cycles_behind_acyclic_prefix_are_found() {
        // 0 -> 1 -> 2 -> 3 <-> 4, 2 -> 2
        let out = vec![vec![1], vec![2], vec![2, 3], vec![4], vec![3]];
        assert_eq!(simple_cycles(&out, None), vec![vec![2], vec![3, 4]]);
    }
}
