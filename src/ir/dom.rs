//! Dominator tree and dominance-frontier computation.
//!
//! Recomputed on demand by any pass that alters the CFG (§3: "recomputed on
//! demand", §5: "invalidated after any CFG mutation and must be recomputed
//! before next use"). Uses the standard iterative (Cooper/Harvey/Kennedy)
//! fixed-point algorithm over reverse postorder, which converges quickly on
//! the small, mostly-reducible CFGs these passes produce and avoids needing
//! a separate Lengauer-Tarjan implementation.

use std::collections::HashMap;

use crate::ir::function::{BlockId, Function};

/// A function-scoped dominator tree plus its dominance frontier, both
/// computed together since `promote_allocas_to_registers` needs the
/// frontier to place PHI nodes.
#[derive(Debug, Clone)]
pub struct DominatorTree {
    entry: BlockId,
    /// Immediate dominator of every reachable block except the entry.
    idom: HashMap<BlockId, BlockId>,
    frontier: HashMap<BlockId, Vec<BlockId>>,
    rpo: Vec<BlockId>,
}

impl DominatorTree {
    pub fn compute(function: &Function) -> Self {
        let rpo = reverse_postorder(function);
        let rpo_index: HashMap<BlockId, usize> =
            rpo.iter().enumerate().map(|(i, &b)| (b, i)).collect();

        let entry = function.entry;
        let mut idom: HashMap<BlockId, BlockId> = HashMap::new();
        idom.insert(entry, entry);

        let preds: HashMap<BlockId, Vec<BlockId>> = rpo
            .iter()
            .map(|&b| (b, function.predecessors(b)))
            .collect();

        let mut changed = true;
        while changed {
            changed = false;
            for &b in rpo.iter().skip(1) {
                let mut new_idom: Option<BlockId> = None;
                for &p in preds.get(&b).into_iter().flatten() {
                    if !idom.contains_key(&p) {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => p,
                        Some(cur) => intersect(&idom, &rpo_index, cur, p),
                    });
                }
                if let Some(ni) = new_idom {
                    if idom.get(&b) != Some(&ni) {
                        idom.insert(b, ni);
                        changed = true;
                    }
                }
            }
        }
        idom.remove(&entry);

        let mut frontier: HashMap<BlockId, Vec<BlockId>> = HashMap::new();
        for &b in &rpo {
            let ps = preds.get(&b).cloned().unwrap_or_default();
            if ps.len() < 2 {
                continue;
            }
            for p in ps {
                if !idom.contains_key(&p) && p != entry {
                    continue;
                }
                let mut runner = p;
                let runner_idom = |x: BlockId| -> BlockId {
                    if x == entry {
                        entry
                    } else {
                        *idom.get(&x).unwrap_or(&entry)
                    }
                };
                while runner != *idom.get(&b).unwrap_or(&entry) {
                    frontier.entry(runner).or_default().push(b);
                    if runner == entry {
                        break;
                    }
                    runner = runner_idom(runner);
                }
            }
        }
        for v in frontier.values_mut() {
            v.sort_by_key(|b| b.0);
            v.dedup();
        }

        Self {
            entry,
            idom,
            frontier,
            rpo,
        }
    }

    pub fn immediate_dominator(&self, block: BlockId) -> Option<BlockId> {
        if block == self.entry {
            None
        } else {
            self.idom.get(&block).copied()
        }
    }

    /// True if `a` dominates `b` (every path from entry to `b` passes
    /// through `a`), including `a == b`.
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        if a == b {
            return true;
        }
        let mut cur = b;
        while let Some(d) = self.immediate_dominator(cur) {
            if d == a {
                return true;
            }
            cur = d;
        }
        false
    }

    pub fn dominance_frontier(&self, block: BlockId) -> &[BlockId] {
        self.frontier.get(&block).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Blocks reachable from the entry, in reverse-postorder.
    pub fn reachable_blocks(&self) -> &[BlockId] {
        &self.rpo
    }
}

fn intersect(
    idom: &HashMap<BlockId, BlockId>,
    rpo_index: &HashMap<BlockId, usize>,
    mut a: BlockId,
    mut b: BlockId,
) -> BlockId {
    while a != b {
        while rpo_index[&a] > rpo_index[&b] {
            a = idom[&a];
        }
        while rpo_index[&b] > rpo_index[&a] {
            b = idom[&b];
        }
    }
    a
}

fn reverse_postorder(function: &Function) -> Vec<BlockId> {
    let mut visited = vec![false; function.blocks.len()];
    let mut post = Vec::with_capacity(function.blocks.len());
    let mut stack: Vec<(BlockId, usize)> = vec![(function.entry, 0)];
    visited[function.entry.index()] = true;

    while let Some((block, next_child)) = stack.pop() {
        let succs = function.block(block).term.kind.successors();
        if next_child < succs.len() {
            stack.push((block, next_child + 1));
            let child = succs[next_child];
            if !visited[child.index()] {
                visited[child.index()] = true;
                stack.push((child, 0));
            }
        } else {
            post.push(block);
        }
    }
    post.reverse();
    post
}
