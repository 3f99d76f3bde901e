//! Dominator tree computation.
//!
//! The dominator tree is the structural backbone for back-edge classification:
//! an edge closes a loop exactly when its target dominates its source. The
//! implementation is the iterative algorithm of Cooper, Harvey and Kennedy
//! ("A Simple, Fast Dominance Algorithm"), which iterates over the blocks in
//! reverse postorder, intersecting the dominator sets of processed
//! predecessors until the immediate-dominator assignment stabilizes.
//!
//! Blocks not reachable from the entry have no dominator and are reported as
//! unreachable; they can never participate in a back edge.

use crate::cfg::BlockId;

/// The computed dominator tree of a control flow graph.
///
/// A block `a` *dominates* a block `b` when every path from the entry to `b`
/// passes through `a`. Dominance is reflexive: every reachable block dominates
/// itself. The tree is represented by the immediate-dominator assignment; the
/// entry block is its own immediate dominator.
///
/// # Examples
///
/// ```rust,ignore
/// let dominators = cfg.dominators();
/// assert!(dominators.dominates(cfg.entry(), some_block));
/// ```
#[derive(Debug, Clone)]
pub struct DominatorTree {
    /// Immediate dominator per block; `None` marks blocks unreachable from the entry.
    idom: Vec<Option<usize>>,
}

impl DominatorTree {
    /// Computes the dominator tree for a graph given in adjacency form.
    ///
    /// # Arguments
    ///
    /// * `entry` - Index of the entry block
    /// * `predecessors` - Per-block predecessor indices
    /// * `reverse_postorder` - Reachable blocks in reverse postorder, starting at the entry
    pub(crate) fn compute(
        entry: usize,
        predecessors: &[Vec<usize>],
        reverse_postorder: &[BlockId],
    ) -> Self {
        let block_count = predecessors.len();

        // Position of each block in the reverse postorder; MAX marks unreachable blocks.
        let mut rpo_position = vec![usize::MAX; block_count];
        for (position, block) in reverse_postorder.iter().enumerate() {
            rpo_position[block.index()] = position;
        }

        let mut idom: Vec<Option<usize>> = vec![None; block_count];
        idom[entry] = Some(entry);

        let mut changed = true;
        while changed {
            changed = false;
            for block in reverse_postorder.iter().skip(1) {
                let block = block.index();
                let mut new_idom: Option<usize> = None;
                for &pred in &predecessors[block] {
                    // Only predecessors that already have a dominator participate.
                    if idom[pred].is_none() {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => pred,
                        Some(current) => Self::intersect(current, pred, &idom, &rpo_position),
                    });
                }
                if let Some(found) = new_idom {
                    if idom[block] != Some(found) {
                        idom[block] = Some(found);
                        changed = true;
                    }
                }
            }
        }

        Self { idom }
    }

    /// Walks two dominator chains upward until they meet.
    fn intersect(
        mut a: usize,
        mut b: usize,
        idom: &[Option<usize>],
        rpo_position: &[usize],
    ) -> usize {
        while a != b {
            while rpo_position[a] > rpo_position[b] {
                match idom[a] {
                    Some(next) => a = next,
                    None => return b,
                }
            }
            while rpo_position[b] > rpo_position[a] {
                match idom[b] {
                    Some(next) => b = next,
                    None => return a,
                }
            }
        }
        a
    }

    /// Returns the immediate dominator of `block`.
    ///
    /// The entry block is its own immediate dominator. Returns `None` for
    /// blocks unreachable from the entry and for out-of-range ids.
    #[must_use]
    pub fn immediate_dominator(&self, block: BlockId) -> Option<BlockId> {
        self.idom
            .get(block.index())
            .copied()
            .flatten()
            .map(BlockId::new)
    }

    /// Returns `true` if `block` is reachable from the entry.
    #[must_use]
    pub fn is_reachable(&self, block: BlockId) -> bool {
        matches!(self.idom.get(block.index()), Some(Some(_)))
    }

    /// Returns `true` if `a` dominates `b`.
    ///
    /// Dominance is reflexive; `dominates(b, b)` is `true` for every reachable
    /// block. Unreachable blocks neither dominate nor are dominated.
    #[must_use]
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        if !self.is_reachable(a) || !self.is_reachable(b) {
            return false;
        }
        let a = a.index();
        let mut current = b.index();
        loop {
            if current == a {
                return true;
            }
            match self.idom[current] {
                // The entry block is its own immediate dominator, so reaching a
                // fixed point without meeting `a` means `a` is off the chain.
                Some(next) if next != current => current = next,
                _ => return false,
            }
        }
    }
}
