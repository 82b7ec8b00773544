//! Evaluation ordering.

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    New,
    Active,
    Done,
}

/// Result of ordering a dependency graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ordering {
    /// Nodes in evaluation order
    pub order: Vec<usize>,
    /// Back edges skipped while ordering
    pub cycles: usize,
}

/// Order the included nodes so that every node comes after the nodes it
/// depends on.
///
/// Depth-first post-order with an explicit stack. Each included node is
/// emitted exactly once. A dependency that is still on the stack closes a
/// cycle; that edge is skipped and counted, and the cycle members fall back
/// to discovery order. Dependencies on excluded nodes are ignored.
pub fn topological_order(dependencies: &[Vec<usize>], include: &[bool]) -> Ordering {
    let n = dependencies.len();
    let included = |i: usize| i < n && include.get(i).copied().unwrap_or(false);
    let mut marks = vec![Mark::New; n];
    let mut result = Ordering::default();

    for root in 0..n {
        if !included(root) || marks[root] != Mark::New {
            continue;
        }

        // (node, index of next dependency to visit)
        let mut stack = vec![(root, 0usize)];
        marks[root] = Mark::Active;

        while let Some(frame) = stack.last_mut() {
            let (node, next) = *frame;
            if let Some(&dep) = dependencies[node].get(next) {
                frame.1 += 1;
                if !included(dep) {
                    continue;
                }
                match marks[dep] {
                    Mark::New => {
                        marks[dep] = Mark::Active;
                        stack.push((dep, 0));
                    }
                    Mark::Active => {
                        result.cycles += 1;
                        clilog::warn!("feedback loop: slot {} depends on slot {}", node, dep);
                    }
                    Mark::Done => {}
                }
            } else {
                marks[node] = Mark::Done;
                result.order.push(node);
                stack.pop();
            }
        }
    }

    result
}
