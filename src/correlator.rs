//! Call-stack correlation
//!
//! Nests each newly captured call under the call that most recently
//! finished before it started.
//!
//! # Heuristic
//!
//! ```text
//! 1. Flatten the forest depth-first (every node, every depth)
//! 2. Keep nodes with end_time < candidate.start_time
//! 3. Take the one with the largest end_time (first one found on ties)
//! 4. Append the candidate to its children, or to the forest as a root
//! ```
//!
//! This approximates the server-side Apex call stack from the client-side
//! timeline only. It misattributes parentage whenever the browser observes
//! completions in a different order than the server nested the calls (for
//! example under HTTP/2 multiplexing). The rule and its tie-break are kept
//! as they are so that stored traces stay comparable.
//!
//! The forest is append-only: nodes are never removed or re-parented.

use crate::captured_call::CapturedCall;

/// Where [`insert`] put a candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Appended to the forest as a new root
    Root,
    /// Appended to the children of `parent`, `depth` levels below the roots
    Child { parent: String, depth: usize },
}

/// Flatten a forest depth-first (pre-order) into every node at every depth
pub fn all_nodes(forest: &[CapturedCall]) -> Vec<&CapturedCall> {
    let mut nodes = Vec::new();
    collect(forest, &mut nodes);
    nodes
}

fn collect<'a>(forest: &'a [CapturedCall], out: &mut Vec<&'a CapturedCall>) {
    for node in forest {
        out.push(node);
        collect(node.children(), out);
    }
}

/// Insert `candidate` into `forest`
///
/// The parent is the node with the greatest `end_time` among all nodes that
/// ended strictly before `candidate.start_time()`. Without such a node the
/// candidate becomes a new root.
pub fn insert(candidate: CapturedCall, forest: &mut Vec<CapturedCall>) -> Placement {
    let Some(path) = latest_finished_before(forest, &candidate) else {
        forest.push(candidate);
        return Placement::Root;
    };

    let depth = path.len();
    let mut siblings = forest;
    let mut parent = None;
    for index in path {
        let level = siblings;
        let node = &mut level[index];
        parent = Some(node.request_id().to_string());
        siblings = node.children_mut();
    }
    siblings.push(candidate);

    Placement::Child {
        parent: parent.unwrap_or_default(),
        depth,
    }
}

/// Index path (from the roots) to the eligible container, if any
fn latest_finished_before(
    forest: &[CapturedCall],
    candidate: &CapturedCall,
) -> Option<Vec<usize>> {
    let mut best: Option<(&CapturedCall, Vec<usize>)> = None;
    let mut path = Vec::new();
    search(forest, candidate, &mut path, &mut best);
    best.map(|(_, path)| path)
}

fn search<'a>(
    forest: &'a [CapturedCall],
    candidate: &CapturedCall,
    path: &mut Vec<usize>,
    best: &mut Option<(&'a CapturedCall, Vec<usize>)>,
) {
    for (index, node) in forest.iter().enumerate() {
        path.push(index);

        if node.end_time() < candidate.start_time() {
            let better = match best.as_ref() {
                Some((current, _)) => node.end_time() > current.end_time(),
                None => true,
            };
            if better {
                *best = Some((node, path.clone()));
            }
        }

        search(node.children(), candidate, path, best);
        path.pop();
    }
}
