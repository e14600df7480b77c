//! Windowed linearization of a comment forest.
//!
//! The traversal appends an entire sibling list before descending into any of
//! its members, then visits each member's replies left to right with the same
//! rule. For roots `[A, B]` where `A` has replies `[A1, A2]`, `A1` has `[A11]`
//! and `B` has `[B1]`, the sequence is `A, B, A1, A2, A11, B1`: neither level
//! order nor depth-first order. Existing clients page through threads in this
//! order, so it is kept as is.
//!
//! The accumulator is capped at `limit + offset` entries and the walk stops as
//! soon as the cap is reached. Windows that start past the end of the tree are
//! empty.

/// Select the `(limit, offset)` window of the flattened forest rooted at `roots`.
///
/// `children_of` resolves a comment identifier to its replies in creation order.
pub fn paginate<'a, F>(
    roots: &'a [String],
    limit: usize,
    offset: usize,
    children_of: F,
) -> Vec<&'a str>
where
    F: Fn(&str) -> &'a [String],
{
    let end = limit.saturating_add(offset);
    let mut collected: Vec<&'a str> = Vec::new();

    // Sibling lists still to visit; the top of the stack is the next one.
    let mut pending: Vec<&'a [String]> = vec![roots];

    while let Some(level) = pending.pop() {
        if collected.len() >= end {
            break;
        }

        for id in level {
            if collected.len() >= end {
                break;
            }
            collected.push(id.as_str());
        }

        for id in level.iter().rev() {
            let children = children_of(id);
            if !children.is_empty() {
                pending.push(children);
            }
        }
    }

    if offset >= collected.len() {
        return Vec::new();
    }

    let stop = end.min(collected.len());
    collected.drain(offset..stop).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Forest {
        roots: Vec<String>,
        children: HashMap<String, Vec<String>>,
    }

    impl Forest {
        fn new(roots: &[&str], edges: &[(&str, &str)]) -> Self {
            let mut children: HashMap<String, Vec<String>> = HashMap::new();
            for (parent, child) in edges {
                children
                    .entry(parent.to_string())
                    .or_default()
                    .push(child.to_string());
            }
            Self {
                roots: roots.iter().map(|s| s.to_string()).collect(),
                children,
            }
        }

        fn page(&self, limit: usize, offset: usize) -> Vec<&str> {
            paginate(&self.roots, limit, offset, |id| {
                self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
            })
        }
    }

    #[test]
    fn test_second_root_then_first_reply() {
        let forest = Forest::new(&["A", "B"], &[("A", "A1")]);

        assert_eq!(forest.page(1, 1), vec!["B"]);
        assert_eq!(forest.page(1, 2), vec!["A1"]);
    }

    #[test]
    fn test_siblings_before_descendants_order() {
        let forest = Forest::new(
            &["A", "B"],
            &[("A", "A1"), ("A", "A2"), ("A1", "A11"), ("B", "B1")],
        );

        assert_eq!(forest.page(10, 0), vec!["A", "B", "A1", "A2", "A11", "B1"]);
        assert_eq!(forest.page(2, 3), vec!["A2", "A11"]);
    }

    #[test]
    fn test_zero_limit_is_empty() {
        let forest = Forest::new(&["A", "B"], &[("A", "A1")]);
        assert!(forest.page(0, 0).is_empty());
        assert!(forest.page(0, 1).is_empty());
    }

    #[test]
    fn test_offset_past_end_is_empty() {
        let forest = Forest::new(&["A", "B"], &[("A", "A1")]);
        assert!(forest.page(5, 3).is_empty());
        assert!(forest.page(1, 100).is_empty());
    }

    #[test]
    fn test_window_truncated_at_tree_end() {
        let forest = Forest::new(&["A", "B"], &[("A", "A1")]);
        assert_eq!(forest.page(10, 1), vec!["B", "A1"]);
    }

    #[test]
    fn test_huge_limit_does_not_overflow() {
        let forest = Forest::new(&["A"], &[]);
        assert_eq!(forest.page(usize::MAX, 0), vec!["A"]);
        assert!(forest.page(usize::MAX, usize::MAX).is_empty());
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        let depth = 50_000;
        let ids: Vec<String> = (0..depth).map(|i| format!("c{}", i)).collect();
        let children: HashMap<String, Vec<String>> = ids
            .windows(2)
            .map(|pair| (pair[0].clone(), vec![pair[1].clone()]))
            .collect();
        let roots = vec![ids[0].clone()];

        let page = paginate(&roots, 1, depth - 1, |id| {
            children.get(id).map(Vec::as_slice).unwrap_or(&[])
        });
        assert_eq!(page, vec![ids[depth - 1].as_str()]);
    }
}
