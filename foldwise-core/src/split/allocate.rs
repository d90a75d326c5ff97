//! Controlled rounding of per-class counts across groups.
//!
//! Given class totals `n_c` and group sizes `s_g` with equal sums `N`, the
//! ideal share of class `c` in group `g` is `n_c * s_g / N`. `allocate`
//! returns an integer table whose cells are each the floor or the ceiling
//! of that share while rows still sum to `n_c` and columns to `s_g`.
//!
//! Such a table always exists (the ideal table is a point of an integral
//! transportation polytope). It is found by starting from the floors and
//! placing the remaining units with augmenting paths.

/// Allocate `class_counts` over `group_sizes`. Returns `[class][group]`.
pub(crate) fn allocate(class_counts: &[usize], group_sizes: &[usize]) -> Vec<Vec<usize>> {
    let n_classes = class_counts.len();
    let n_groups = group_sizes.len();
    let total: usize = class_counts.iter().sum();
    debug_assert_eq!(total, group_sizes.iter().sum::<usize>());

    let mut table = vec![vec![0usize; n_groups]; n_classes];
    if total == 0 {
        return table;
    }

    let mut fractional = vec![vec![false; n_groups]; n_classes];
    let mut group_room = group_sizes.to_vec();
    let mut class_short = vec![0usize; n_classes];
    for c in 0..n_classes {
        for g in 0..n_groups {
            let product = class_counts[c] * group_sizes[g];
            table[c][g] = product / total;
            fractional[c][g] = product % total != 0;
            group_room[g] -= table[c][g];
        }
        class_short[c] = class_counts[c] - table[c].iter().sum::<usize>();
    }

    let mut extra = vec![vec![false; n_groups]; n_classes];
    for c in 0..n_classes {
        for _ in 0..class_short[c] {
            let mut visited = vec![false; n_groups];
            let placed = augment(c, &fractional, &mut extra, &mut group_room, &mut visited);
            debug_assert!(placed, "controlled rounding must always exist");
            if !placed {
                // Unreachable in theory; keep the totals exact regardless.
                if let Some(g) = group_room.iter().position(|&room| room > 0) {
                    group_room[g] -= 1;
                    table[c][g] += 1;
                }
            }
        }
    }

    for c in 0..n_classes {
        for g in 0..n_groups {
            if extra[c][g] {
                table[c][g] += 1;
            }
        }
    }
    table
}

/// Find a group for one more unit of class `c`, possibly moving another
/// class's extra unit out of the way.
fn augment(
    c: usize,
    fractional: &[Vec<bool>],
    extra: &mut [Vec<bool>],
    group_room: &mut [usize],
    visited: &mut [bool],
) -> bool {
    for g in 0..group_room.len() {
        if !fractional[c][g] || extra[c][g] || visited[g] {
            continue;
        }
        visited[g] = true;
        if group_room[g] > 0 {
            group_room[g] -= 1;
            extra[c][g] = true;
            return true;
        }
        for other in 0..extra.len() {
            if other == c || !extra[other][g] {
                continue;
            }
            extra[other][g] = false;
            if augment(other, fractional, extra, group_room, visited) {
                extra[c][g] = true;
                return true;
            }
            extra[other][g] = true;
        }
    }
    false
}
