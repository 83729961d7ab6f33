//! Subzone layout strategies
//!
//! A layout produces a set of provisional node positions on an integer grid.
//! Connectivity and node types come later (mst / assign).

use rand::rngs::StdRng;
use rand::Rng;

/// Which placement strategy to use, chosen from difficulty and size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    /// Regular grid with random holes
    Grid,
    /// Binary space partition; one node per partition cell center
    Bsp,
    /// Random flood fill from the origin
    FloodFill,
}

impl LayoutKind {
    /// Pick a layout: cramped easy subzones use grids, deeper ones meander
    pub fn choose(difficulty: u8, size_estimate: u32) -> Self {
        match (difficulty, size_estimate) {
            (0..=6, _) => Self::Grid,
            (7..=13, s) if s >= 12 => Self::Bsp,
            (7..=13, _) => Self::FloodFill,
            _ => Self::FloodFill,
        }
    }
}

/// Clamp the node count to something a subzone can carry
pub fn node_budget(size_estimate: u32) -> usize {
    (size_estimate as usize).clamp(8, 24)
}

/// Produce node positions for the given layout. Positions are unique.
pub fn place_nodes(kind: LayoutKind, count: usize, rng: &mut StdRng) -> Vec<(i32, i32)> {
    match kind {
        LayoutKind::Grid => grid(count, rng),
        LayoutKind::Bsp => bsp(count, rng),
        LayoutKind::FloodFill => flood_fill(count, rng),
    }
}

fn grid(count: usize, rng: &mut StdRng) -> Vec<(i32, i32)> {
    // Smallest square grid that fits the count, then knock random holes out
    let side = (count as f64).sqrt().ceil() as i32;
    let mut cells: Vec<(i32, i32)> = (0..side)
        .flat_map(|y| (0..side).map(move |x| (x, y)))
        .collect();
    while cells.len() > count {
        let index = rng.gen_range(0..cells.len());
        cells.swap_remove(index);
    }
    cells
}

fn bsp(count: usize, rng: &mut StdRng) -> Vec<(i32, i32)> {
    // Recursively split a rectangle; cell centers become nodes
    let mut regions = vec![(0i32, 0i32, 16i32, 16i32)];
    while regions.len() < count {
        // split the largest region
        let (index, _) = match regions
            .iter()
            .enumerate()
            .max_by_key(|(_, (_, _, w, h))| w * h)
        {
            Some(found) => found,
            None => break,
        };
        let (x, y, w, h) = regions.swap_remove(index);
        if w <= 2 && h <= 2 {
            regions.push((x, y, w, h));
            break;
        }
        if w >= h {
            let cut = rng.gen_range(1..w.max(2));
            regions.push((x, y, cut, h));
            regions.push((x + cut, y, w - cut, h));
        } else {
            let cut = rng.gen_range(1..h.max(2));
            regions.push((x, y, w, cut));
            regions.push((x, y + cut, w, h - cut));
        }
    }
    let mut positions: Vec<(i32, i32)> = regions
        .into_iter()
        .take(count)
        .map(|(x, y, w, h)| (x + w / 2, y + h / 2))
        .collect();
    dedup_positions(&mut positions);
    positions
}

fn flood_fill(count: usize, rng: &mut StdRng) -> Vec<(i32, i32)> {
    let mut accepted = vec![(0, 0)];
    let mut frontier = vec![(0, 0)];
    while accepted.len() < count && !frontier.is_empty() {
        let index = rng.gen_range(0..frontier.len());
        let (x, y) = frontier[index];
        let candidates = [(x + 1, y), (x - 1, y), (x, y + 1), (x, y - 1)];
        let open: Vec<_> = candidates
            .into_iter()
            .filter(|c| !accepted.contains(c))
            .collect();
        if open.is_empty() {
            frontier.swap_remove(index);
            continue;
        }
        let next = open[rng.gen_range(0..open.len())];
        accepted.push(next);
        frontier.push(next);
    }
    accepted
}

fn dedup_positions(positions: &mut Vec<(i32, i32)>) {
    let mut seen = std::collections::HashSet::new();
    positions.retain(|p| seen.insert(*p));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_layout_choice() {
        assert_eq!(LayoutKind::choose(2, 10), LayoutKind::Grid);
        assert_eq!(LayoutKind::choose(10, 20), LayoutKind::Bsp);
        assert_eq!(LayoutKind::choose(10, 8), LayoutKind::FloodFill);
        assert_eq!(LayoutKind::choose(18, 20), LayoutKind::FloodFill);
    }

    #[test]
    fn test_node_budget_clamped() {
        assert_eq!(node_budget(2), 8);
        assert_eq!(node_budget(15), 15);
        assert_eq!(node_budget(500), 24);
    }

    #[test]
    fn test_grid_produces_exact_count_of_unique_positions() {
        let mut rng = StdRng::seed_from_u64(5);
        let positions = place_nodes(LayoutKind::Grid, 10, &mut rng);
        assert_eq!(positions.len(), 10);
        let unique: std::collections::HashSet<_> = positions.iter().collect();
        assert_eq!(unique.len(), 10);
    }

    #[test]
    fn test_flood_fill_is_connected_by_adjacency() {
        let mut rng = StdRng::seed_from_u64(9);
        let positions = place_nodes(LayoutKind::FloodFill, 12, &mut rng);
        assert_eq!(positions.len(), 12);
        // every cell after the first touches an earlier cell
        for (i, (x, y)) in positions.iter().enumerate().skip(1) {
            let touches = positions[..i]
                .iter()
                .any(|(px, py)| (px - x).abs() + (py - y).abs() == 1);
            assert!(touches, "cell {i} is detached");
        }
    }

    #[test]
    fn test_same_seed_same_layout() {
        let a = place_nodes(LayoutKind::FloodFill, 15, &mut StdRng::seed_from_u64(3));
        let b = place_nodes(LayoutKind::FloodFill, 15, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }
}
