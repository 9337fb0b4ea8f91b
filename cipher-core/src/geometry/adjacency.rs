//! Phase adjacency from the voxel phase map.

use ndarray::{ArrayD, Axis, Slice, Zip};
use petgraph::graphmap::UnGraphMap;

/// Graph of phases that share at least one voxel face.
///
/// Nodes are phase indices; edge weights count the shared faces.
pub type PhaseAdjacency = UnGraphMap<usize, usize>;

/// Build the face-neighbour adjacency of all phases in the voxel map.
///
/// With `periodic`, voxels on opposite boundaries of each axis are also neighbours.
pub(crate) fn phase_adjacency(
    voxel_phase: &ArrayD<usize>,
    num_phases: usize,
    periodic: bool,
) -> PhaseAdjacency {
    let mut graph = PhaseAdjacency::with_capacity(num_phases, 0);
    for phase in 0..num_phases {
        graph.add_node(phase);
    }

    for axis in 0..voxel_phase.ndim() {
        let len = voxel_phase.len_of(Axis(axis));
        if len < 2 {
            continue;
        }
        let lower = voxel_phase.slice_axis(Axis(axis), Slice::from(..len - 1));
        let upper = voxel_phase.slice_axis(Axis(axis), Slice::from(1..));
        Zip::from(&lower)
            .and(&upper)
            .for_each(|&a, &b| add_face(&mut graph, a, b));

        if periodic {
            let first = voxel_phase.index_axis(Axis(axis), 0);
            let last = voxel_phase.index_axis(Axis(axis), len - 1);
            Zip::from(&first)
                .and(&last)
                .for_each(|&a, &b| add_face(&mut graph, a, b));
        }
    }
    graph
}

fn add_face(graph: &mut PhaseAdjacency, a: usize, b: usize) {
    if a == b {
        return;
    }
    match graph.edge_weight_mut(a, b) {
        Some(faces) => *faces += 1,
        None => {
            graph.add_edge(a, b, 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_quadrants() {
        let voxel_phase = array![[0, 0, 1, 1], [0, 0, 1, 1], [2, 2, 3, 3], [2, 2, 3, 3]].into_dyn();
        let graph = phase_adjacency(&voxel_phase, 4, false);

        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.edge_weight(0, 1), Some(&2));
        assert_eq!(graph.edge_weight(2, 0), Some(&2));
        assert!(!graph.contains_edge(0, 3));
        assert!(!graph.contains_edge(1, 2));
    }

    #[test]
    fn test_periodic() {
        let voxel_phase = array![[0, 1, 2]].into_dyn();
        let open = phase_adjacency(&voxel_phase, 3, false);
        assert!(!open.contains_edge(0, 2));

        let periodic = phase_adjacency(&voxel_phase, 3, true);
        assert_eq!(periodic.edge_weight(0, 2), Some(&1));
    }

    #[test]
    fn test_three_dimensional() {
        let mut voxel_phase = ndarray::Array3::<usize>::zeros((2, 2, 2));
        voxel_phase[[1, 1, 1]] = 1;
        let graph = phase_adjacency(&voxel_phase.into_dyn(), 2, false);
        assert_eq!(graph.edge_weight(0, 1), Some(&3));
    }
}
