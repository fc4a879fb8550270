mod common;

use chunknav_waypoint::{ChunkState, PortalRef};
use common::{Row, assert_graph_consistent};
use proptest::prelude::*;

// edge 2 of the square is its x = 10 side, edge 0 its x = 0 side
const EAST_EDGE: u32 = 2;
const WEST_EDGE: u32 = 0;

#[test]
fn bind_connects_to_loaded_neighbour() {
    let mut row = Row::new(2, true);
    let (a, b) = (row.set(0), row.set(1));

    assert_eq!(row.space.chunk(row.chunks[1]).unwrap().state, ChunkState::Loaded);
    assert_eq!(row.space.bind_chunk(row.chunks[0]), 1);

    let set_a = row.space.set(a).unwrap();
    assert_eq!(set_a.connection_waypoint(EAST_EDGE), Some(b));
    assert_eq!(
        set_a.connection_portal(b),
        Some(PortalRef {
            chunk: row.chunks[0],
            index: 0
        })
    );
    assert_eq!(set_a.unbound_edge_count(), 0);
    assert_eq!(row.space.set(b).unwrap().backlinks(), &[a]);
    // b has not bound yet
    assert_eq!(row.space.set(b).unwrap().connection_waypoint(WEST_EDGE), None);
    assert_graph_consistent(&row.space);

    assert_eq!(row.space.bind_chunk(row.chunks[1]), 1);
    assert_eq!(row.space.set(b).unwrap().connection_waypoint(WEST_EDGE), Some(a));
    assert_eq!(row.space.set(a).unwrap().backlinks(), &[b]);
    assert_graph_consistent(&row.space);
}

#[test]
fn boundary_edges_keep_their_code() {
    let mut row = Row::new(2, true);
    row.space.bind_chunk(row.chunks[0]);
    row.space.bind_chunk(row.chunks[1]);

    let a = row.space.set(row.set(0)).unwrap();
    let edge = a.data().edges()[EAST_EDGE as usize];
    assert!(edge.adjacent_to_chunk());
    assert_eq!(edge.neighbouring_waypoint(), None);
}

#[test]
fn bind_without_neighbour_leaves_edge_pending() {
    let mut row = Row::new(2, true);
    row.space.unload_chunk(row.chunks[1]);

    assert_eq!(row.space.bind_chunk(row.chunks[0]), 0);
    let a = row.space.set(row.set(0)).unwrap();
    assert_eq!(a.connection_waypoint(EAST_EDGE), None);
    assert_eq!(a.unbound_edge_count(), 1);

    // the neighbour arriving later binds the waiting edge too
    row.reload(1);
    assert_eq!(row.space.bind_chunk(row.chunks[1]), 2);
    let (a, b) = (row.set(0), row.set(1));
    assert_eq!(row.space.set(a).unwrap().connection_waypoint(EAST_EDGE), Some(b));
    assert_graph_consistent(&row.space);
}

#[test]
fn unload_clears_links_into_chunk() {
    let mut row = Row::new(2, true);
    row.space.bind_chunk(row.chunks[0]);
    row.space.bind_chunk(row.chunks[1]);
    let a = row.set(0);

    row.space.unload_chunk(row.chunks[1]);
    let set_a = row.space.set(a).unwrap();
    assert!(set_a.connections().is_empty());
    assert!(set_a.edge_labels().is_empty());
    assert!(set_a.backlinks().is_empty());
    assert_eq!(row.space.sets().len(), 1);
    assert_eq!(row.space.chunk(row.chunks[1]).unwrap().state, ChunkState::Unloaded);
    assert_graph_consistent(&row.space);

    // rebinding a against an unloaded chunk finds nothing
    assert_eq!(row.space.bind_chunk(row.chunks[0]), 0);

    row.reload(1);
    row.space.bind_chunk(row.chunks[1]);
    let b = row.set(1);
    assert_eq!(row.space.set(a).unwrap().connection_waypoint(EAST_EDGE), Some(b));
    assert_eq!(row.space.set(b).unwrap().connection_waypoint(WEST_EDGE), Some(a));
    assert_graph_consistent(&row.space);
}

#[test]
fn binding_twice_changes_nothing() {
    let mut row = Row::new(3, true);
    for &chunk in &row.chunks.clone() {
        row.space.bind_chunk(chunk);
    }

    let snapshot = |row: &Row| {
        row.space
            .sets()
            .iter()
            .map(|(id, s)| (id, s.connections().clone(), s.edge_labels().clone(), s.backlinks().to_vec()))
            .collect::<Vec<_>>()
    };

    let before = snapshot(&row);
    for &chunk in &row.chunks.clone() {
        assert_eq!(row.space.bind_chunk(chunk), 0);
    }
    assert_eq!(before, snapshot(&row));
}

#[test]
fn middle_chunk_links_both_ways() {
    let mut row = Row::new(3, true);
    for &chunk in &row.chunks.clone() {
        row.space.bind_chunk(chunk);
    }
    let (a, b, c) = (row.set(0), row.set(1), row.set(2));

    let middle = row.space.set(b).unwrap();
    assert_eq!(middle.connection_waypoint(WEST_EDGE), Some(a));
    assert_eq!(middle.connection_waypoint(EAST_EDGE), Some(c));
    assert_eq!(middle.connection_portal(a).map(|p| p.index), Some(0));
    assert_eq!(middle.connection_portal(c).map(|p| p.index), Some(1));
    assert_eq!(middle.backlinks().len(), 2);

    // tearing down the middle leaves nothing pointing at it
    row.space.unload_chunk(row.chunks[1]);
    for id in [a, c] {
        let set = row.space.set(id).unwrap();
        assert!(set.connections().is_empty());
        assert!(set.backlinks().is_empty());
    }
    assert!(row.space.set(b).is_none());
    assert_graph_consistent(&row.space);
}

#[test]
fn indoor_chunks_bind_through_portal_polygons() {
    let mut row = Row::new(2, false);
    row.space.bind_chunk(row.chunks[0]);
    row.space.bind_chunk(row.chunks[1]);
    let (a, b) = (row.set(0), row.set(1));

    assert_eq!(row.space.set(a).unwrap().connection_waypoint(EAST_EDGE), Some(b));
    assert_eq!(row.space.set(b).unwrap().connection_waypoint(WEST_EDGE), Some(a));
    assert_graph_consistent(&row.space);
}

#[test]
fn delete_connection_removes_labels_and_backlink() {
    let mut row = Row::new(2, true);
    row.space.bind_chunk(row.chunks[0]);
    row.space.bind_chunk(row.chunks[1]);
    let (a, b) = (row.set(0), row.set(1));

    assert!(row.space.delete_connection(a, b));
    assert!(!row.space.delete_connection(a, b));

    let set_a = row.space.set(a).unwrap();
    assert_eq!(set_a.connection_waypoint(EAST_EDGE), None);
    assert!(set_a.connections().is_empty());
    assert!(row.space.set(b).unwrap().backlinks().is_empty());
    // the other direction is untouched
    assert_eq!(row.space.set(b).unwrap().connection_waypoint(WEST_EDGE), Some(a));
    assert_graph_consistent(&row.space);
}

#[test]
fn connect_ignores_interior_edges() {
    let mut row = Row::new(2, true);
    let (a, b) = (row.set(0), row.set(1));
    let portal = PortalRef {
        chunk: row.chunks[0],
        index: 0,
    };

    // edge 1 is an ordinary edge
    row.space.connect(a, b, portal, 1);
    assert!(row.space.set(a).unwrap().connections().is_empty());
    assert!(row.space.set(b).unwrap().backlinks().is_empty());
}

#[test]
fn remove_chunk_unbinds_portals() {
    let mut row = Row::new(2, true);
    row.space.bind_chunk(row.chunks[0]);
    row.space.bind_chunk(row.chunks[1]);

    let removed = row.space.remove_chunk(row.chunks[1]).unwrap();
    assert_eq!(removed.identifier, "c01o");
    assert!(row.space.chunk_by_name("c01o").is_none());
    let a = row.space.chunk(row.chunks[0]).unwrap();
    assert!(a.portals().all(|p| p.target_chunk().is_none()));
    assert_graph_consistent(&row.space);
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Unload(usize),
    Load(usize),
    Bind(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..3usize).prop_map(Op::Unload),
        (0..3usize).prop_map(Op::Load),
        (0..3usize).prop_map(Op::Bind),
    ]
}

proptest! {
    // Links stay mirrored through any sequence of streaming operations.
    #[test]
    fn streaming_keeps_links_mirrored(ops in proptest::collection::vec(arb_op(), 1..24)) {
        let mut row = Row::new(3, true);

        for op in ops {
            match op {
                Op::Unload(i) => row.space.unload_chunk(row.chunks[i]),
                Op::Load(i) => {
                    if row.space.chunk(row.chunks[i]).unwrap().state == ChunkState::Unloaded {
                        row.reload(i);
                    }
                }
                Op::Bind(i) => {
                    row.space.bind_chunk(row.chunks[i]);
                }
            }
            assert_graph_consistent(&row.space);
        }

        // once everything is loaded and bound, every boundary edge resolves
        for i in 0..3 {
            if row.space.chunk(row.chunks[i]).unwrap().state == ChunkState::Unloaded {
                row.reload(i);
            }
        }
        for i in 0..3 {
            row.space.bind_chunk(row.chunks[i]);
        }
        for (_, set) in row.space.sets() {
            prop_assert_eq!(set.unbound_edge_count(), 0);
        }
        assert_graph_consistent(&row.space);
    }
}
