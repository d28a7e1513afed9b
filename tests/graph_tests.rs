//! Integration-Tests fuer den Pathfinding-Graphen.

use glam::IVec2;
use tmx_tilemap::{parse_tilemap, TileGraph};

#[test]
fn open_grid_path_has_manhattan_length() {
    let graph = TileGraph::new(4, 4, false);

    let path = graph
        .find_path(IVec2::new(0, 0), IVec2::new(3, 3), false)
        .expect("Pfad erwartet");

    // Ohne Diagonalen: Manhattan-Distanz, Start nicht enthalten
    assert_eq!(path.len(), 6);
    assert_eq!(path.last(), Some(&IVec2::new(3, 3)));
    assert_ne!(path.first(), Some(&IVec2::new(0, 0)));
}

#[test]
fn removing_nodes_forces_detour_or_blocks() {
    let mut graph = TileGraph::new(4, 4, false);

    // Korridor bei x=1 halb schliessen: Umweg bleibt moeglich
    assert!(graph.remove_node(IVec2::new(1, 0)));
    assert!(graph.remove_node(IVec2::new(1, 1)));

    let detour = graph
        .find_path(IVec2::new(0, 0), IVec2::new(3, 3), false)
        .expect("Umweg erwartet");
    assert_eq!(detour.len(), 6);
    assert!(!detour.contains(&IVec2::new(1, 0)));
    assert!(!detour.contains(&IVec2::new(1, 1)));

    // Spalte komplett schliessen: keine Route mehr
    assert!(graph.remove_node(IVec2::new(1, 2)));
    assert!(graph.remove_node(IVec2::new(1, 3)));
    assert!(graph
        .find_path(IVec2::new(0, 0), IVec2::new(3, 3), false)
        .is_none());
}

#[test]
fn reset_restores_original_path_length() {
    let mut graph = TileGraph::new(4, 4, false);
    let original = graph
        .find_path(IVec2::new(0, 0), IVec2::new(3, 3), false)
        .expect("Pfad erwartet")
        .len();

    for y in 0..4 {
        graph.remove_node(IVec2::new(1, y));
    }
    assert!(graph
        .find_path(IVec2::new(0, 0), IVec2::new(3, 3), false)
        .is_none());

    graph.reset();
    assert_eq!(graph.removed_count(), 0);

    let restored = graph
        .find_path(IVec2::new(0, 0), IVec2::new(3, 3), false)
        .expect("Pfad erwartet")
        .len();
    assert_eq!(restored, original);
}

#[test]
fn next_position_returns_first_step_and_distance() {
    let graph = TileGraph::new(4, 4, false);

    let (step, distance) = graph
        .next_position(IVec2::new(0, 0), IVec2::new(3, 0))
        .expect("Schritt erwartet");

    assert_eq!(step, IVec2::new(1, 0));
    assert_eq!(distance, 3);
}

#[test]
fn diagonal_grid_shortens_paths() {
    let graph = TileGraph::new(4, 4, true);

    let path = graph
        .find_path(IVec2::new(0, 0), IVec2::new(3, 3), false)
        .expect("Pfad erwartet");
    assert_eq!(path.len(), 3);
}

const COLLISION_DOCUMENT: &str = r#"
<map version="1.0" orientation="orthogonal" width="4" height="4" tilewidth="16" tileheight="16">
    <tileset firstgid="1" name="terrain" tilewidth="16" tileheight="16">
        <image source="terrain.png" width="32" height="32"/>
        <tile id="0">
            <properties>
                <property name="blockiert" value="ja"/>
            </properties>
        </tile>
    </tileset>
    <layer name="waende">
        <data encoding="csv">
            0,1,0,0,
            0,1,0,0,
            0,1,0,0,
            0,0,0,0
        </data>
    </layer>
    <layer name="boden">
        <data encoding="csv">
            2,2,2,2,
            2,2,2,2,
            2,2,2,2,
            2,2,2,2
        </data>
    </layer>
</map>
"#;

#[test]
fn graph_from_layer_treats_occupied_cells_as_obstacles() {
    let map = parse_tilemap(COLLISION_DOCUMENT).unwrap();
    let graph = TileGraph::from_layer(&map, "waende", false).expect("Graph erwartet");

    assert_eq!(graph.node_count(), 13);
    assert!(!graph.contains(IVec2::new(1, 0)));

    // Der Weg nach rechts muss unten um die Wand herum
    let path = graph
        .find_path(IVec2::new(0, 0), IVec2::new(3, 0), false)
        .expect("Pfad erwartet");
    assert_eq!(path.len(), 9);
}

#[test]
fn graph_from_unknown_layer_is_an_error() {
    let map = parse_tilemap(COLLISION_DOCUMENT).unwrap();
    assert!(TileGraph::from_layer(&map, "gibtsnicht", false).is_err());
    assert!(TileGraph::from_property(&map, "blockiert", Some(&["gibtsnicht"]), false).is_err());
}

#[test]
fn graph_from_property_scans_selected_layers() {
    let map = parse_tilemap(COLLISION_DOCUMENT).unwrap();

    // Nur Tiles mit der Eigenschaft blockieren; der volle Boden-Layer
    // (GID 2, ohne Eigenschaft) traegt keine Hindernisse bei
    let graph = TileGraph::from_property(&map, "blockiert", None, false).expect("Graph erwartet");
    assert_eq!(graph.node_count(), 13);

    let restricted = TileGraph::from_property(&map, "blockiert", Some(&["boden"]), false)
        .expect("Graph erwartet");
    assert_eq!(restricted.node_count(), 16);
}

#[test]
fn reopened_door_becomes_walkable_again() {
    let map = parse_tilemap(COLLISION_DOCUMENT).unwrap();
    let mut graph = TileGraph::from_layer(&map, "waende", false).expect("Graph erwartet");

    // Tuer bei (1,1) oeffnen: Hindernis-Knoten wieder einsetzen
    assert!(graph.add_node(IVec2::new(1, 1)));

    let path = graph
        .find_path(IVec2::new(0, 1), IVec2::new(2, 1), false)
        .expect("Pfad erwartet");
    assert_eq!(path, vec![IVec2::new(1, 1), IVec2::new(2, 1)]);
}
