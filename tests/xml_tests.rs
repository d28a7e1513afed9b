//! Integration-Tests fuer das Parsen kompletter TMX-Dokumente.

use approx::assert_relative_eq;
use glam::{IVec2, Vec2};
use tmx_tilemap::{parse_tilemap, Orientation, TextureRegion};

/// Ein Dokument, das alle Elementtypen einmal benutzt.
const FULL_DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.0" orientation="orthogonal" width="4" height="4" tilewidth="16" tileheight="16">
    <properties>
        <property name="name" value="testwelt"/>
    </properties>
    <tileset firstgid="1" name="terrain" tilewidth="16" tileheight="16">
        <tileoffset x="0" y="4"/>
        <image source="terrain.png" width="64" height="32"/>
        <tile id="0">
            <properties>
                <property name="begehbar" value="ja"/>
            </properties>
        </tile>
        <tile id="1">
            <animation>
                <frame tileid="2" duration="120"/>
                <frame tileid="3" duration="80"/>
            </animation>
        </tile>
        <properties>
            <property name="art" value="aussen"/>
        </properties>
    </tileset>
    <layer name="boden" opacity="0.8">
        <data encoding="csv">
            1,2,3,4,
            5,6,7,8,
            1,2,3,4,
            5,6,7,8
        </data>
    </layer>
    <layer name="deko" visible="0" offsetx="8" offsety="-4">
        <data encoding="csv">
            0,0,0,0,
            0,1,0,0,
            0,0,0,0,
            0,0,0,0
        </data>
    </layer>
    <objectgroup name="npcs">
        <object id="1" x="24" y="40" width="16" height="16" name="haendler" type="npc">
            <properties>
                <property name="dialog" value="willkommen"/>
            </properties>
        </object>
        <object id="2" x="56" y="8" name="wache" type="npc"/>
    </objectgroup>
</map>
"#;

#[test]
fn full_document_builds_complete_model() {
    let map = parse_tilemap(FULL_DOCUMENT).unwrap();

    assert_relative_eq!(map.version, 1.0);
    assert_eq!(map.orientation(), Orientation::Orthogonal);
    assert_eq!((map.width(), map.height()), (4, 4));
    assert_eq!(map.properties.get("name").map(String::as_str), Some("testwelt"));

    // Tileset: 64x32-Sheet mit 16er-Tiles ergibt 8 Tiles
    assert_eq!(map.tileset_count(), 1);
    let tileset = map.tileset("terrain").expect("Tileset erwartet");
    assert_eq!(tileset.first_gid, 1);
    assert_eq!(tileset.tile_count(), 8);
    assert_eq!(tileset.last_gid(), 8);
    assert_eq!(tileset.tile_offset, Vec2::new(0.0, 4.0));
    assert_eq!(tileset.properties.get("art").map(String::as_str), Some("aussen"));

    // Tile-Eigenschaften haengen am Tile, nicht am Tileset
    let begehbar = map.tile_data(1).expect("Tile-Daten erwartet");
    assert_eq!(begehbar.properties.get("begehbar").map(String::as_str), Some("ja"));
    assert!(tileset.properties.get("begehbar").is_none());

    // Animation: Frame-IDs sind lokale IDs plus first_gid
    let animiert = map.tile_data(2).expect("Tile-Daten erwartet");
    assert_eq!(animiert.animation.len(), 2);
    assert_eq!(animiert.animation[0].gid, 3);
    assert_eq!(animiert.animation[0].duration_ms, 120);
    assert_eq!(animiert.animation[1].gid, 4);

    let frames = map.animation_frames(animiert);
    assert_eq!(frames.len(), 2);
    assert!(matches!(frames[0].0, TextureRegion::SheetRect { .. }));

    // Layer
    assert_eq!(map.layer_count(), 2);
    let boden = map.layer("boden").expect("Layer erwartet");
    assert_relative_eq!(boden.opacity, 0.8);
    assert!(boden.visible);
    assert_eq!(boden.tile_gid_at(IVec2::new(0, 0)), Some(1));
    assert_eq!(boden.tile_gid_at(IVec2::new(3, 3)), Some(8));

    let deko = map.layer("deko").expect("Layer erwartet");
    assert!(!deko.visible);
    assert_eq!(deko.offset, Vec2::new(8.0, -4.0));
    assert_eq!(deko.occupied_cells().count(), 1);
    assert_eq!(deko.tile_gid_at(IVec2::new(1, 1)), Some(1));

    // Objekte
    let npcs = map.object_group("npcs").expect("Objektgruppe erwartet");
    assert_eq!(npcs.object_count(), 2);

    let haendler = npcs.object(1).expect("Objekt erwartet");
    assert_eq!(haendler.name, "haendler");
    assert_eq!(haendler.object_type, "npc");
    assert_eq!(haendler.size, Vec2::new(16.0, 16.0));
    assert_eq!(
        haendler.properties.get("dialog").map(String::as_str),
        Some("willkommen")
    );
    assert_eq!(haendler.tile_coord(&map.geometry()), IVec2::new(1, 2));

    let wache = npcs.object(2).expect("Objekt erwartet");
    assert_eq!(wache.size, Vec2::ZERO);
    assert!(wache.properties.is_empty());
    assert_eq!(wache.tile_coord(&map.geometry()), IVec2::new(3, 0));

    // Objektposition teilt sich den Platz mit dem Tile an seiner Koordinate
    assert_eq!(
        haendler.position_on_layer(boden, npcs.offset),
        boden.tile_position_at(IVec2::new(1, 2), Vec2::ZERO)
    );
}

#[test]
fn parsing_twice_yields_equal_models() {
    let first = parse_tilemap(FULL_DOCUMENT).unwrap();
    let second = parse_tilemap(FULL_DOCUMENT).unwrap();

    assert_eq!(first, second);
}

fn encoding_document(data_element: &str) -> String {
    format!(
        r#"
        <map version="1.0" orientation="orthogonal" width="2" height="2" tilewidth="16" tileheight="16">
            <tileset firstgid="1" name="terrain" tilewidth="16" tileheight="16">
                <image source="terrain.png" width="32" height="32"/>
            </tileset>
            <layer name="boden">
                {data_element}
            </layer>
        </map>
        "#
    )
}

#[test]
fn all_three_encodings_populate_identical_grids() {
    // Logische Folge: [1, 0, 2, 3]
    let xml_inline = encoding_document(
        r#"<data>
            <tile gid="1"/>
            <tile gid="0"/>
            <tile gid="2"/>
            <tile gid="3"/>
        </data>"#,
    );
    let csv = encoding_document(
        r#"<data encoding="csv">
            1,0,
            2,3
        </data>"#,
    );
    let base64 = encoding_document(r#"<data encoding="base64">AQAAAAAAAAACAAAAAwAAAA==</data>"#);

    let from_xml = parse_tilemap(&xml_inline).unwrap();
    let from_csv = parse_tilemap(&csv).unwrap();
    let from_base64 = parse_tilemap(&base64).unwrap();

    let layer_xml = from_xml.layer("boden").expect("Layer erwartet");
    let layer_csv = from_csv.layer("boden").expect("Layer erwartet");
    let layer_base64 = from_base64.layer("boden").expect("Layer erwartet");

    assert_eq!(layer_xml, layer_csv);
    assert_eq!(layer_csv, layer_base64);

    assert_eq!(layer_xml.tile_gid_at(IVec2::new(0, 0)), Some(1));
    assert_eq!(layer_xml.tile_gid_at(IVec2::new(1, 0)), None);
    assert_eq!(layer_xml.tile_gid_at(IVec2::new(0, 1)), Some(2));
    assert_eq!(layer_xml.tile_gid_at(IVec2::new(1, 1)), Some(3));
}

#[test]
fn base64_data_with_wrapped_lines_decodes() {
    let wrapped = encoding_document(
        "<data encoding=\"base64\">\n            AQAAAAAAAAAC\n            AAAAAwAAAA==\n        </data>",
    );

    let map = parse_tilemap(&wrapped).unwrap();
    let layer = map.layer("boden").expect("Layer erwartet");
    assert_eq!(layer.tile_gid_at(IVec2::new(1, 1)), Some(3));
}

#[test]
fn duplicate_layer_name_in_document_aborts() {
    let xml = r#"
    <map version="1.0" orientation="orthogonal" width="1" height="1" tilewidth="16" tileheight="16">
        <layer name="boden"><data encoding="csv">0</data></layer>
        <layer name="boden"><data encoding="csv">0</data></layer>
    </map>
    "#;

    let err = parse_tilemap(xml).expect_err("Parser sollte fehlschlagen");
    assert!(format!("{err:#}").contains("doppelt"));
}

#[test]
fn tileset_before_map_aborts() {
    let xml = r#"<tileset firstgid="1" name="terrain" tilewidth="16" tileheight="16"/>"#;

    let err = parse_tilemap(xml).expect_err("Parser sollte fehlschlagen");
    assert!(format!("{err:#}").contains("<map>"));
}

#[test]
fn collection_tileset_uses_per_tile_images() {
    let xml = r#"
    <map version="1.0" orientation="isometric" width="2" height="2" tilewidth="64" tileheight="32">
        <tileset firstgid="1" name="moebel" tilewidth="64" tileheight="32">
            <tile id="0">
                <image source="bilder/tisch.png"/>
            </tile>
            <tile id="3">
                <image source="bilder/stuhl.png"/>
            </tile>
        </tileset>
    </map>
    "#;

    let map = parse_tilemap(xml).unwrap();
    let tileset = map.tileset("moebel").expect("Tileset erwartet");

    assert_eq!(tileset.tile_count(), 2);
    assert_eq!(
        map.tile_data(1).map(|d| &d.region),
        Some(&TextureRegion::Image { source: "bilder/tisch.png".to_string() })
    );
    assert_eq!(
        map.tile_data(4).map(|d| &d.region),
        Some(&TextureRegion::Image { source: "bilder/stuhl.png".to_string() })
    );

    let found = tileset.tile_data_by_source("stuhl").expect("Lookup erwartet");
    assert_eq!(found.gid, 4);
}

#[test]
fn isometric_map_round_trips_coordinates() {
    let xml = r#"
    <map version="1.0" orientation="isometric" width="3" height="3" tilewidth="64" tileheight="32">
        <layer name="boden">
            <data encoding="csv">0,0,0,0,0,0,0,0,0</data>
        </layer>
    </map>
    "#;

    let map = parse_tilemap(xml).unwrap();
    let layer = map.layer("boden").expect("Layer erwartet");

    for y in 0..3 {
        for x in 0..3 {
            let coord = IVec2::new(x, y);
            let position = layer.tile_position_at(coord, Vec2::ZERO);
            assert_eq!(
                layer.coord_at_position(position, Vec2::ZERO, true),
                Some(coord)
            );
        }
    }
}
