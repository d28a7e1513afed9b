//! Die zentrale Tilemap-Datenstruktur: Tilesets, Layer und Objektgruppen.

use anyhow::{bail, Result};
use glam::IVec2;
use indexmap::IndexMap;

use super::{
    MapGeometry, ObjectGroup, Orientation, Properties, TextureRegion, TileData, TileLayer,
    Tileset,
};

/// Eine vollstaendig geladene Tilemap. Wird von genau einem Parser-Durchlauf
/// aufgebaut und danach nur noch gelesen; einzig Layer-Zellen duerfen durch
/// den besitzenden Aufrufer weiter veraendert werden.
#[derive(Debug, Clone, PartialEq)]
pub struct Tilemap {
    /// Formatversion des Dokuments
    pub version: f64,
    /// Freie Eigenschaften
    pub properties: Properties,
    geometry: MapGeometry,
    tilesets: IndexMap<String, Tileset>,
    layers: IndexMap<String, TileLayer>,
    object_groups: IndexMap<String, ObjectGroup>,
}

impl Tilemap {
    /// Erstellt eine leere Tilemap mit fester Geometrie.
    pub fn new(
        version: f64,
        width: u32,
        height: u32,
        tile_width: u32,
        tile_height: u32,
        orientation: Orientation,
    ) -> Self {
        Self {
            version,
            properties: Properties::default(),
            geometry: MapGeometry {
                width,
                height,
                tile_width,
                tile_height,
                orientation,
            },
            tilesets: IndexMap::new(),
            layers: IndexMap::new(),
            object_groups: IndexMap::new(),
        }
    }

    /// Rastergeometrie der Karte.
    pub fn geometry(&self) -> MapGeometry {
        self.geometry
    }

    /// Kartenbreite in Tiles.
    pub fn width(&self) -> u32 {
        self.geometry.width
    }

    /// Kartenhoehe in Tiles.
    pub fn height(&self) -> u32 {
        self.geometry.height
    }

    /// Projektion der Karte.
    pub fn orientation(&self) -> Orientation {
        self.geometry.orientation
    }

    // ── Tilesets ───────────────────────────────────────────────

    /// Fuegt ein Tileset hinzu. Ein bereits vorhandener Name wird abgewiesen;
    /// das bestehende Tileset bleibt unveraendert.
    pub fn add_tileset(&mut self, tileset: Tileset) -> Option<&mut Tileset> {
        if self.tilesets.contains_key(&tileset.name) {
            log::warn!("Tileset '{}' existiert bereits", tileset.name);
            return None;
        }

        let name = tileset.name.clone();
        Some(self.tilesets.entry(name).or_insert(tileset))
    }

    /// Tileset mit einem bestimmten Namen.
    pub fn tileset(&self, name: &str) -> Option<&Tileset> {
        self.tilesets.get(name)
    }

    pub(crate) fn tileset_mut(&mut self, name: &str) -> Option<&mut Tileset> {
        self.tilesets.get_mut(name)
    }

    /// Iterator ueber alle Tilesets in Dokumentreihenfolge.
    pub fn tilesets(&self) -> impl Iterator<Item = &Tileset> {
        self.tilesets.values()
    }

    /// Anzahl der Tilesets.
    pub fn tileset_count(&self) -> usize {
        self.tilesets.len()
    }

    /// Kartenweite Tile-Daten-Suche ueber alle Tilesets.
    pub fn tile_data(&self, gid: u32) -> Option<&TileData> {
        self.tilesets.values().find_map(|t| t.tile_data(gid))
    }

    /// Tileset, das die GID enthaelt.
    pub fn tileset_containing(&self, gid: u32) -> Option<&Tileset> {
        self.tilesets
            .values()
            .find(|t| t.tile_data(gid).is_some())
    }

    // ── Layer ──────────────────────────────────────────────────

    /// Fuegt einen Layer hinzu. Ein bereits vorhandener Name wird abgewiesen;
    /// der bestehende Layer bleibt unveraendert.
    pub fn add_layer(&mut self, layer: TileLayer) -> Option<&mut TileLayer> {
        if self.layers.contains_key(&layer.name) {
            log::warn!("Layer '{}' existiert bereits", layer.name);
            return None;
        }

        let name = layer.name.clone();
        Some(self.layers.entry(name).or_insert(layer))
    }

    /// Layer mit einem bestimmten Namen.
    pub fn layer(&self, name: &str) -> Option<&TileLayer> {
        self.layers.get(name)
    }

    /// Veraenderbarer Zugriff auf einen Layer, z.B. zum Platzieren oder
    /// Entfernen einzelner Tiles.
    pub fn layer_mut(&mut self, name: &str) -> Option<&mut TileLayer> {
        self.layers.get_mut(name)
    }

    /// Entfernt einen Layer und gibt ihn zurueck.
    pub fn remove_layer(&mut self, name: &str) -> Option<TileLayer> {
        self.layers.shift_remove(name)
    }

    /// Iterator ueber alle Layer in Dokumentreihenfolge (Zeichenreihenfolge).
    pub fn layers(&self) -> impl Iterator<Item = &TileLayer> {
        self.layers.values()
    }

    /// Anzahl der Layer.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Platziert ein Tile per GID auf einem Layer. Die GID muss im Katalog
    /// der Karte existieren, sonst bleibt die Zelle unveraendert. Liefert
    /// den vorherigen Zellinhalt wie [`TileLayer::set_cell`].
    pub fn set_layer_tile(&mut self, layer: &str, coord: IVec2, gid: u32) -> Option<Option<u32>> {
        if self.tile_data(gid).is_none() {
            return None;
        }

        self.layers.get_mut(layer)?.set_cell(coord, Some(gid))
    }

    /// Befuellt das Raster eines Layers aus einer zeilenweise angeordneten
    /// GID-Folge (Index = y * Breite + x). Die Laenge muss exakt
    /// Breite x Hoehe betragen. GID 0 und GIDs ohne Katalogeintrag lassen die
    /// Zelle leer.
    pub fn fill_layer(&mut self, layer: &str, gids: &[u32]) -> Result<()> {
        let expected = (self.geometry.width * self.geometry.height) as usize;
        if gids.len() != expected {
            bail!(
                "Tile-Daten fuer Layer '{}' haben Laenge {}, erwartet {}",
                layer,
                gids.len(),
                expected
            );
        }

        // GIDs zuerst gegen den Katalog aufloesen, dann dem Layer zuweisen
        let cells: Vec<Option<u32>> = gids
            .iter()
            .map(|&gid| (gid != 0 && self.tile_data(gid).is_some()).then_some(gid))
            .collect();

        let Some(layer) = self.layers.get_mut(layer) else {
            bail!("Layer '{layer}' existiert nicht");
        };

        layer.set_cells(cells);
        Ok(())
    }

    // ── Objektgruppen ──────────────────────────────────────────

    /// Fuegt eine Objektgruppe hinzu. Ein bereits vorhandener Name wird
    /// abgewiesen; die bestehende Gruppe bleibt unveraendert.
    pub fn add_object_group(&mut self, group: ObjectGroup) -> Option<&mut ObjectGroup> {
        if self.object_groups.contains_key(&group.name) {
            log::warn!("Objektgruppe '{}' existiert bereits", group.name);
            return None;
        }

        let name = group.name.clone();
        Some(self.object_groups.entry(name).or_insert(group))
    }

    /// Objektgruppe mit einem bestimmten Namen.
    pub fn object_group(&self, name: &str) -> Option<&ObjectGroup> {
        self.object_groups.get(name)
    }

    pub(crate) fn object_group_mut(&mut self, name: &str) -> Option<&mut ObjectGroup> {
        self.object_groups.get_mut(name)
    }

    /// Iterator ueber alle Objektgruppen in Dokumentreihenfolge.
    pub fn object_groups(&self) -> impl Iterator<Item = &ObjectGroup> {
        self.object_groups.values()
    }

    /// Anzahl der Objektgruppen.
    pub fn object_group_count(&self) -> usize {
        self.object_groups.len()
    }

    // ── Animation ──────────────────────────────────────────────

    /// Loest die Animationssequenz eines Tiles kartenweit auf: pro Frame die
    /// Texturbeschreibung des Ziel-Tiles und die Anzeigedauer. Frames, deren
    /// GID nirgends registriert ist, werden uebersprungen.
    pub fn animation_frames(&self, tile: &TileData) -> Vec<(&TextureRegion, u32)> {
        tile.animation
            .iter()
            .filter_map(|frame| match self.tile_data(frame.gid) {
                Some(target) => Some((&target.region, frame.duration_ms)),
                None => {
                    log::warn!(
                        "Animationsframe mit GID {} von Tile {} ist nicht aufloesbar",
                        frame.gid,
                        tile.gid
                    );
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AnimationFrame;
    use glam::Vec2;

    fn test_map() -> Tilemap {
        Tilemap::new(1.0, 4, 3, 16, 16, Orientation::Orthogonal)
    }

    fn sheet_tileset(name: &str, first_gid: u32) -> Tileset {
        let mut tileset = Tileset::new(name, first_gid, 16, 16);
        // 2x2-Sheet: vier Tiles
        tileset.slice_sheet(&format!("{name}.png"), 32, 32);
        tileset
    }

    #[test]
    fn duplicate_names_are_rejected_and_leave_original() {
        let mut map = test_map();

        map.add_tileset(sheet_tileset("terrain", 1));
        assert!(map.add_tileset(Tileset::new("terrain", 99, 8, 8)).is_none());
        assert_eq!(map.tileset_count(), 1);
        assert_eq!(map.tileset("terrain").map(|t| t.first_gid), Some(1));

        map.add_layer(TileLayer::new("boden", map.geometry(), Vec2::ZERO));
        assert!(map
            .add_layer(TileLayer::new("boden", map.geometry(), Vec2::new(5.0, 5.0)))
            .is_none());
        assert_eq!(map.layer_count(), 1);
        assert_eq!(map.layer("boden").map(|l| l.offset), Some(Vec2::ZERO));

        map.add_object_group(ObjectGroup::new("npcs", Vec2::ZERO));
        assert!(map.add_object_group(ObjectGroup::new("npcs", Vec2::ZERO)).is_none());
        assert_eq!(map.object_group_count(), 1);
    }

    #[test]
    fn tile_data_lookup_spans_all_tilesets() {
        let mut map = test_map();
        map.add_tileset(sheet_tileset("terrain", 1));
        map.add_tileset(sheet_tileset("deko", 5));

        assert_eq!(map.tile_data(3).map(|d| d.tileset.as_str()), Some("terrain"));
        assert_eq!(map.tile_data(6).map(|d| d.tileset.as_str()), Some("deko"));
        assert!(map.tile_data(0).is_none());
        assert!(map.tile_data(42).is_none());

        assert_eq!(
            map.tileset_containing(6).map(|t| t.name.as_str()),
            Some("deko")
        );
    }

    #[test]
    fn fill_layer_validates_length_and_gids() {
        let mut map = test_map();
        map.add_tileset(sheet_tileset("terrain", 1));
        map.add_layer(TileLayer::new("boden", map.geometry(), Vec2::ZERO));

        // Falsche Laenge ist ein harter Fehler
        assert!(map.fill_layer("boden", &[1, 2, 3]).is_err());

        // GID 0 und unbekannte GIDs lassen Zellen leer
        let gids = [1, 0, 99, 4, 0, 0, 0, 0, 0, 0, 0, 2];
        map.fill_layer("boden", &gids).expect("Befuellen erwartet");

        let layer = map.layer("boden").expect("Layer erwartet");
        assert_eq!(layer.tile_gid_at(IVec2::new(0, 0)), Some(1));
        assert_eq!(layer.tile_gid_at(IVec2::new(1, 0)), None);
        assert_eq!(layer.tile_gid_at(IVec2::new(2, 0)), None);
        assert_eq!(layer.tile_gid_at(IVec2::new(3, 0)), Some(4));
        assert_eq!(layer.tile_gid_at(IVec2::new(3, 2)), Some(2));
    }

    #[test]
    fn set_layer_tile_requires_known_gid() {
        let mut map = test_map();
        map.add_tileset(sheet_tileset("terrain", 1));
        map.add_layer(TileLayer::new("boden", map.geometry(), Vec2::ZERO));

        assert_eq!(map.set_layer_tile("boden", IVec2::new(1, 1), 42), None);
        assert_eq!(
            map.set_layer_tile("boden", IVec2::new(1, 1), 2),
            Some(None)
        );
        assert_eq!(
            map.layer("boden").and_then(|l| l.tile_gid_at(IVec2::new(1, 1))),
            Some(2)
        );
    }

    #[test]
    fn remove_layer_returns_it() {
        let mut map = test_map();
        map.add_layer(TileLayer::new("boden", map.geometry(), Vec2::ZERO));

        let removed = map.remove_layer("boden").expect("Layer erwartet");
        assert_eq!(removed.name, "boden");
        assert!(map.layer("boden").is_none());
        assert!(map.remove_layer("boden").is_none());
    }

    #[test]
    fn animation_frames_resolve_across_tilesets() {
        let mut map = test_map();
        map.add_tileset(sheet_tileset("terrain", 1));
        map.add_tileset(sheet_tileset("effekte", 5));

        // Tile 1 animiert ueber ein Tile des anderen Tilesets und einen
        // nicht aufloesbaren Frame
        map.tileset_mut("terrain")
            .and_then(|t| t.tile_data_mut(1))
            .expect("Tile-Daten erwartet")
            .animation = vec![
            AnimationFrame { gid: 6, duration_ms: 120 },
            AnimationFrame { gid: 99, duration_ms: 120 },
            AnimationFrame { gid: 2, duration_ms: 80 },
        ];

        let tile = map.tile_data(1).expect("Tile-Daten erwartet").clone();
        let frames = map.animation_frames(&tile);

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].1, 120);
        assert_eq!(frames[1].1, 80);
    }
}
