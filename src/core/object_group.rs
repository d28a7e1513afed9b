//! Objektgruppen und deren freie Objekte.

use glam::{IVec2, Vec2};
use indexmap::IndexMap;

use super::{MapGeometry, Orientation, Properties, TileLayer};

/// Ein freies Objekt aus einer Objektgruppe. Die Rasterkoordinate wird aus
/// der Rohposition abgeleitet und nie gespeichert, damit sie nicht veralten
/// kann.
#[derive(Debug, Clone, PartialEq)]
pub struct MapObject {
    /// Eindeutige ID innerhalb der Gruppe
    pub id: u32,
    /// Pixel-Position wie im Dokument angegeben
    pub raw_position: Vec2,
    /// Groesse in Pixeln; (0,0) wenn das Dokument keine angibt
    pub size: Vec2,
    /// Anzeigename; leer wenn nicht gesetzt
    pub name: String,
    /// Typ-String; leer wenn nicht gesetzt
    pub object_type: String,
    /// Freie Eigenschaften
    pub properties: Properties,
}

impl MapObject {
    /// Nicht gerundete Rasterkoordinate des Objekts.
    pub fn coord(&self, geometry: &MapGeometry) -> Vec2 {
        let tile = Vec2::new(geometry.tile_width as f32, geometry.tile_height as f32);

        match geometry.orientation {
            Orientation::Orthogonal => self.raw_position / tile,
            Orientation::Isometric => Vec2::new(
                self.raw_position.x / (tile.x / 2.0),
                self.raw_position.y / tile.y,
            ),
        }
    }

    /// Rasterkoordinate des Objekts, floor-gerundet.
    pub fn tile_coord(&self, geometry: &MapGeometry) -> IVec2 {
        let coord = self.coord(geometry);
        IVec2::new(coord.x.floor() as i32, coord.y.floor() as i32)
    }

    /// Position des Objekts auf einem Layer; sie entspricht der Position des
    /// Tiles an der Objektkoordinate. Der Offset der besitzenden Gruppe wird
    /// dabei wie ein Tileset-Offset angewandt.
    pub fn position_on_layer(&self, layer: &TileLayer, group_offset: Vec2) -> Vec2 {
        layer.tile_position_at(self.tile_coord(layer.geometry()), group_offset)
    }
}

/// Eine Objektgruppe der Karte.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectGroup {
    /// Eindeutiger Name innerhalb der Karte
    pub name: String,
    /// Pixel-Offset der Gruppe
    pub offset: Vec2,
    /// Freie Eigenschaften
    pub properties: Properties,
    objects: IndexMap<u32, MapObject>,
}

impl ObjectGroup {
    /// Erstellt eine leere Objektgruppe.
    pub fn new(name: &str, offset: Vec2) -> Self {
        Self {
            name: name.to_string(),
            offset,
            properties: Properties::default(),
            objects: IndexMap::new(),
        }
    }

    /// Fuegt ein Objekt hinzu. Doppelte IDs werden abgewiesen; das bestehende
    /// Objekt bleibt unveraendert.
    pub fn add_object(&mut self, object: MapObject) -> Option<&mut MapObject> {
        if self.objects.contains_key(&object.id) {
            log::warn!(
                "Objektgruppe '{}': Objekt mit ID {} existiert bereits",
                self.name,
                object.id
            );
            return None;
        }

        Some(self.objects.entry(object.id).or_insert(object))
    }

    /// Objekt mit einer bestimmten ID.
    pub fn object(&self, id: u32) -> Option<&MapObject> {
        self.objects.get(&id)
    }

    pub(crate) fn object_mut(&mut self, id: u32) -> Option<&mut MapObject> {
        self.objects.get_mut(&id)
    }

    /// Anzahl der Objekte in der Gruppe.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Iterator ueber alle Objekte in Dokumentreihenfolge.
    pub fn objects(&self) -> impl Iterator<Item = &MapObject> {
        self.objects.values()
    }

    /// Alle Objekte mit passendem Namen.
    pub fn objects_named(&self, name: &str) -> Vec<&MapObject> {
        self.objects.values().filter(|o| o.name == name).collect()
    }

    /// Alle Objekte mit passendem Typ.
    pub fn objects_typed(&self, object_type: &str) -> Vec<&MapObject> {
        self.objects
            .values()
            .filter(|o| o.object_type == object_type)
            .collect()
    }

    /// Erstes Objekt an einer Rasterkoordinate.
    pub fn object_at_coord(&self, coord: IVec2, geometry: &MapGeometry) -> Option<&MapObject> {
        self.objects
            .values()
            .find(|o| o.tile_coord(geometry) == coord)
    }
}
