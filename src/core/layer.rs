//! Tile-Layer: dichtes Raster aus optionalen Tile-Platzierungen.

use glam::{IVec2, Vec2};

use super::{MapGeometry, Properties};

/// Ein Tile-Layer der Karte. Jede Zelle haelt hoechstens die GID eines Tiles;
/// die Weltposition einer Zelle wird nie gespeichert, sondern ueber die
/// Geometrie abgeleitet.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    /// Eindeutiger Name innerhalb der Karte
    pub name: String,
    /// Pixel-Offset des Layers
    pub offset: Vec2,
    /// Deckkraft in [0,1]
    pub opacity: f32,
    /// Sichtbarkeit fuer den Renderer
    pub visible: bool,
    /// Freie Eigenschaften
    pub properties: Properties,
    geometry: MapGeometry,
    cells: Vec<Option<u32>>,
}

impl TileLayer {
    /// Erstellt einen leeren Layer in der Groesse der Karte.
    pub fn new(name: &str, geometry: MapGeometry, offset: Vec2) -> Self {
        let cell_count = (geometry.width * geometry.height) as usize;

        Self {
            name: name.to_string(),
            offset,
            opacity: 1.0,
            visible: true,
            properties: Properties::default(),
            geometry,
            cells: vec![None; cell_count],
        }
    }

    /// Rastergeometrie der besitzenden Karte.
    pub fn geometry(&self) -> &MapGeometry {
        &self.geometry
    }

    /// Prueft ob die Koordinate innerhalb des Layers liegt.
    pub fn is_valid_coord(&self, coord: IVec2) -> bool {
        self.geometry.is_valid_coord(coord)
    }

    fn index(&self, coord: IVec2) -> Option<usize> {
        if !self.is_valid_coord(coord) {
            return None;
        }
        Some((coord.y as u32 * self.geometry.width + coord.x as u32) as usize)
    }

    /// GID an einer Koordinate; `None` bei leerer Zelle oder Koordinate
    /// ausserhalb des Rasters.
    pub fn tile_gid_at(&self, coord: IVec2) -> Option<u32> {
        self.cells.get(self.index(coord)?).copied().flatten()
    }

    /// Setzt oder leert eine Zelle. Liefert `None` wenn die Koordinate
    /// ausserhalb liegt (die Schreiboperation wird dann verworfen), sonst den
    /// vorherigen Zellinhalt.
    pub fn set_cell(&mut self, coord: IVec2, cell: Option<u32>) -> Option<Option<u32>> {
        let index = self.index(coord)?;
        let previous = self.cells[index];
        self.cells[index] = cell;
        Some(previous)
    }

    /// Leert eine Zelle und gibt die entfernte GID zurueck.
    pub fn remove_tile_at(&mut self, coord: IVec2) -> Option<u32> {
        self.set_cell(coord, None).flatten()
    }

    /// Leert alle Zellen.
    pub fn clear(&mut self) {
        self.cells.fill(None);
    }

    /// Ersetzt den gesamten Zellinhalt. Nur fuer den Parser gedacht, der die
    /// Laenge bereits gegen die Kartengroesse geprueft hat.
    pub(crate) fn set_cells(&mut self, cells: Vec<Option<u32>>) {
        debug_assert_eq!(cells.len(), self.cells.len());
        self.cells = cells;
    }

    /// Zaehlt alle belegten Zellen als (Koordinate, GID) auf, zeilenweise.
    /// Das ist die Aufzaehlung, die der Renderer konsumiert.
    pub fn occupied_cells(&self) -> impl Iterator<Item = (IVec2, u32)> + '_ {
        let width = self.geometry.width;
        self.cells.iter().enumerate().filter_map(move |(i, cell)| {
            let gid = (*cell)?;
            let coord = IVec2::new((i as u32 % width) as i32, (i as u32 / width) as i32);
            Some((coord, gid))
        })
    }

    /// Position eines Tiles dieses Layers fuer eine Rasterkoordinate.
    /// `tileset_offset` ist der Offset des Tilesets, dem das Tile angehoert.
    pub fn tile_position_at(&self, coord: IVec2, tileset_offset: Vec2) -> Vec2 {
        self.geometry
            .tile_position_at_coord(coord, self.offset, tileset_offset)
    }

    /// Rasterkoordinate fuer eine Position innerhalb dieses Layers.
    pub fn coord_at_position(
        &self,
        position: Vec2,
        tileset_offset: Vec2,
        bounds_checked: bool,
    ) -> Option<IVec2> {
        self.geometry
            .coord_at_position(position, self.offset, tileset_offset, bounds_checked)
    }

    /// GID des Tiles an einer Position innerhalb dieses Layers.
    pub fn tile_at_position(&self, position: Vec2) -> Option<u32> {
        let coord = self.coord_at_position(position, Vec2::ZERO, true)?;
        self.tile_gid_at(coord)
    }
}
