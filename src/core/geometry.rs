//! Reine Koordinaten-Transformationen zwischen Tile-Raster und Layer-Positionen.

use glam::{IVec2, Vec2};

use super::Orientation;

/// Unveraenderliche Rastergeometrie einer Karte. Wird als Wert in Layer und
/// Objektgruppen kopiert und ersetzt damit die Rueckreferenz auf die Karte.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapGeometry {
    /// Kartenbreite in Tiles
    pub width: u32,
    /// Kartenhoehe in Tiles
    pub height: u32,
    /// Tile-Breite in Pixeln
    pub tile_width: u32,
    /// Tile-Hoehe in Pixeln
    pub tile_height: u32,
    /// Projektion der Karte
    pub orientation: Orientation,
}

impl MapGeometry {
    fn tile_size(&self) -> Vec2 {
        Vec2::new(self.tile_width as f32, self.tile_height as f32)
    }

    /// Prueft ob die Koordinate innerhalb von [0,width) x [0,height) liegt.
    pub fn is_valid_coord(&self, coord: IVec2) -> bool {
        coord.x >= 0
            && coord.x < self.width as i32
            && coord.y >= 0
            && coord.y < self.height as i32
    }

    /// Position eines Tiles innerhalb seines Layers fuer eine Rasterkoordinate.
    /// `layer_offset` ist der Pixel-Offset des Layers, `tileset_offset` der des
    /// Tilesets, dem das Tile angehoert.
    pub fn tile_position_at_coord(
        &self,
        coord: IVec2,
        layer_offset: Vec2,
        tileset_offset: Vec2,
    ) -> Vec2 {
        let anchor = self.orientation.tile_anchor_point();
        let tile = self.tile_size();
        let half = tile * 0.5;
        let (x, y) = (coord.x as f32, coord.y as f32);

        let position = match self.orientation {
            Orientation::Orthogonal => Vec2::new(
                x * tile.x + anchor.x * tile.x,
                -y * tile.y - (tile.y - anchor.y * tile.y),
            ),
            Orientation::Isometric => Vec2::new(
                (x - y) * half.x - (half.x - anchor.x * tile.x),
                -(x + y) * half.y - (tile.y - anchor.y * tile.y),
            ),
        };

        position + anchor_relative_shift(layer_offset, anchor)
            + anchor_relative_shift(tileset_offset, anchor)
    }

    /// Nicht gerundete Rasterkoordinate fuer eine Layer-Position. Der
    /// Nachkommaanteil beschreibt, wo innerhalb des Tiles die Position liegt.
    pub fn fractional_coord_at_position(
        &self,
        position: Vec2,
        layer_offset: Vec2,
        tileset_offset: Vec2,
    ) -> Vec2 {
        let anchor = self.orientation.tile_anchor_point();
        let tile = self.tile_size();
        let half = tile * 0.5;

        // Offsets exakt herausrechnen, damit Hin- und Ruecktransformation
        // fuer beliebige Offsets invers zueinander bleiben.
        let position = position
            - anchor_relative_shift(layer_offset, anchor)
            - anchor_relative_shift(tileset_offset, anchor);

        match self.orientation {
            Orientation::Orthogonal => Vec2::new(position.x / tile.x, position.y / -tile.y),
            Orientation::Isometric => Vec2::new(
                ((position.x / half.x) + (position.y / -half.y)) / 2.0,
                ((position.y / -half.y) - (position.x / half.x)) / 2.0,
            ),
        }
    }

    /// Rasterkoordinate fuer eine Layer-Position, immer floor-gerundet, damit
    /// die Zuordnung an Tile-Grenzen lueckenlos und ueberlappungsfrei bleibt.
    /// Mit `bounds_checked` liefern Koordinaten ausserhalb der Karte `None`;
    /// ohne sind auch spekulative Abfragen jenseits des Randes erlaubt.
    pub fn coord_at_position(
        &self,
        position: Vec2,
        layer_offset: Vec2,
        tileset_offset: Vec2,
        bounds_checked: bool,
    ) -> Option<IVec2> {
        let coord = self.fractional_coord_at_position(position, layer_offset, tileset_offset);
        let floored = IVec2::new(coord.x.floor() as i32, coord.y.floor() as i32);

        if bounds_checked && !self.is_valid_coord(floored) {
            return None;
        }

        Some(floored)
    }
}

/// Verschiebt einen Pixel-Offset relativ zum Tile-Anker in Weltrichtung.
/// Die y-Achse kippt dabei, weil das Dokument top-down, die Welt bottom-up
/// orientiert ist.
fn anchor_relative_shift(offset: Vec2, anchor: Vec2) -> Vec2 {
    Vec2::new(
        offset.x - anchor.x * offset.x,
        -(offset.y - anchor.y * offset.y),
    )
}
