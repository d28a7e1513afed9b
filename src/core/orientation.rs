//! Kartenprojektionen und deren Tile-Ankerpunkte.

use glam::Vec2;

/// Projektion der Karte: Zuordnung zwischen Tile-Raster und Weltpositionen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Rechteckiges Raster
    Orthogonal,
    /// Rautenfoermiges Raster
    Isometric,
}

impl Orientation {
    /// Parsed den Wert des TMX-Attributs `orientation`.
    pub fn from_tmx_name(name: &str) -> Option<Self> {
        match name {
            "orthogonal" => Some(Self::Orthogonal),
            "isometric" => Some(Self::Isometric),
            _ => None,
        }
    }

    /// Ankerpunkt eines Tiles innerhalb seiner Bounding-Box (Anteile in [0,1]).
    /// Hier anpassen, wenn Tiles mit einem anderen Ursprung platziert werden sollen.
    pub fn tile_anchor_point(&self) -> Vec2 {
        match self {
            Self::Orthogonal => Vec2::new(0.5, 0.5),
            Self::Isometric => Vec2::new(0.5, 0.5),
        }
    }
}
