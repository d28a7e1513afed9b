//! TMX-Tilemap-Kern.
//! Dokumentmodell, Koordinaten-Transformationen und Grid-Pathfinding fuer
//! Tiled-Karten, als Library exportiert fuer Tests und Wiederverwendung.

pub mod core;
pub mod xml;

pub use crate::core::{
    AnimationFrame, MapGeometry, MapObject, ObjectGroup, Orientation, Properties, SheetRect,
    TextureRegion, TileData, TileGraph, TileLayer, Tilemap, Tileset,
};
pub use crate::xml::{load_tilemap, parse_tilemap};
