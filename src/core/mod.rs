//! Kern-Domaenentypen: Tilemap, Tilesets, Layer, Objektgruppen, Geometrie, Pathfinding.

pub mod geometry;
pub mod layer;
pub mod object_group;
pub mod orientation;
pub mod path_finding;
pub mod tilemap;
pub mod tileset;

pub use geometry::MapGeometry;
pub use layer::TileLayer;
pub use object_group::{MapObject, ObjectGroup};
pub use orientation::Orientation;
pub use path_finding::TileGraph;
pub use tilemap::Tilemap;
pub use tileset::{AnimationFrame, SheetRect, TextureRegion, TileData, Tileset};

/// Freie Schluessel/Wert-Eigenschaften, wie sie jedes TMX-Element tragen kann.
/// Geordnet, damit die Iteration deterministisch bleibt.
pub type Properties = indexmap::IndexMap<String, String>;
