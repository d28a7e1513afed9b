//! XML-Import fuer TMX-Tilemap-Dokumente.
//!
//! Das Modell wird bei jedem Laden komplett neu aus dem Dokument aufgebaut;
//! einen Writer gibt es nicht.

pub mod parser;

pub use parser::{load_tilemap, parse_tilemap};
