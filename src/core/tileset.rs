//! Tilesets und deren Tile-Data-Katalog.

use glam::Vec2;
use indexmap::IndexMap;

use super::Properties;

/// Pixel-Rechteck innerhalb eines Quellbildes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetRect {
    /// Linke Kante in Pixeln
    pub x: u32,
    /// Obere Kante in Pixeln (Bildkoordinaten sind top-down)
    pub y: u32,
    /// Breite in Pixeln
    pub width: u32,
    /// Hoehe in Pixeln
    pub height: u32,
}

/// Beschreibt, woraus die Textur eines Tiles entsteht. Der Kern dekodiert
/// keine Bilddaten; der Renderer loest die Beschreibung gegen seinen
/// Textur-Provider auf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureRegion {
    /// Ausschnitt aus einem Spritesheet
    SheetRect {
        /// Pfad des Spritesheets
        source: String,
        /// Ausschnitt innerhalb des Sheets
        rect: SheetRect,
    },
    /// Eigenstaendiges Bild
    Image {
        /// Pfad des Bildes
        source: String,
    },
    /// Benanntes Teilbild aus einem Textur-Atlas
    AtlasImage {
        /// Name des Atlas
        atlas: String,
        /// Name des Teilbildes
        name: String,
    },
}

impl TextureRegion {
    /// Dateiname der Bildquelle ohne Verzeichnis und Endung, sofern die
    /// Region eine benannte Quelle hat.
    fn source_stem(&self) -> Option<&str> {
        let source = match self {
            TextureRegion::SheetRect { .. } => return None,
            TextureRegion::Image { source } => source.as_str(),
            TextureRegion::AtlasImage { name, .. } => name.as_str(),
        };
        Some(file_stem(source))
    }
}

fn file_stem(source: &str) -> &str {
    let name = source.rsplit('/').next().unwrap_or(source);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// Ein Animationsschritt: Ziel-GID und Anzeigedauer in Millisekunden.
/// Die GID wird kartenweit aufgeloest und darf deshalb auch in einem
/// anderen Tileset liegen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationFrame {
    /// Kartenweite ID des angezeigten Tiles
    pub gid: u32,
    /// Anzeigedauer in Millisekunden
    pub duration_ms: u32,
}

/// Unveraenderliche Metadaten eines Tiles.
#[derive(Debug, Clone, PartialEq)]
pub struct TileData {
    /// Kartenweite eindeutige ID
    pub gid: u32,
    /// Name des besitzenden Tilesets (nicht-besitzende Rueckreferenz)
    pub tileset: String,
    /// Texturbeschreibung fuer den Renderer
    pub region: TextureRegion,
    /// Animationssequenz; leer bei statischen Tiles
    pub animation: Vec<AnimationFrame>,
    /// Freie Eigenschaften
    pub properties: Properties,
}

/// Ein Tileset: Katalog von Tile-Daten mit kartenweit eindeutigen GIDs.
#[derive(Debug, Clone, PartialEq)]
pub struct Tileset {
    /// Eindeutiger Name innerhalb der Karte
    pub name: String,
    /// Offset, der lokale Tile-IDs auf kartenweite GIDs abbildet
    pub first_gid: u32,
    /// Tile-Breite in Pixeln
    pub tile_width: u32,
    /// Tile-Hoehe in Pixeln
    pub tile_height: u32,
    /// Abstand zwischen Tiles im Spritesheet
    pub spacing: u32,
    /// Rand um das Spritesheet
    pub margin: u32,
    /// Pixel-Offset beim Platzieren der Tiles dieses Sets
    pub tile_offset: Vec2,
    /// Freie Eigenschaften
    pub properties: Properties,
    /// Pfad des Spritesheets bei Sheet-Tilesets
    pub source: Option<String>,
    /// Atlas-Name bei Atlas-Tilesets
    pub atlas: Option<String>,
    tile_data: IndexMap<u32, TileData>,
}

impl Tileset {
    /// Erstellt ein leeres Tileset.
    pub fn new(name: &str, first_gid: u32, tile_width: u32, tile_height: u32) -> Self {
        Self {
            name: name.to_string(),
            first_gid,
            tile_width,
            tile_height,
            spacing: 0,
            margin: 0,
            tile_offset: Vec2::ZERO,
            properties: Properties::default(),
            source: None,
            atlas: None,
            tile_data: IndexMap::new(),
        }
    }

    /// Hoechste bereits vergebene GID; `first_gid` solange keine vergeben ist.
    pub fn last_gid(&self) -> u32 {
        self.tile_data
            .keys()
            .max()
            .copied()
            .unwrap_or(self.first_gid)
    }

    /// Anzahl registrierter Tile-Daten.
    pub fn tile_count(&self) -> usize {
        self.tile_data.len()
    }

    /// Registriert Tile-Daten unter expliziter oder automatisch vergebener GID.
    /// Automatisch: erste Registrierung erhaelt `first_gid`, danach
    /// `last_gid() + 1`. Doppelte GIDs werden abgewiesen; der bestehende
    /// Eintrag bleibt unveraendert.
    pub fn register_tile(&mut self, gid: Option<u32>, region: TextureRegion) -> Option<&mut TileData> {
        let gid = match gid {
            Some(gid) => gid,
            None if self.tile_data.is_empty() => self.first_gid,
            None => self.last_gid() + 1,
        };

        if self.tile_data.contains_key(&gid) {
            log::warn!(
                "Tileset '{}': Tile-Daten mit GID {} existieren bereits",
                self.name,
                gid
            );
            return None;
        }

        let data = TileData {
            gid,
            tileset: self.name.clone(),
            region,
            animation: Vec::new(),
            properties: Properties::default(),
        };

        Some(self.tile_data.entry(gid).or_insert(data))
    }

    /// Zerschneidet ein Spritesheet in Tiles und registriert sie mit
    /// fortlaufenden GIDs ab `first_gid`. Die Zuordnung laeuft zeilenweise und
    /// beginnt beim Tile links unten im Bild, weil Bildkoordinaten top-down,
    /// Weltkoordinaten aber bottom-up laufen. Gibt die Anzahl registrierter
    /// Tiles zurueck.
    pub fn slice_sheet(&mut self, source: &str, sheet_width: u32, sheet_height: u32) -> usize {
        self.source = Some(source.to_string());

        let step_x = self.tile_width + self.spacing;
        let step_y = self.tile_height + self.spacing;
        if step_x == 0 || step_y == 0 {
            return 0;
        }
        let tiles_per_row = (sheet_width + self.spacing).saturating_sub(2 * self.margin) / step_x;
        let tiles_per_col = (sheet_height + self.spacing).saturating_sub(2 * self.margin) / step_y;

        let mut added = 0;

        for row in 0..tiles_per_col {
            // Unterste Bildzeile zuerst
            let y = self.margin + (tiles_per_col - 1 - row) * step_y;

            for col in 0..tiles_per_row {
                let x = self.margin + col * step_x;
                let gid = self.first_gid + row * tiles_per_row + col;
                let region = TextureRegion::SheetRect {
                    source: source.to_string(),
                    rect: SheetRect {
                        x,
                        y,
                        width: self.tile_width,
                        height: self.tile_height,
                    },
                };

                if self.register_tile(Some(gid), region).is_some() {
                    added += 1;
                }
            }
        }

        added
    }

    /// Registriert Teilbilder eines Textur-Atlas mit automatisch vergebenen
    /// GIDs. Der Aufrufer zaehlt die Teilbild-Namen auf; der Kern oeffnet den
    /// Atlas nicht. Die GIDs haengen von der Aufzaehlreihenfolge ab — Tiles
    /// aus Atlanten werden deshalb besser ueber ihren Namen nachgeschlagen.
    pub fn add_atlas_tiles<I, S>(&mut self, atlas: &str, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.atlas = Some(atlas.to_string());

        let mut added = 0;

        for name in names {
            let region = TextureRegion::AtlasImage {
                atlas: atlas.to_string(),
                name: name.as_ref().to_string(),
            };
            if self.register_tile(None, region).is_some() {
                added += 1;
            }
        }

        added
    }

    /// Tile-Daten zu einer GID, `None` wenn die GID nicht zu diesem Tileset
    /// gehoert.
    pub fn tile_data(&self, gid: u32) -> Option<&TileData> {
        self.tile_data.get(&gid)
    }

    pub(crate) fn tile_data_mut(&mut self, gid: u32) -> Option<&mut TileData> {
        self.tile_data.get_mut(&gid)
    }

    /// Tile-Daten anhand ihres Quellbild-Namens (Verzeichnis und Dateiendung
    /// werden ignoriert). Findet nur Eintraege aus Einzelbildern oder
    /// Atlanten; Sheet-Ausschnitte tragen keinen eigenen Bildnamen.
    pub fn tile_data_by_source(&self, name: &str) -> Option<&TileData> {
        let wanted = file_stem(name);
        self.tile_data
            .values()
            .find(|data| data.region.source_stem() == Some(wanted))
    }

    /// Lokale Tile-ID (wie in Tiled angezeigt) zu einer GID.
    pub fn local_id(&self, gid: u32) -> u32 {
        gid.saturating_sub(self.first_gid)
    }

    /// Iterator ueber alle Tile-Daten in Registrierungsreihenfolge.
    pub fn tiles(&self) -> impl Iterator<Item = &TileData> {
        self.tile_data.values()
    }
}
