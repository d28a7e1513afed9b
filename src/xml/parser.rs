//! Parser fuer TMX-Tilemap-Dokumente.
//!
//! Ein einzelner Vorwaertsdurchlauf ueber die XML-Events baut das komplette
//! Dokumentmodell auf. Statt eines Element-Stacks genuegt ein getyptes
//! "zuletzt geoeffnetes Container-Element" plus eine vorgemerkte lokale
//! Tile-ID, weil die Verarbeitung hoechstens zwei Ebenen tief schaut.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use glam::Vec2;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::core::{
    AnimationFrame, MapObject, ObjectGroup, Orientation, Properties, TextureRegion, TileLayer,
    Tilemap, Tileset,
};

/// Laedt eine Tilemap aus einer TMX-Datei.
pub fn load_tilemap(path: impl AsRef<Path>) -> Result<Tilemap> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Tilemap-Datei '{}' konnte nicht gelesen werden", path.display()))?;

    parse_tilemap(&content).with_context(|| format!("Fehler in Tilemap-Datei '{}'", path.display()))
}

/// Parsed eine Tilemap aus einem TMX-XML-String. Jede strukturelle Verletzung
/// bricht den gesamten Durchlauf ab; eine teilweise aufgebaute Karte wird nie
/// herausgegeben.
pub fn parse_tilemap(xml_content: &str) -> Result<Tilemap> {
    let mut reader = Reader::from_str(xml_content);
    reader.config_mut().trim_text(true);

    let mut buffer = Vec::new();
    let mut parser = TmxParser::default();

    loop {
        match reader.read_event_into(&mut buffer) {
            Ok(Event::Start(ref e)) => {
                let tag = reader.decoder().decode(e.name().as_ref())?.into_owned();
                let attributes = attributes_map(&reader, e)?;
                parser
                    .start_element(&tag, &attributes)
                    .with_context(|| position_context(&reader, &tag))?;
            }
            Ok(Event::Empty(ref e)) => {
                // Selbstschliessende Elemente durchlaufen Start- und
                // End-Behandlung (<tile gid=".."/>, <property .../>, ...)
                let tag = reader.decoder().decode(e.name().as_ref())?.into_owned();
                let attributes = attributes_map(&reader, e)?;
                parser
                    .start_element(&tag, &attributes)
                    .with_context(|| position_context(&reader, &tag))?;
                parser
                    .end_element(&tag)
                    .with_context(|| position_context(&reader, &tag))?;
            }
            Ok(Event::Text(e)) => {
                parser.characters.push_str(&e.xml_content()?);
            }
            Ok(Event::End(ref e)) => {
                let tag = reader.decoder().decode(e.name().as_ref())?.into_owned();
                parser
                    .end_element(&tag)
                    .with_context(|| position_context(&reader, &tag))?;
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(err).context("Fehler beim Parsen des XML"),
            _ => {}
        }

        buffer.clear();
    }

    parser.finish()
}

fn position_context<R>(reader: &Reader<R>, tag: &str) -> String {
    format!(
        "Fehler bei <{tag}> nahe Byte-Position {}",
        reader.buffer_position()
    )
}

/// Zuletzt geoeffnetes Container-Element. Bestimmt zusammen mit der
/// vorgemerkten Tile-ID, welcher Entitaet Kind-Elemente und Eigenschaften
/// zugeordnet werden.
#[derive(Debug, Default)]
enum LastElement {
    #[default]
    None,
    Map,
    Tileset(String),
    Layer(String),
    ObjectGroup(String),
}

/// Encoding der Tile-Daten innerhalb von `<data>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataEncoding {
    Xml,
    Csv,
    Base64,
}

#[derive(Default)]
struct TmxParser {
    tilemap: Option<Tilemap>,
    last_element: LastElement,
    /// Lokale ID des zuletzt geoeffneten `<tile>`; Objekte belegen den
    /// Slot ebenfalls, damit nachlaufende Eigenschaften richtig landen.
    pending_id: Option<u32>,
    /// Sammelbecken fuer `<property>`-Eintraege bis zur schliessenden Grenze
    /// der umschliessenden Entitaet
    properties: Properties,
    encoding: Option<DataEncoding>,
    /// Aufgelaufene GID-Folge des aktuellen `<data>`-Abschnitts
    data: Vec<u32>,
    characters: String,
}

impl TmxParser {
    fn require_map(&mut self, element: &str) -> Result<&mut Tilemap> {
        self.tilemap
            .as_mut()
            .with_context(|| format!("<{element}> ausserhalb von <map>"))
    }

    fn start_element(&mut self, tag: &str, attributes: &AttributeMap) -> Result<()> {
        match tag {
            "map" => self.start_map(attributes),
            "tileset" => self.start_tileset(attributes),
            "tileoffset" => self.start_tileoffset(attributes),
            "image" => self.start_image(attributes),
            "tile" => self.start_tile(attributes),
            "frame" => self.start_frame(attributes),
            "property" => self.start_property(attributes),
            "layer" => self.start_layer(attributes),
            "objectgroup" => self.start_objectgroup(attributes),
            "object" => self.start_object(attributes),
            "data" => self.start_data(attributes),
            _ => Ok(()),
        }
    }

    fn start_map(&mut self, attributes: &AttributeMap) -> Result<()> {
        if self.tilemap.is_some() {
            bail!("Dokument enthaelt mehr als ein <map>-Element");
        }

        let version = parse_attr::<f64>(attributes, "map", "version")?;
        let width = parse_positive(attributes, "map", "width")?;
        let height = parse_positive(attributes, "map", "height")?;
        let tile_width = parse_positive(attributes, "map", "tilewidth")?;
        let tile_height = parse_positive(attributes, "map", "tileheight")?;

        let orientation_name = require_attr(attributes, "map", "orientation")?;
        let Some(orientation) = Orientation::from_tmx_name(orientation_name) else {
            bail!("Unbekannte Projektion '{orientation_name}'");
        };

        self.tilemap = Some(Tilemap::new(
            version,
            width,
            height,
            tile_width,
            tile_height,
            orientation,
        ));
        self.last_element = LastElement::Map;
        Ok(())
    }

    fn start_tileset(&mut self, attributes: &AttributeMap) -> Result<()> {
        let first_gid = parse_attr::<u32>(attributes, "tileset", "firstgid")?;
        let name = require_attr(attributes, "tileset", "name")?.to_string();
        let tile_width = parse_positive(attributes, "tileset", "tilewidth")?;
        let tile_height = parse_positive(attributes, "tileset", "tileheight")?;

        let map = self.require_map("tileset")?;
        if map.tileset(&name).is_some() {
            bail!("Tileset '{name}' ist doppelt definiert");
        }

        let mut tileset = Tileset::new(&name, first_gid, tile_width, tile_height);
        tileset.spacing = parse_optional(attributes, "spacing", 0);
        tileset.margin = parse_optional(attributes, "margin", 0);
        map.add_tileset(tileset);

        self.last_element = LastElement::Tileset(name);
        Ok(())
    }

    fn start_tileoffset(&mut self, attributes: &AttributeMap) -> Result<()> {
        let x = parse_attr::<f32>(attributes, "tileoffset", "x")?;
        let y = parse_attr::<f32>(attributes, "tileoffset", "y")?;

        let LastElement::Tileset(name) = &self.last_element else {
            bail!("<tileoffset> ausserhalb von <tileset>");
        };
        let name = name.clone();

        let map = self.require_map("tileoffset")?;
        if let Some(tileset) = map.tileset_mut(&name) {
            tileset.tile_offset = Vec2::new(x, y);
        }
        Ok(())
    }

    /// `<image>` ist kontextabhaengig: ohne vorgemerkte Tile-ID beschreibt es
    /// das Spritesheet des Tilesets, mit ID das Einzelbild genau eines Tiles.
    fn start_image(&mut self, attributes: &AttributeMap) -> Result<()> {
        let source = require_attr(attributes, "image", "source")?.to_string();

        let LastElement::Tileset(name) = &self.last_element else {
            bail!("<image> ausserhalb von <tileset>");
        };
        let name = name.clone();
        let pending_id = self.pending_id;

        match pending_id {
            None => {
                // Sheet-Quelle: Abmessungen kommen aus dem Dokument, der Kern
                // dekodiert keine Bilddaten
                let width = parse_positive(attributes, "image", "width")?;
                let height = parse_positive(attributes, "image", "height")?;

                let map = self.require_map("image")?;
                if let Some(tileset) = map.tileset_mut(&name) {
                    tileset.slice_sheet(&source, width, height);
                }
            }
            Some(local_id) => {
                let map = self.require_map("image")?;
                if let Some(tileset) = map.tileset_mut(&name) {
                    let gid = tileset.first_gid + local_id;
                    tileset.register_tile(Some(gid), TextureRegion::Image { source });
                }
            }
        }
        Ok(())
    }

    /// `<tile>` traegt entweder eine lokale ID (Tileset-Kontext) oder haengt
    /// unter Raw-XML-Encoding eine GID an die Datenfolge des Layers an.
    fn start_tile(&mut self, attributes: &AttributeMap) -> Result<()> {
        if let Some(gid) = attributes.get("gid") {
            if self.encoding == Some(DataEncoding::Xml) {
                let gid = gid
                    .trim()
                    .parse::<u32>()
                    .with_context(|| format!("<tile> mit ungueltiger gid '{gid}'"))?;
                self.data.push(gid);
                return Ok(());
            }
        }

        if let Some(id) = attributes.get("id") {
            let id = id
                .trim()
                .parse::<u32>()
                .with_context(|| format!("<tile> mit ungueltiger id '{id}'"))?;
            self.pending_id = Some(id);
            return Ok(());
        }

        bail!("<tile> ohne verwertbares gid- oder id-Attribut");
    }

    fn start_frame(&mut self, attributes: &AttributeMap) -> Result<()> {
        let tile_id = parse_attr::<u32>(attributes, "frame", "tileid")?;
        let duration = parse_attr::<u32>(attributes, "frame", "duration")?;

        let LastElement::Tileset(name) = &self.last_element else {
            bail!("<frame> ausserhalb von <tileset>");
        };
        let name = name.clone();
        let Some(local_id) = self.pending_id else {
            bail!("<frame> ohne umschliessendes <tile>");
        };

        let map = self.require_map("frame")?;
        let Some(tileset) = map.tileset_mut(&name) else {
            bail!("<frame> ohne zugehoeriges Tileset");
        };

        let first_gid = tileset.first_gid;
        let Some(data) = tileset.tile_data_mut(first_gid + local_id) else {
            bail!("<frame> fuer nicht registriertes Tile mit lokaler ID {local_id}");
        };

        data.animation.push(AnimationFrame {
            gid: tile_id + first_gid,
            duration_ms: duration,
        });
        Ok(())
    }

    fn start_property(&mut self, attributes: &AttributeMap) -> Result<()> {
        let name = require_attr(attributes, "property", "name")?;
        let value = require_attr(attributes, "property", "value")?;
        self.properties.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn start_layer(&mut self, attributes: &AttributeMap) -> Result<()> {
        let name = require_attr(attributes, "layer", "name")?.to_string();
        let offset = Vec2::new(
            parse_optional(attributes, "offsetx", 0.0),
            parse_optional(attributes, "offsety", 0.0),
        );
        let opacity = parse_optional(attributes, "opacity", 1.0);
        let visible = parse_optional::<i32>(attributes, "visible", 1) != 0;

        let map = self.require_map("layer")?;
        if map.layer(&name).is_some() {
            bail!("Layer '{name}' ist doppelt definiert");
        }

        let mut layer = TileLayer::new(&name, map.geometry(), offset);
        layer.opacity = opacity;
        layer.visible = visible;
        map.add_layer(layer);

        self.last_element = LastElement::Layer(name);
        Ok(())
    }

    fn start_objectgroup(&mut self, attributes: &AttributeMap) -> Result<()> {
        let name = require_attr(attributes, "objectgroup", "name")?.to_string();
        let offset = Vec2::new(
            parse_optional(attributes, "offsetx", 0.0),
            parse_optional(attributes, "offsety", 0.0),
        );

        let map = self.require_map("objectgroup")?;
        if map.object_group(&name).is_some() {
            bail!("Objektgruppe '{name}' ist doppelt definiert");
        }

        map.add_object_group(ObjectGroup::new(&name, offset));
        self.last_element = LastElement::ObjectGroup(name);
        Ok(())
    }

    fn start_object(&mut self, attributes: &AttributeMap) -> Result<()> {
        let LastElement::ObjectGroup(group_name) = &self.last_element else {
            bail!("<object> ausserhalb von <objectgroup>");
        };
        let group_name = group_name.clone();

        let id = parse_attr::<u32>(attributes, "object", "id")?;
        let x = parse_attr::<f32>(attributes, "object", "x")?;
        let y = parse_attr::<f32>(attributes, "object", "y")?;
        let size = Vec2::new(
            parse_optional(attributes, "width", 0.0),
            parse_optional(attributes, "height", 0.0),
        );
        let name = attributes.get("name").cloned().unwrap_or_default();
        let object_type = attributes.get("type").cloned().unwrap_or_default();

        let map = self.require_map("object")?;
        if let Some(group) = map.object_group_mut(&group_name) {
            group.add_object(MapObject {
                id,
                raw_position: Vec2::new(x, y),
                size,
                name,
                object_type,
                properties: Properties::default(),
            });
        }

        // Nachlaufende <properties> gehoeren zu diesem Objekt
        self.pending_id = Some(id);
        Ok(())
    }

    fn start_data(&mut self, attributes: &AttributeMap) -> Result<()> {
        if attributes.contains_key("compression") {
            bail!("Komprimierte Tile-Daten werden nicht unterstuetzt");
        }

        self.encoding = Some(match attributes.get("encoding").map(String::as_str) {
            None => DataEncoding::Xml,
            Some("csv") => DataEncoding::Csv,
            Some("base64") => DataEncoding::Base64,
            Some(other) => bail!("Unbekanntes Tile-Daten-Encoding '{other}'"),
        });
        self.data.clear();
        Ok(())
    }

    fn end_element(&mut self, tag: &str) -> Result<()> {
        match tag {
            "tile" => {
                if let (LastElement::Tileset(name), Some(local_id)) =
                    (&self.last_element, self.pending_id)
                {
                    let name = name.clone();
                    let properties = std::mem::take(&mut self.properties);

                    if let Some(tileset) =
                        self.tilemap.as_mut().and_then(|map| map.tileset_mut(&name))
                    {
                        let gid = tileset.first_gid + local_id;
                        if let Some(data) = tileset.tile_data_mut(gid) {
                            data.properties = properties;
                        }
                    }
                }
                self.pending_id = None;
            }
            "object" => {
                if let (LastElement::ObjectGroup(name), Some(id)) =
                    (&self.last_element, self.pending_id)
                {
                    let name = name.clone();
                    let properties = std::mem::take(&mut self.properties);

                    if let Some(object) = self
                        .tilemap
                        .as_mut()
                        .and_then(|map| map.object_group_mut(&name))
                        .and_then(|group| group.object_mut(id))
                    {
                        object.properties = properties;
                    }
                }
                self.pending_id = None;
            }
            "properties" => self.commit_properties(),
            "data" => self.finish_data()?,
            _ => {}
        }

        self.characters.clear();
        Ok(())
    }

    /// Schreibt das Sammelbecken in die Entitaet, deren schliessende Grenze
    /// erreicht wurde. Traegt eine Tile- oder Objekt-ID den Pending-Slot,
    /// bleibt das Becken bis zu deren `</tile>`/`</object>` stehen.
    fn commit_properties(&mut self) {
        let pending = self.pending_id;

        if let Some(map) = self.tilemap.as_mut() {
            match &self.last_element {
                LastElement::Map => map.properties = self.properties.clone(),
                LastElement::Tileset(name) if pending.is_none() => {
                    if let Some(tileset) = map.tileset_mut(name) {
                        tileset.properties = self.properties.clone();
                    }
                }
                LastElement::Layer(name) => {
                    if let Some(layer) = map.layer_mut(name) {
                        layer.properties = self.properties.clone();
                    }
                }
                LastElement::ObjectGroup(name) if pending.is_none() => {
                    if let Some(group) = map.object_group_mut(name) {
                        group.properties = self.properties.clone();
                    }
                }
                _ => {}
            }
        }

        if pending.is_none() {
            self.properties.clear();
        }
    }

    /// Uebergibt die aufgelaufene GID-Folge an den Layer. Die Laenge muss
    /// exakt Breite x Hoehe der Karte betragen.
    fn finish_data(&mut self) -> Result<()> {
        let LastElement::Layer(layer_name) = &self.last_element else {
            bail!("<data> ausserhalb von <layer>");
        };
        let layer_name = layer_name.clone();

        match self.encoding.take() {
            Some(DataEncoding::Xml) => {} // GIDs bereits einzeln gesammelt
            Some(DataEncoding::Csv) => self.data.extend(decode_csv(&self.characters)),
            Some(DataEncoding::Base64) => self.data.extend(decode_base64(&self.characters)?),
            None => bail!("</data> ohne oeffnendes <data>"),
        }

        let gids = std::mem::take(&mut self.data);
        let map = self.require_map("data")?;
        map.fill_layer(&layer_name, &gids)
    }

    fn finish(self) -> Result<Tilemap> {
        self.tilemap.context("Dokument enthaelt kein <map>-Element")
    }
}

type AttributeMap = HashMap<String, String>;

fn attributes_map<R>(reader: &Reader<R>, element: &BytesStart) -> Result<AttributeMap> {
    let mut attributes = AttributeMap::new();

    for attr in element.attributes().with_checks(false) {
        let attr = attr?;
        let key = reader.decoder().decode(attr.key.as_ref())?.into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.insert(key, value);
    }

    Ok(attributes)
}

fn require_attr<'a>(attributes: &'a AttributeMap, element: &str, name: &str) -> Result<&'a str> {
    attributes
        .get(name)
        .map(String::as_str)
        .with_context(|| format!("<{element}> ohne Pflichtattribut '{name}'"))
}

fn parse_attr<T>(attributes: &AttributeMap, element: &str, name: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = require_attr(attributes, element, name)?;
    value.trim().parse::<T>().with_context(|| {
        format!("Pflichtattribut '{name}' von <{element}> ist ungueltig: '{value}'")
    })
}

fn parse_positive(attributes: &AttributeMap, element: &str, name: &str) -> Result<u32> {
    let value = parse_attr::<u32>(attributes, element, name)?;
    if value == 0 {
        bail!("Pflichtattribut '{name}' von <{element}> muss positiv sein");
    }
    Ok(value)
}

/// Optionale Attribute fallen bei fehlendem oder unlesbarem Wert still auf
/// den Default zurueck.
fn parse_optional<T: FromStr>(attributes: &AttributeMap, name: &str, default: T) -> T {
    attributes
        .get(name)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

/// CSV-Decoder: Whitespace entfernen, an Kommas trennen, nicht-numerische
/// Tokens still ueberspringen.
fn decode_csv(text: &str) -> Vec<u32> {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    cleaned
        .split(',')
        .filter_map(|token| token.parse::<u32>().ok())
        .collect()
}

/// Base64-Decoder: saemtlichen Whitespace entfernen, Standard-Alphabet
/// dekodieren und die Bytes als little-endian u32-Folge lesen. Ein
/// unvollstaendiger Rest am Ende wird ignoriert.
fn decode_base64(text: &str) -> Result<Vec<u32>> {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(cleaned.as_bytes())
        .context("Base64-Tile-Daten konnten nicht dekodiert werden")?;

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
