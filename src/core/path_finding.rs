//! Grid-Graph ueber den begehbaren Tile-Koordinaten einer Karte.

use std::collections::HashMap;

use anyhow::{bail, Result};
use glam::IVec2;
use pathfinding::prelude::bfs;

use super::{TileLayer, Tilemap};

/// Ein Graph mit einem Knoten pro begehbarer Rasterkoordinate und Kanten zu
/// den vier (oder acht, mit Diagonalen) benachbarten Knoten. Entfernte Knoten
/// werden samt Position aufbewahrt, damit sie spaeter wieder eingesetzt
/// werden koennen (Tueren oeffnen, Objekte entfernen).
#[derive(Debug, Clone)]
pub struct TileGraph {
    width: u32,
    height: u32,
    diagonals: bool,
    nodes: HashMap<IVec2, Vec<IVec2>>,
    removed: Vec<IVec2>,
}

impl TileGraph {
    /// Baut den vollstaendigen Graphen ohne Hindernisse.
    pub fn new(width: u32, height: u32, diagonals: bool) -> Self {
        let mut nodes = HashMap::with_capacity((width * height) as usize);

        for y in 0..height as i32 {
            for x in 0..width as i32 {
                let coord = IVec2::new(x, y);
                nodes.insert(coord, grid_neighbours(coord, width, height, diagonals));
            }
        }

        Self {
            width,
            height,
            diagonals,
            nodes,
            removed: Vec::new(),
        }
    }

    /// Baut den Graphen aus einer Karte; jede belegte Zelle des benannten
    /// Layers gilt als Hindernis. Ein unbekannter Layer-Name ist ein Fehler.
    pub fn from_layer(map: &Tilemap, layer_name: &str, diagonals: bool) -> Result<Self> {
        let Some(layer) = map.layer(layer_name) else {
            bail!("Kollisions-Layer '{layer_name}' existiert nicht");
        };

        let mut graph = Self::new(map.width(), map.height(), diagonals);
        let mut obstacles = 0;

        for (coord, _gid) in layer.occupied_cells() {
            if graph.remove_node(coord) {
                obstacles += 1;
            }
        }

        log::info!(
            "Pathfinding-Graph aufgebaut: {} Knoten, {} Hindernisse entfernt",
            graph.node_count(),
            obstacles
        );

        Ok(graph)
    }

    /// Baut den Graphen aus einer Karte; Zellen, deren Tile-Daten die
    /// benannte Eigenschaft tragen, gelten als Hindernis. Ohne Layer-Liste
    /// werden alle Layer geprueft; ein unbekannter Name in der Liste ist ein
    /// Fehler.
    pub fn from_property(
        map: &Tilemap,
        collision_property: &str,
        layer_names: Option<&[&str]>,
        diagonals: bool,
    ) -> Result<Self> {
        let layers: Vec<&TileLayer> = match layer_names {
            None => map.layers().collect(),
            Some(names) => {
                let mut layers = Vec::with_capacity(names.len());
                for name in names {
                    let Some(layer) = map.layer(name) else {
                        bail!("Kollisions-Layer '{name}' existiert nicht");
                    };
                    layers.push(layer);
                }
                layers
            }
        };

        let mut graph = Self::new(map.width(), map.height(), diagonals);
        let mut obstacles = 0;

        for y in 0..map.height() as i32 {
            for x in 0..map.width() as i32 {
                let coord = IVec2::new(x, y);
                let blocked = layers.iter().any(|layer| {
                    layer
                        .tile_gid_at(coord)
                        .and_then(|gid| map.tile_data(gid))
                        .is_some_and(|data| data.properties.contains_key(collision_property))
                });

                if blocked && graph.remove_node(coord) {
                    obstacles += 1;
                }
            }
        }

        log::info!(
            "Pathfinding-Graph aufgebaut: {} Knoten, {} Hindernisse entfernt",
            graph.node_count(),
            obstacles
        );

        Ok(graph)
    }

    fn in_bounds(&self, coord: IVec2) -> bool {
        coord.x >= 0
            && coord.x < self.width as i32
            && coord.y >= 0
            && coord.y < self.height as i32
    }

    /// Anzahl der aktuell vorhandenen Knoten.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Anzahl der aktuell entfernten Knoten.
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }

    /// Prueft ob an der Koordinate ein Knoten vorhanden ist.
    pub fn contains(&self, coord: IVec2) -> bool {
        self.nodes.contains_key(&coord)
    }

    /// Entfernt den Knoten an der Koordinate und loest alle seine Kanten.
    /// Die Position bleibt vorgemerkt, damit der Knoten wieder eingesetzt
    /// werden kann. Liefert `false`, wenn dort kein Knoten existiert.
    pub fn remove_node(&mut self, coord: IVec2) -> bool {
        let Some(neighbours) = self.nodes.remove(&coord) else {
            return false;
        };

        for neighbour in &neighbours {
            if let Some(edges) = self.nodes.get_mut(neighbour) {
                edges.retain(|c| *c != coord);
            }
        }

        self.removed.push(coord);
        true
    }

    /// Setzt einen zuvor entfernten Knoten wieder ein und verbindet ihn mit
    /// allen aktuell vorhandenen Nachbarn. Liefert `false` fuer Koordinaten,
    /// die nie entfernt wurden, ausserhalb liegen oder bereits vorhanden sind.
    pub fn add_node(&mut self, coord: IVec2) -> bool {
        if !self.in_bounds(coord) || self.nodes.contains_key(&coord) {
            return false;
        }

        let Some(index) = self.removed.iter().position(|c| *c == coord) else {
            return false;
        };

        self.removed.swap_remove(index);
        self.connect_node(coord);
        true
    }

    /// Setzt alle entfernten Knoten wieder ein.
    pub fn reset(&mut self) {
        let removed = std::mem::take(&mut self.removed);

        for coord in removed {
            if !self.nodes.contains_key(&coord) {
                self.connect_node(coord);
            }
        }
    }

    fn connect_node(&mut self, coord: IVec2) {
        let neighbours: Vec<IVec2> =
            grid_neighbours(coord, self.width, self.height, self.diagonals)
                .into_iter()
                .filter(|n| self.nodes.contains_key(n))
                .collect();

        for neighbour in &neighbours {
            if let Some(edges) = self.nodes.get_mut(neighbour) {
                edges.push(coord);
            }
        }

        self.nodes.insert(coord, neighbours);
    }

    /// Kuerzester Pfad zwischen zwei Koordinaten (ungewichtetes Raster,
    /// Breitensuche). `None` bei gleichen Endpunkten, fehlenden Knoten oder
    /// ohne Route. Mit `include_start` enthaelt das Ergebnis auch die
    /// Startkoordinate; ueblicherweise wird sie weggelassen.
    pub fn find_path(&self, from: IVec2, to: IVec2, include_start: bool) -> Option<Vec<IVec2>> {
        if from == to {
            return None;
        }
        if !self.nodes.contains_key(&from) || !self.nodes.contains_key(&to) {
            return None;
        }

        let mut path = bfs(
            &from,
            |coord| self.nodes.get(coord).cloned().unwrap_or_default(),
            |coord| *coord == to,
        )?;

        if !include_start {
            path.remove(0);
            if path.is_empty() {
                return None;
            }
        }

        Some(path)
    }

    /// Naechster Schritt auf dem kuerzesten Pfad plus verbleibende Distanz in
    /// Schritten.
    pub fn next_position(&self, from: IVec2, to: IVec2) -> Option<(IVec2, usize)> {
        let path = self.find_path(from, to, false)?;
        Some((path[0], path.len()))
    }

    /// Nachbarknoten an einer Koordinate. Funktioniert auch fuer aktuell
    /// entfernte Koordinaten, als waere der Knoten kurzzeitig wieder
    /// eingesetzt; der Graph bleibt dabei unveraendert.
    pub fn adjacent_nodes(&self, coord: IVec2) -> Vec<IVec2> {
        if let Some(neighbours) = self.nodes.get(&coord) {
            return neighbours.clone();
        }

        if !self.removed.contains(&coord) {
            return Vec::new();
        }

        grid_neighbours(coord, self.width, self.height, self.diagonals)
            .into_iter()
            .filter(|n| self.nodes.contains_key(n))
            .collect()
    }
}

fn grid_neighbours(coord: IVec2, width: u32, height: u32, diagonals: bool) -> Vec<IVec2> {
    const ORTHOGONAL_STEPS: [(i32, i32); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];
    const DIAGONAL_STEPS: [(i32, i32); 8] = [
        (-1, -1),
        (0, -1),
        (1, -1),
        (-1, 0),
        (1, 0),
        (-1, 1),
        (0, 1),
        (1, 1),
    ];

    let steps: &[(i32, i32)] = if diagonals {
        &DIAGONAL_STEPS
    } else {
        &ORTHOGONAL_STEPS
    };

    steps
        .iter()
        .map(|(dx, dy)| coord + IVec2::new(*dx, *dy))
        .filter(|n| n.x >= 0 && n.x < width as i32 && n.y >= 0 && n.y < height as i32)
        .collect()
}
