//! Tile world model: the authoritative terrain/collision grid plus the
//! static layout (trees, street lights, buildings, POI markers).
//!
//! The grid is regenerated procedurally at every boot and never saved; only
//! the farmland/watered overlay and crops are persisted elsewhere.

use bevy::prelude::*;
use rand::Rng;

use crate::data::{
    project_geo, BUILDING_SEEDS, MARKER_SEEDS, PARK_ZONES, STREET_LIGHT_RUNS, WATER_FEATURES,
};
use crate::shared::*;

// ═══════════════════════════════════════════════════════════════════════
// TILE GRID
// ═══════════════════════════════════════════════════════════════════════

/// Fixed-size 2-D grid of tile codes. Out-of-bounds lookups return `None`
/// and every collision query treats that as blocked; nothing here panics.
#[derive(Resource, Debug, Clone)]
pub struct TileGrid {
    pub width: usize,
    pub height: usize,
    tiles: Vec<TileCode>,
}

impl Default for TileGrid {
    fn default() -> Self {
        Self::new(GRID_SIZE, GRID_SIZE)
    }
}

impl TileGrid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            tiles: vec![TileCode::Walkable; width * height],
        }
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    pub fn tile_at(&self, x: i32, y: i32) -> Option<TileCode> {
        self.index(x, y).map(|i| self.tiles[i])
    }

    pub fn set_tile(&mut self, x: i32, y: i32, code: TileCode) {
        if let Some(i) = self.index(x, y) {
            self.tiles[i] = code;
        }
    }

    /// Player collision: water blocks, everything else (including building
    /// footprints) is passable. Off-grid is blocked.
    pub fn blocks_player(&self, x: i32, y: i32) -> bool {
        match self.tile_at(x, y) {
            Some(TileCode::Water) | None => true,
            _ => false,
        }
    }

    /// NPC collision is stricter than the player's: buildings also block,
    /// since NPCs never enter through markers.
    pub fn blocks_npc(&self, x: i32, y: i32) -> bool {
        match self.tile_at(x, y) {
            Some(TileCode::Water) | Some(TileCode::Building) | None => true,
            _ => false,
        }
    }

    /// Convert a default tile into farmland. No-op off-grid or on any
    /// non-default code.
    pub fn till(&mut self, x: i32, y: i32) {
        if let Some(i) = self.index(x, y) {
            if self.tiles[i] == TileCode::Walkable {
                self.tiles[i] = TileCode::Farmland;
            }
        }
    }

    /// Stamp a rect with a code, skipping any tile that is not still the
    /// default. Preserves hand-placed water/park already present.
    pub fn stamp_rect(&mut self, rect: (i32, i32, i32, i32), code: TileCode) {
        let (rx, ry, rw, rh) = rect;
        for y in ry..ry + rh {
            for x in rx..rx + rw {
                if let Some(i) = self.index(x, y) {
                    if self.tiles[i] == TileCode::Walkable {
                        self.tiles[i] = code;
                    }
                }
            }
        }
    }

    /// Stamp a rect unconditionally. Only used for the hand-placed water
    /// features written before anything else.
    fn fill_rect(&mut self, rect: (i32, i32, i32, i32), code: TileCode) {
        let (rx, ry, rw, rh) = rect;
        for y in ry..ry + rh {
            for x in rx..rx + rw {
                if let Some(i) = self.index(x, y) {
                    self.tiles[i] = code;
                }
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// WORLD LAYOUT
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct BuildingDef {
    pub name: String,
    pub footprint: (i32, i32, i32, i32),
    /// Interior floor size in tiles, if enterable.
    pub interior: Option<(i32, i32)>,
}

impl BuildingDef {
    /// Door tile: centre of the footprint's south edge.
    pub fn door(&self) -> Vec2 {
        let (x, y, w, h) = self.footprint;
        Vec2::new(x as f32 + w as f32 / 2.0, (y + h) as f32)
    }
}

/// Static world furniture generated at boot: tree and street-light positions
/// plus the building table markers reference. Immutable after init.
#[derive(Resource, Debug, Clone, Default)]
pub struct WorldLayout {
    pub trees: Vec<Vec2>,
    pub street_lights: Vec<Vec2>,
    pub buildings: Vec<BuildingDef>,
}

// ═══════════════════════════════════════════════════════════════════════
// GENERATION
// ═══════════════════════════════════════════════════════════════════════

/// Build the grid and layout: default fill, hand-placed water, stochastic
/// park/tree scatter, then building footprints. Scatter and stamping both
/// skip tiles that are no longer default.
pub fn generate_world(rng: &mut impl Rng) -> (TileGrid, WorldLayout) {
    let mut grid = TileGrid::default();
    let mut layout = WorldLayout::default();

    for &rect in WATER_FEATURES {
        grid.fill_rect(rect, TileCode::Water);
    }

    for &((zx, zy, zw, zh), density) in PARK_ZONES {
        for y in zy..zy + zh {
            for x in zx..zx + zw {
                if grid.tile_at(x, y) != Some(TileCode::Walkable) {
                    continue;
                }
                grid.set_tile(x, y, TileCode::Park);
                if rng.gen_bool(density) {
                    layout.trees.push(Vec2::new(x as f32 + 0.5, y as f32 + 0.5));
                }
            }
        }
    }

    for seed in BUILDING_SEEDS {
        grid.stamp_rect(seed.footprint, TileCode::Building);
        layout.buildings.push(BuildingDef {
            name: seed.name.to_string(),
            footprint: seed.footprint,
            interior: seed.interior,
        });
    }

    for &((sx, sy), (ex, ey), spacing) in STREET_LIGHT_RUNS {
        let dx = (ex - sx).signum();
        let dy = (ey - sy).signum();
        let len = (ex - sx).abs().max((ey - sy).abs());
        let mut step = 0;
        while step <= len {
            layout
                .street_lights
                .push(Vec2::new((sx + dx * step) as f32, (sy + dy * step) as f32));
            step += spacing;
        }
    }

    (grid, layout)
}

// ═══════════════════════════════════════════════════════════════════════
// PLUGIN
// ═══════════════════════════════════════════════════════════════════════

pub struct WorldPlugin;

impl Plugin for WorldPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TileGrid>()
            .init_resource::<WorldLayout>()
            .add_systems(OnEnter(GameState::Playing), spawn_world);
    }
}

/// Generate terrain and spawn the static drawable entities: trees, street
/// lights, and POI markers (projected from their geographic anchors).
fn spawn_world(
    mut commands: Commands,
    mut grid: ResMut<TileGrid>,
    mut layout: ResMut<WorldLayout>,
) {
    // Guard against re-entering Playing (e.g. after a pause round-trip).
    if !layout.buildings.is_empty() {
        return;
    }

    let mut rng = rand::thread_rng();
    let (new_grid, new_layout) = generate_world(&mut rng);
    *grid = new_grid;
    *layout = new_layout;

    info!(
        "[World] Generated {}x{} grid: {} trees, {} street lights, {} buildings",
        grid.width,
        grid.height,
        layout.trees.len(),
        layout.street_lights.len(),
        layout.buildings.len()
    );

    for &pos in &layout.trees {
        commands.spawn((
            Drawable { kind: SpriteKind::Tree, height: TILE_SIZE },
            LogicalPosition(pos),
            ContextTag(MapContext::OpenWorld),
        ));
    }

    for &pos in &layout.street_lights {
        commands.spawn((
            Drawable { kind: SpriteKind::StreetLight, height: TILE_SIZE * 0.75 },
            LogicalPosition(pos),
            ContextTag(MapContext::OpenWorld),
        ));
    }

    for seed in MARKER_SEEDS {
        let pos = project_geo(seed.geo.0, seed.geo.1);
        commands.spawn((
            PoiMarker {
                name: seed.name.to_string(),
                building: seed.building,
                healer: seed.healer,
                job: seed.job.map(|(id, title, pay, energy_cost)| Job {
                    id: id.to_string(),
                    title: title.to_string(),
                    pay,
                    energy_cost,
                }),
            },
            Drawable { kind: SpriteKind::Marker, height: TILE_SIZE * 1.5 },
            LogicalPosition(pos),
            ContextTag(MapContext::OpenWorld),
        ));
    }
}

// ═══════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════
