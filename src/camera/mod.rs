//! Camera tracking and the two world→screen projections.
//!
//! Two genuinely different coordinate systems exist for the same conceptual
//! operation: the open world is projected by the background-map collaborator
//! so tiles stay aligned with its basemap, while interiors use a local
//! isometric formula. The two code paths are deliberately kept as separate
//! named functions behind one `Projector` dispatch; do not unify the
//! formulas.

use bevy::prelude::*;

use crate::shared::*;

// ═══════════════════════════════════════════════════════════════════════
// RESOURCES
// ═══════════════════════════════════════════════════════════════════════

/// The logical camera, in world tile units. Tracks the player every tick.
#[derive(Resource, Debug, Clone)]
pub struct WorldCamera {
    pub pos: Vec2,
}

impl Default for WorldCamera {
    fn default() -> Self {
        Self {
            pos: Vec2::new(PLAYER_SPAWN.0, PLAYER_SPAWN.1),
        }
    }
}

/// Viewport size in pixels. Fixed to the window resolution.
#[derive(Resource, Debug, Clone, Copy)]
pub struct Viewport {
    pub size: Vec2,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            size: Vec2::new(SCREEN_WIDTH, SCREEN_HEIGHT),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// BASEMAP COLLABORATOR
// ═══════════════════════════════════════════════════════════════════════

/// External background-map renderer interface. The engine only hands over
/// world/camera/viewport coordinates; the collaborator owns the basemap
/// imagery and the actual pixel math for the open world.
pub trait Basemap: Send + Sync {
    /// Screen position (pixels, y-down, origin at the viewport's top-left)
    /// for a world tile coordinate.
    fn world_to_screen(&self, world: Vec2, camera: Vec2, viewport: Vec2) -> Vec2;

    /// Minimap render hook. Default implementation does nothing.
    fn render_minimap(&self, _camera: Vec2, _player: Vec2, _markers: &[Vec2]) {}
}

/// Default collaborator: a flat linear projection at `TILE_SIZE` pixels per
/// tile. Stands in until a real satellite/OSM renderer is plugged in.
pub struct FlatBasemap;

impl Basemap for FlatBasemap {
    fn world_to_screen(&self, world: Vec2, camera: Vec2, viewport: Vec2) -> Vec2 {
        (world - camera) * TILE_SIZE + viewport / 2.0
    }
}

// ═══════════════════════════════════════════════════════════════════════
// PROJECTIONS
// ═══════════════════════════════════════════════════════════════════════

/// Interior isometric projection:
/// `sx = (wx - wy) * HALF_TILE_W`, `sy = (wx + wy) * HALF_TILE_H - height`,
/// offset so the camera's own projection lands at the viewport centre.
/// `height` is an optional z-lift for elevated sprites.
pub fn project_interior(world: Vec2, height: f32, camera: Vec2, viewport: Vec2) -> Vec2 {
    let iso = |p: Vec2| Vec2::new((p.x - p.y) * HALF_TILE_W, (p.x + p.y) * HALF_TILE_H);
    iso(world) - iso(camera) - Vec2::new(0.0, height) + viewport / 2.0
}

/// Context dispatch over the two projection paths.
#[derive(Resource)]
pub struct Projector {
    pub basemap: Box<dyn Basemap>,
}

impl Default for Projector {
    fn default() -> Self {
        Self {
            basemap: Box::new(FlatBasemap),
        }
    }
}

impl Projector {
    pub fn screen_pos(
        &self,
        context: MapContext,
        world: Vec2,
        height: f32,
        camera: Vec2,
        viewport: Vec2,
    ) -> Vec2 {
        match context {
            MapContext::OpenWorld => {
                self.basemap.world_to_screen(world, camera, viewport) - Vec2::new(0.0, height)
            }
            MapContext::Interior(_) => project_interior(world, height, camera, viewport),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// SYSTEMS
// ═══════════════════════════════════════════════════════════════════════

/// Pure clamp used by the open-world follow: keep the camera a padding
/// margin inside the map bounds. Interiors are small enough to skip this.
pub fn clamp_to_bounds(pos: Vec2, padding: f32, width: f32, height: f32) -> Vec2 {
    Vec2::new(
        pos.x.clamp(padding, (width - padding).max(padding)),
        pos.y.clamp(padding, (height - padding).max(padding)),
    )
}

/// Track the player every tick. Clamped in the open world, unclamped inside.
pub fn camera_follow_player(player: Res<PlayerState>, mut camera: ResMut<WorldCamera>) {
    let target = player.position();
    camera.pos = match player.context {
        MapContext::OpenWorld => {
            clamp_to_bounds(target, CAMERA_PADDING, GRID_SIZE as f32, GRID_SIZE as f32)
        }
        MapContext::Interior(_) => target,
    };
}

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<WorldCamera>()
            .init_resource::<Viewport>()
            .init_resource::<Projector>()
            .add_systems(
                Update,
                camera_follow_player.run_if(in_state(GameState::Playing)),
            );
    }
}

// ═══════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════
