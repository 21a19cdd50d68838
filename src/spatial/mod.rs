//! Proximity queries and viewport culling shared by interaction, AI, and
//! the render pipeline.
//!
//! Everything here is a linear scan. Entity counts stay in the low hundreds,
//! so no grid/quadtree index is kept; a larger world should introduce a
//! uniform grid index behind these same signatures.

use bevy::prelude::*;

use crate::shared::*;

/// Closest item within `max_radius` of `point` by Euclidean distance.
///
/// Ties go to the first-found item (the strict `<` keeps stable insertion
/// order as the tie-break, not any secondary key).
pub fn nearest_within<T>(
    items: impl IntoIterator<Item = (T, Vec2)>,
    point: Vec2,
    max_radius: f32,
) -> Option<(T, f32)> {
    let mut best: Option<(T, f32)> = None;
    for (item, pos) in items {
        let dist = pos.distance(point);
        if dist > max_radius {
            continue;
        }
        match &best {
            Some((_, best_dist)) if dist >= *best_dist => {}
            _ => best = Some((item, dist)),
        }
    }
    best
}

/// Square cull window test: inside `range + margin` tiles of the camera on
/// both axes. Tall sprites pass a larger margin so a tree whose trunk is
/// just off-screen still draws its canopy.
pub fn in_view_window(pos: Vec2, camera: Vec2, range: f32, margin: f32) -> bool {
    let half = range + margin;
    (pos.x - camera.x).abs() <= half && (pos.y - camera.y).abs() <= half
}

/// Overscan margin for a sprite kind. Trees and markers extend well above
/// their anchor tile.
pub fn cull_margin(kind: SpriteKind) -> f32 {
    match kind {
        SpriteKind::Tree | SpriteKind::Marker => CULL_MARGIN_TALL,
        SpriteKind::StreetLight
        | SpriteKind::Npc
        | SpriteKind::Animal
        | SpriteKind::FarmAnimal
        | SpriteKind::Crop
        | SpriteKind::PlayerSprite
        | SpriteKind::Furniture => CULL_MARGIN,
    }
}
