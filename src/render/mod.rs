//! Painter's-algorithm render pipeline.
//!
//! Every frame: collect drawables in the player's map context, cull to the
//! view window, depth-sort by world Y (then X), then project each survivor
//! to screen space and assign its z from the sorted rank. Gameplay never
//! touches `Transform`; this module owns it.

use bevy::prelude::*;

use crate::camera::{Projector, Viewport, WorldCamera};
use crate::shared::*;
use crate::spatial::{cull_margin, in_view_window};
use crate::world::WorldLayout;

// ═══════════════════════════════════════════════════════════════════════
// DRAW LIST
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy)]
pub struct DrawEntry {
    pub entity: Entity,
    pub kind: SpriteKind,
    pub world: Vec2,
    pub height: f32,
}

/// The frame's culled, depth-sorted draw order. Rebuilt every frame.
#[derive(Resource, Debug, Default)]
pub struct DrawList {
    pub entries: Vec<DrawEntry>,
}

/// Depth order: smaller world Y draws first (further away), ties broken by
/// X ascending. The sort is stable so equal keys keep collection order and
/// sprites never flicker between frames.
pub fn sort_draw_list(entries: &mut [DrawEntry]) {
    entries.sort_by(|a, b| {
        a.world
            .y
            .total_cmp(&b.world.y)
            .then(a.world.x.total_cmp(&b.world.x))
    });
}

fn build_draw_list(
    player: Res<PlayerState>,
    camera: Res<WorldCamera>,
    mut draw_list: ResMut<DrawList>,
    drawables: Query<(Entity, &Drawable, &LogicalPosition, &ContextTag)>,
) {
    draw_list.entries.clear();
    for (entity, drawable, pos, tag) in &drawables {
        if tag.0 != player.context {
            continue;
        }
        // Interiors are a handful of tiles; only the open world culls.
        if player.context == MapContext::OpenWorld
            && !in_view_window(pos.0, camera.pos, VIEW_RANGE, cull_margin(drawable.kind))
        {
            continue;
        }
        draw_list.entries.push(DrawEntry {
            entity,
            kind: drawable.kind,
            world: pos.0,
            height: drawable.height,
        });
    }
    sort_draw_list(&mut draw_list.entries);
}

/// Project the sorted list and write transforms. Anything not in the list
/// this frame is hidden rather than despawned.
fn project_and_order(
    player: Res<PlayerState>,
    camera: Res<WorldCamera>,
    viewport: Res<Viewport>,
    projector: Res<Projector>,
    draw_list: Res<DrawList>,
    mut sprites: Query<(&mut Transform, &mut Visibility), With<Drawable>>,
) {
    for (_, mut visibility) in &mut sprites {
        *visibility = Visibility::Hidden;
    }
    for (idx, entry) in draw_list.entries.iter().enumerate() {
        let Ok((mut transform, mut visibility)) = sprites.get_mut(entry.entity) else {
            continue;
        };
        let screen = projector.screen_pos(
            player.context,
            entry.world,
            entry.height,
            camera.pos,
            viewport.size,
        );
        // Screen space is y-down from the top-left; Bevy's 2D world is y-up
        // from the centre.
        transform.translation = Vec3::new(
            screen.x - viewport.size.x / 2.0,
            viewport.size.y / 2.0 - screen.y,
            Z_ENTITY_BASE + idx as f32 * Z_DRAW_STEP,
        );
        *visibility = Visibility::Visible;
    }
}

// ═══════════════════════════════════════════════════════════════════════
// SPRITE DISPATCH
// ═══════════════════════════════════════════════════════════════════════

/// Placeholder color and pixel size for each sprite kind. Exhaustive by
/// construction; adding a kind without a draw arm is a compile error.
pub fn draw_params(kind: SpriteKind) -> (Color, Vec2) {
    match kind {
        SpriteKind::Tree => (Color::srgb(0.13, 0.42, 0.17), Vec2::new(20.0, 30.0)),
        SpriteKind::StreetLight => (Color::srgb(0.55, 0.55, 0.60), Vec2::new(4.0, 24.0)),
        SpriteKind::Marker => (Color::srgb(0.85, 0.20, 0.20), Vec2::new(12.0, 18.0)),
        SpriteKind::Npc => (Color::srgb(0.90, 0.70, 0.45), Vec2::new(12.0, 18.0)),
        SpriteKind::Animal => (Color::srgb(0.50, 0.40, 0.30), Vec2::new(10.0, 8.0)),
        SpriteKind::FarmAnimal => (Color::srgb(0.95, 0.92, 0.85), Vec2::new(14.0, 12.0)),
        SpriteKind::Crop => (Color::srgb(0.35, 0.65, 0.25), Vec2::new(10.0, 10.0)),
        SpriteKind::PlayerSprite => (Color::srgb(0.25, 0.45, 0.85), Vec2::new(12.0, 20.0)),
        SpriteKind::Furniture => (Color::srgb(0.45, 0.32, 0.22), Vec2::new(14.0, 14.0)),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// TEXTURE COLLABORATOR
// ═══════════════════════════════════════════════════════════════════════

/// Cache key for a generated texture, derived from the same inputs handed
/// to the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureKey {
    pub kind: SpriteKind,
    pub width: u32,
    pub height: u32,
}

impl TextureKey {
    fn new(kind: SpriteKind, size: Vec2) -> Self {
        Self { kind, width: size.x.round() as u32, height: size.y.round() as u32 }
    }
}

/// Procedural bitmap collaborator. Building/furniture/sprite generators
/// live outside the engine; the core only stores and blits whatever handle
/// comes back.
pub trait TextureProvider: Send + Sync {
    /// A drawable for the key, or `None` when nothing is generated for it.
    fn generate(&self, key: TextureKey) -> Option<Handle<Image>>;
}

/// Default collaborator: generates nothing, so every sprite falls back to
/// its flat placeholder color.
pub struct NoTextures;

impl TextureProvider for NoTextures {
    fn generate(&self, _key: TextureKey) -> Option<Handle<Image>> {
        None
    }
}

/// Handle cache in front of the provider. Each key is generated at most
/// once; repeat lookups reuse the stored handle, including a remembered
/// "nothing generated".
#[derive(Resource)]
pub struct Textures {
    pub provider: Box<dyn TextureProvider>,
    cache: std::collections::HashMap<TextureKey, Option<Handle<Image>>>,
}

impl Default for Textures {
    fn default() -> Self {
        Self {
            provider: Box::new(NoTextures),
            cache: std::collections::HashMap::new(),
        }
    }
}

impl Textures {
    pub fn get(&mut self, kind: SpriteKind, size: Vec2) -> Option<Handle<Image>> {
        let key = TextureKey::new(kind, size);
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }
        let generated = self.provider.generate(key);
        self.cache.insert(key, generated.clone());
        generated
    }
}

/// Give freshly spawned drawables a sprite: the collaborator's texture when
/// one exists, the flat placeholder otherwise. Entities that were spawned
/// with their own `Sprite` (interior floor tiles) are left alone.
fn attach_sprites(
    mut commands: Commands,
    mut textures: ResMut<Textures>,
    new_drawables: Query<(Entity, &Drawable), (Added<Drawable>, Without<Sprite>)>,
) {
    for (entity, drawable) in &new_drawables {
        let (color, size) = draw_params(drawable.kind);
        let sprite = match textures.get(drawable.kind, size) {
            Some(image) => Sprite {
                image,
                custom_size: Some(size),
                ..default()
            },
            None => Sprite::from_color(color, size),
        };
        commands
            .entity(entity)
            .insert((sprite, Transform::default(), Visibility::Hidden));
    }
}

// ═══════════════════════════════════════════════════════════════════════
// NIGHT OVERLAY
// ═══════════════════════════════════════════════════════════════════════

/// Darkness of the full-screen overlay by hour, as a step function. Dawn
/// and dusk get intermediate steps rather than a smooth ramp.
pub fn night_overlay_alpha(hour: u8) -> f32 {
    match hour {
        22..=23 | 0..=4 => 0.55,
        20..=21 | 5 => 0.35,
        18..=19 | 6 => 0.15,
        _ => 0.0,
    }
}

#[derive(Component)]
struct NightOverlay;

fn spawn_night_overlay(mut commands: Commands) {
    commands.spawn((
        NightOverlay,
        Node {
            position_type: PositionType::Absolute,
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            ..default()
        },
        BackgroundColor(Color::srgba(0.02, 0.03, 0.10, 0.0)),
        ZIndex(100),
    ));
}

/// Interiors are always lit; the overlay only darkens the open world.
fn update_night_overlay(
    clock: Res<GameClock>,
    player: Res<PlayerState>,
    mut overlays: Query<&mut BackgroundColor, With<NightOverlay>>,
) {
    let alpha = match player.context {
        MapContext::OpenWorld => night_overlay_alpha(clock.hour),
        MapContext::Interior(_) => 0.0,
    };
    for mut bg in &mut overlays {
        bg.0 = Color::srgba(0.02, 0.03, 0.10, alpha);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// TOASTS
// ═══════════════════════════════════════════════════════════════════════

#[derive(Component)]
struct ToastText {
    remaining: f32,
}

fn spawn_toast_text(mut commands: Commands) {
    commands.spawn((
        ToastText { remaining: 0.0 },
        Text::new(""),
        TextFont { font_size: 18.0, ..default() },
        TextColor(Color::WHITE),
        Node {
            position_type: PositionType::Absolute,
            bottom: Val::Px(24.0),
            left: Val::Px(24.0),
            ..default()
        },
        ZIndex(200),
    ));
}

/// Show the latest toast for a few seconds, then clear.
fn show_toasts(
    time: Res<Time>,
    mut events: EventReader<ToastEvent>,
    mut toasts: Query<(&mut ToastText, &mut Text)>,
) {
    let latest = events.read().last().cloned();
    for (mut toast, mut text) in &mut toasts {
        if let Some(event) = &latest {
            text.0 = event.message.clone();
            toast.remaining = 3.0;
        } else if toast.remaining > 0.0 {
            toast.remaining -= time.delta_secs();
            if toast.remaining <= 0.0 {
                text.0.clear();
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// INTERIOR FLOOR
// ═══════════════════════════════════════════════════════════════════════

/// Furniture/floor entity belonging to one interior, despawned on exit.
#[derive(Component, Debug, Clone, Copy)]
struct InteriorDressing(usize);

/// Spawn or tear down the interior floor when the player's context changes:
/// striped floor tiles plus a perimeter wall row.
fn sync_interior_dressing(
    mut commands: Commands,
    player: Res<PlayerState>,
    layout: Res<WorldLayout>,
    existing: Query<(Entity, &InteriorDressing)>,
    mut previous: Local<Option<MapContext>>,
) {
    if *previous == Some(player.context) {
        return;
    }
    *previous = Some(player.context);

    for (entity, _) in &existing {
        commands.entity(entity).despawn();
    }
    let MapContext::Interior(idx) = player.context else {
        return;
    };
    let Some((w, h)) = layout.buildings.get(idx).and_then(|b| b.interior) else {
        return;
    };

    for y in 0..h {
        for x in 0..w {
            // Alternate stripes so depth reads without textures.
            let shade = if (x + y) % 2 == 0 { 0.62 } else { 0.55 };
            commands.spawn((
                InteriorDressing(idx),
                Sprite::from_color(
                    Color::srgb(shade, shade * 0.85, shade * 0.65),
                    Vec2::new(HALF_TILE_W * 2.0, HALF_TILE_H * 2.0),
                ),
                Drawable { kind: SpriteKind::Furniture, height: HALF_TILE_H },
                LogicalPosition(Vec2::new(x as f32 + 0.5, y as f32 + 0.5)),
                ContextTag(MapContext::Interior(idx)),
                Transform::default(),
                Visibility::Hidden,
            ));
        }
    }
    // Back walls along the two far edges.
    for x in 0..w {
        commands.spawn((
            InteriorDressing(idx),
            Drawable { kind: SpriteKind::Furniture, height: HALF_TILE_H * 3.0 },
            LogicalPosition(Vec2::new(x as f32 + 0.5, -0.5)),
            ContextTag(MapContext::Interior(idx)),
        ));
    }
    for y in 0..h {
        commands.spawn((
            InteriorDressing(idx),
            Drawable { kind: SpriteKind::Furniture, height: HALF_TILE_H * 3.0 },
            LogicalPosition(Vec2::new(-0.5, y as f32 + 0.5)),
            ContextTag(MapContext::Interior(idx)),
        ));
    }
}

// ═══════════════════════════════════════════════════════════════════════
// MINIMAP
// ═══════════════════════════════════════════════════════════════════════

fn drive_minimap(
    player: Res<PlayerState>,
    camera: Res<WorldCamera>,
    projector: Res<Projector>,
    markers: Query<&LogicalPosition, With<PoiMarker>>,
) {
    if player.context != MapContext::OpenWorld {
        return;
    }
    let marker_positions: Vec<Vec2> = markers.iter().map(|p| p.0).collect();
    projector
        .basemap
        .render_minimap(camera.pos, player.position(), &marker_positions);
}

// ═══════════════════════════════════════════════════════════════════════
// PLUGIN
// ═══════════════════════════════════════════════════════════════════════

fn spawn_render_camera(mut commands: Commands) {
    commands.spawn(Camera2d);
}

pub struct RenderPlugin;

impl Plugin for RenderPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DrawList>()
            .init_resource::<Textures>()
            .add_systems(Startup, (spawn_render_camera, spawn_night_overlay, spawn_toast_text))
            .add_systems(
                PostUpdate,
                (
                    attach_sprites,
                    sync_interior_dressing,
                    build_draw_list,
                    project_and_order,
                    update_night_overlay,
                    show_toasts,
                    drive_minimap,
                )
                    .chain()
                    .run_if(in_state(GameState::Playing)),
            );
    }
}

// ═══════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(raw: u32, x: f32, y: f32) -> DrawEntry {
        DrawEntry {
            entity: Entity::from_raw(raw),
            kind: SpriteKind::Npc,
            world: Vec2::new(x, y),
            height: 0.0,
        }
    }

    #[test]
    fn depth_sort_orders_y_then_x() {
        let mut entries = vec![entry(1, 3.0, 5.0), entry(2, 1.0, 5.0), entry(3, 9.0, 2.0)];
        sort_draw_list(&mut entries);
        let order: Vec<u32> = entries.iter().map(|e| e.entity.index()).collect();
        // Y=2 first, then the Y=5 pair by X ascending.
        assert_eq!(order, vec![3, 2, 1]);
    }

    #[test]
    fn depth_sort_is_insertion_order_independent() {
        let mut a = vec![entry(1, 1.0, 5.0), entry(2, 3.0, 5.0)];
        let mut b = vec![entry(2, 3.0, 5.0), entry(1, 1.0, 5.0)];
        sort_draw_list(&mut a);
        sort_draw_list(&mut b);
        let order_a: Vec<u32> = a.iter().map(|e| e.entity.index()).collect();
        let order_b: Vec<u32> = b.iter().map(|e| e.entity.index()).collect();
        assert_eq!(order_a, order_b);
        assert_eq!(order_a, vec![1, 2], "X=1 draws before X=3 at equal Y");
    }

    #[test]
    fn depth_sort_is_stable_at_identical_coordinates() {
        let mut entries = vec![entry(7, 4.0, 4.0), entry(8, 4.0, 4.0), entry(9, 4.0, 4.0)];
        sort_draw_list(&mut entries);
        let order: Vec<u32> = entries.iter().map(|e| e.entity.index()).collect();
        assert_eq!(order, vec![7, 8, 9]);
    }

    #[test]
    fn night_overlay_is_a_step_function() {
        assert_eq!(night_overlay_alpha(12), 0.0);
        assert_eq!(night_overlay_alpha(18), 0.15);
        assert_eq!(night_overlay_alpha(21), 0.35);
        assert_eq!(night_overlay_alpha(23), 0.55);
        assert_eq!(night_overlay_alpha(2), 0.55);
        assert_eq!(night_overlay_alpha(5), 0.35);
        assert_eq!(night_overlay_alpha(7), 0.0);
        // Step edges, not a ramp: adjacent hours share the same plateau.
        assert_eq!(night_overlay_alpha(22), night_overlay_alpha(3));
    }

    #[test]
    fn texture_cache_generates_each_key_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        struct CountingProvider(Arc<AtomicUsize>);
        impl TextureProvider for CountingProvider {
            fn generate(&self, _key: TextureKey) -> Option<Handle<Image>> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Some(Handle::default())
            }
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let mut textures = Textures {
            provider: Box::new(CountingProvider(calls.clone())),
            cache: std::collections::HashMap::new(),
        };

        let tree = Vec2::new(20.0, 30.0);
        assert!(textures.get(SpriteKind::Tree, tree).is_some());
        textures.get(SpriteKind::Tree, tree);
        textures.get(SpriteKind::Tree, tree);
        textures.get(SpriteKind::Npc, Vec2::new(12.0, 18.0));
        assert_eq!(calls.load(Ordering::SeqCst), 2, "one generation per distinct key");
    }

    #[test]
    fn default_provider_falls_back_to_placeholders() {
        let mut textures = Textures::default();
        assert!(textures.get(SpriteKind::Marker, Vec2::new(12.0, 18.0)).is_none());
        // The miss is remembered, not retried.
        assert!(textures.get(SpriteKind::Marker, Vec2::new(12.0, 18.0)).is_none());
        assert_eq!(textures.cache.len(), 1);
    }

    #[test]
    fn draw_params_cover_every_kind() {
        // Exhaustive match compiles; spot-check a couple of sizes.
        let (_, tree) = draw_params(SpriteKind::Tree);
        assert!(tree.y > tree.x, "trees are taller than wide");
        let (_, light) = draw_params(SpriteKind::StreetLight);
        assert!(light.y > light.x);
    }
}
