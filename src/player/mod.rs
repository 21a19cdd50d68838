//! Player movement, collision, and the car toggle.
//!
//! All movement happens in world tile units against `PlayerState`; the
//! render pipeline projects the synced `LogicalPosition` afterwards.

use bevy::prelude::*;

use crate::shared::*;
use crate::world::{TileGrid, WorldLayout};

/// World-space tile offset one step ahead of the player, used to aim tool
/// and interaction targets.
pub fn facing_offset(facing: Facing) -> (i32, i32) {
    match facing {
        Facing::Up => (0, -1),
        Facing::Down => (0, 1),
        Facing::Left => (-1, 0),
        Facing::Right => (1, 0),
    }
}

/// Resolve one axis-separated movement step. Collision checks X and Y
/// independently so the player slides along blocked edges instead of
/// sticking. Interiors clamp to the floor rect instead of the grid.
pub fn step_player(
    player: &mut PlayerState,
    dir: Vec2,
    dt: f32,
    grid: &TileGrid,
    interior: Option<(i32, i32)>,
) {
    if dir == Vec2::ZERO {
        player.is_moving = false;
        return;
    }

    // Vertical input wins the facing so tools aim up/down while strafing.
    player.facing = if dir.y < 0.0 {
        Facing::Up
    } else if dir.y > 0.0 {
        Facing::Down
    } else if dir.x < 0.0 {
        Facing::Left
    } else {
        Facing::Right
    };
    player.is_moving = true;

    let speed = if player.in_car { player.car_speed } else { PLAYER_SPEED };
    let delta = dir.normalize_or_zero() * speed * dt;

    match interior {
        None => {
            let nx = player.x + delta.x;
            if !grid.blocks_player(nx.floor() as i32, player.y.floor() as i32) {
                player.x = nx;
            }
            let ny = player.y + delta.y;
            if !grid.blocks_player(player.x.floor() as i32, ny.floor() as i32) {
                player.y = ny;
            }
        }
        Some((w, h)) => {
            player.x = (player.x + delta.x).clamp(0.5, w as f32 - 0.5);
            player.y = (player.y + delta.y).clamp(0.5, h as f32 - 0.5);
        }
    }
}

fn read_direction(keys: &ButtonInput<KeyCode>) -> Vec2 {
    let mut dir = Vec2::ZERO;
    if keys.pressed(KeyCode::KeyW) || keys.pressed(KeyCode::ArrowUp) {
        dir.y -= 1.0;
    }
    if keys.pressed(KeyCode::KeyS) || keys.pressed(KeyCode::ArrowDown) {
        dir.y += 1.0;
    }
    if keys.pressed(KeyCode::KeyA) || keys.pressed(KeyCode::ArrowLeft) {
        dir.x -= 1.0;
    }
    if keys.pressed(KeyCode::KeyD) || keys.pressed(KeyCode::ArrowRight) {
        dir.x += 1.0;
    }
    dir
}

fn player_movement(
    keys: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    grid: Res<TileGrid>,
    layout: Res<WorldLayout>,
    mut player: ResMut<PlayerState>,
) {
    let interior = match player.context {
        MapContext::OpenWorld => None,
        MapContext::Interior(idx) => layout
            .buildings
            .get(idx)
            .and_then(|b| b.interior)
            .or(Some((8, 6))),
    };
    let dir = read_direction(&keys);
    step_player(&mut player, dir, time.delta_secs(), &grid, interior);
}

/// C toggles the car. Only outdoors; the car stays at the door when the
/// player walks inside.
fn car_toggle(
    keys: Res<ButtonInput<KeyCode>>,
    mut player: ResMut<PlayerState>,
    mut toasts: EventWriter<ToastEvent>,
) {
    if !keys.just_pressed(KeyCode::KeyC) {
        return;
    }
    if player.context != MapContext::OpenWorld {
        toasts.send(ToastEvent::new("You can't drive in here."));
        return;
    }
    player.in_car = !player.in_car;
    let verb = if player.in_car { "Hopped in the car" } else { "Got out of the car" };
    info!("[Player] {verb}");
}

/// Keep the player's drawable entity in sync with the resource. The sprite
/// entity is display-only; `PlayerState` stays authoritative.
fn sync_player_entity(
    player: Res<PlayerState>,
    mut query: Query<(&mut LogicalPosition, &mut ContextTag), With<Player>>,
) {
    for (mut pos, mut tag) in &mut query {
        pos.0 = player.position();
        tag.0 = player.context;
    }
}

fn spawn_player(mut commands: Commands, player: Res<PlayerState>) {
    commands.spawn((
        Player,
        Drawable { kind: SpriteKind::PlayerSprite, height: 0.0 },
        LogicalPosition(player.position()),
        ContextTag(player.context),
    ));
    info!("[Player] Spawned at ({:.0}, {:.0})", player.x, player.y);
}

pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PlayerState>()
            .add_systems(OnEnter(GameState::Playing), spawn_player)
            .add_systems(
                Update,
                (player_movement, car_toggle, sync_player_entity)
                    .chain()
                    .run_if(in_state(GameState::Playing)),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_grid() -> TileGrid {
        TileGrid::new(20, 20)
    }

    #[test]
    fn water_blocks_movement_on_each_axis() {
        let mut grid = open_grid();
        grid.set_tile(6, 5, TileCode::Water);
        let mut player = PlayerState { x: 5.5, y: 5.5, ..Default::default() };

        for _ in 0..20 {
            step_player(&mut player, Vec2::new(1.0, 0.0), 0.1, &grid, None);
        }
        assert!(player.x < 6.0, "water to the east should stop the player");

        // The clear axis still moves: slide along the wall.
        step_player(&mut player, Vec2::new(1.0, 1.0), 0.1, &grid, None);
        assert!(player.y > 5.5);
    }

    #[test]
    fn player_crosses_building_tiles() {
        let mut grid = open_grid();
        grid.set_tile(6, 5, TileCode::Building);
        let mut player = PlayerState { x: 5.5, y: 5.5, ..Default::default() };
        for _ in 0..20 {
            step_player(&mut player, Vec2::new(1.0, 0.0), 0.1, &grid, None);
        }
        assert!(player.x > 7.0);
    }

    #[test]
    fn car_speed_applies_while_driving() {
        let grid = open_grid();
        let mut walker = PlayerState { x: 2.0, y: 2.0, ..Default::default() };
        let mut driver = PlayerState { x: 2.0, y: 2.0, in_car: true, ..Default::default() };
        step_player(&mut walker, Vec2::new(1.0, 0.0), 0.1, &grid, None);
        step_player(&mut driver, Vec2::new(1.0, 0.0), 0.1, &grid, None);
        assert!(driver.x > walker.x);
    }

    #[test]
    fn vertical_input_wins_facing() {
        let grid = open_grid();
        let mut player = PlayerState { x: 5.0, y: 5.0, ..Default::default() };
        step_player(&mut player, Vec2::new(1.0, -1.0), 0.01, &grid, None);
        assert_eq!(player.facing, Facing::Up);
    }

    #[test]
    fn interior_clamps_to_floor() {
        let grid = open_grid();
        let mut player = PlayerState { x: 7.5, y: 3.0, ..Default::default() };
        step_player(&mut player, Vec2::new(1.0, 0.0), 10.0, &grid, Some((8, 6)));
        assert!((player.x - 7.5).abs() < f32::EPSILON);
    }

    #[test]
    fn zero_input_clears_is_moving() {
        let grid = open_grid();
        let mut player = PlayerState { is_moving: true, ..Default::default() };
        step_player(&mut player, Vec2::ZERO, 0.1, &grid, None);
        assert!(!player.is_moving);
    }

    #[test]
    fn facing_offsets_point_one_tile_ahead() {
        assert_eq!(facing_offset(Facing::Up), (0, -1));
        assert_eq!(facing_offset(Facing::Down), (0, 1));
        assert_eq!(facing_offset(Facing::Left), (-1, 0));
        assert_eq!(facing_offset(Facing::Right), (1, 0));
    }
}
