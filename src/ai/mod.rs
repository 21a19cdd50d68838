//! NPC behavior: wandering, sickness, and companion follow.
//!
//! Exactly one behavior drives motion each tick, priority
//! Following > Sick > Wandering. The motion math lives in pure helpers so
//! the state machine is testable without an `App`.

use bevy::prelude::*;
use rand::Rng;

use crate::data::NPC_SEEDS;
use crate::shared::*;
use crate::spatial::nearest_within;
use crate::world::TileGrid;

/// Chance per second that a healthy NPC falls sick.
const SICKNESS_CHANCE_PER_SEC: f64 = 0.002;
/// How long a sick NPC stays sick once it reaches care.
const RECOVERY_SECONDS: f32 = 45.0;
/// Chance per second that an idle NPC starts a new wander.
const WANDER_CHANCE_PER_SEC: f64 = 0.4;

// ═══════════════════════════════════════════════════════════════════════
// PURE MOTION HELPERS
// ═══════════════════════════════════════════════════════════════════════

/// One tick of companion motion. Keeps a comfort band around the player:
/// advance when more than `follow_distance + 1` away, back off when closer
/// than `follow_distance - 0.5`, hold in between. The dead band stops the
/// NPC oscillating around the exact radius.
pub fn follow_step(pos: Vec2, player: Vec2, follow_distance: f32, speed: f32, dt: f32) -> Vec2 {
    let dist = pos.distance(player);
    let step = speed * dt;
    if dist > follow_distance + 1.0 {
        let toward = (player - pos).normalize_or_zero();
        // Never overshoot into the inner band.
        pos + toward * step.min(dist - follow_distance)
    } else if dist < follow_distance - 0.5 && dist > f32::EPSILON {
        let away = (pos - player).normalize_or_zero();
        pos + away * step.min(follow_distance - dist)
    } else {
        pos
    }
}

/// Advance toward `target`, arriving within `ARRIVE_EPSILON`. Returns the
/// new position and whether the target was reached.
pub fn advance_toward(pos: Vec2, target: Vec2, speed: f32, dt: f32) -> (Vec2, bool) {
    let dist = pos.distance(target);
    if dist <= ARRIVE_EPSILON {
        return (pos, true);
    }
    let step = speed * dt;
    if step >= dist {
        (target, true)
    } else {
        (pos + (target - pos).normalize_or_zero() * step, false)
    }
}

/// Pick a wander target near `home`. May land on a blocked tile; the walk
/// tick cancels in that case rather than pre-validating the whole path.
pub fn pick_wander_target(home: Vec2, rng: &mut impl Rng) -> Vec2 {
    let dx = rng.gen_range(-NPC_WANDER_RADIUS..=NPC_WANDER_RADIUS);
    let dy = rng.gen_range(-NPC_WANDER_RADIUS..=NPC_WANDER_RADIUS);
    home + Vec2::new(dx, dy)
}

// ═══════════════════════════════════════════════════════════════════════
// SYSTEMS
// ═══════════════════════════════════════════════════════════════════════

/// The per-tick behavior driver.
fn drive_npc_ai(
    time: Res<Time>,
    grid: Res<TileGrid>,
    player: Res<PlayerState>,
    mut npcs: Query<(&mut NpcAi, &mut LogicalPosition), With<Npc>>,
) {
    let dt = time.delta_secs();
    let mut rng = rand::thread_rng();

    for (mut ai, mut pos) in &mut npcs {
        if ai.follows_player {
            // Companions ignore terrain except water/buildings; re-anchor
            // home so stopping the follow doesn't snap them back.
            let next = follow_step(pos.0, player.position(), ai.follow_distance, ai.speed, dt);
            if !grid.blocks_npc(next.x.floor() as i32, next.y.floor() as i32) {
                pos.0 = next;
            }
            ai.home = pos.0;
            ai.target = None;
            continue;
        }

        if ai.sick {
            // Walk to care; the recovery countdown only starts on arrival.
            // With no healer there is no target, no arrival, and no recovery.
            if let Some(target) = ai.target {
                let (next, arrived) = advance_toward(pos.0, target, ai.speed, dt);
                if !grid.blocks_npc(next.x.floor() as i32, next.y.floor() as i32) {
                    pos.0 = next;
                }
                if arrived {
                    ai.target = None;
                    if ai.recovery_at.is_none() {
                        ai.recovery_at = Some(time.elapsed_secs() + RECOVERY_SECONDS);
                    }
                }
            }
            continue;
        }

        // Wandering.
        match ai.target {
            Some(target) => {
                let (next, arrived) = advance_toward(pos.0, target, ai.speed, dt);
                if grid.blocks_npc(next.x.floor() as i32, next.y.floor() as i32) {
                    // Blocked mid-walk: give up and idle again.
                    ai.target = None;
                    ai.stand_timer = rng.gen_range(1.0..3.0);
                    continue;
                }
                pos.0 = next;
                ai.wander_timer -= dt;
                if arrived || ai.wander_timer <= 0.0 {
                    ai.target = None;
                    ai.stand_timer = rng.gen_range(1.0..3.0);
                }
            }
            None => {
                ai.stand_timer -= dt;
                if ai.stand_timer <= 0.0 && rng.gen_bool((WANDER_CHANCE_PER_SEC * dt as f64).min(1.0)) {
                    ai.target = Some(pick_wander_target(ai.home, &mut rng));
                    ai.wander_timer = 8.0;
                }
            }
        }
    }
}

/// Occasionally make a healthy NPC sick and point it at the nearest healer
/// marker. No healer on the map means the NPC stands where it is, stays
/// sick, and never schedules a recovery; nothing panics.
fn sickness_onset(
    time: Res<Time>,
    markers: Query<(&PoiMarker, &LogicalPosition)>,
    mut npcs: Query<(&Npc, &mut NpcAi, &LogicalPosition)>,
) {
    let dt = time.delta_secs();
    let mut rng = rand::thread_rng();

    for (npc, mut ai, pos) in &mut npcs {
        if ai.sick || ai.follows_player {
            continue;
        }
        if !rng.gen_bool((SICKNESS_CHANCE_PER_SEC * dt as f64).min(1.0)) {
            continue;
        }

        ai.sick = true;
        let healer = nearest_within(
            markers
                .iter()
                .filter(|(m, _)| m.healer)
                .map(|(m, p)| (m.name.clone(), p.0)),
            pos.0,
            f32::INFINITY,
        );
        match healer {
            Some((name, _)) => {
                ai.target = markers
                    .iter()
                    .find(|(m, _)| m.name == name)
                    .map(|(_, p)| p.0);
                info!("[AI] {} fell sick, heading to {}", npc.name, name);
            }
            None => {
                ai.target = None;
                warn!("[AI] {} fell sick with no healer on the map", npc.name);
            }
        }
    }
}

/// Expire scheduled recoveries. The expiry is a plain field checked every
/// pass, so a recovery scheduled for an NPC that was healed some other way
/// is discarded instead of firing.
fn recovery_tick(time: Res<Time>, mut npcs: Query<(&Npc, &mut NpcAi)>) {
    let now = time.elapsed_secs();
    for (npc, mut ai) in &mut npcs {
        let Some(at) = ai.recovery_at else { continue };
        if now < at {
            continue;
        }
        ai.recovery_at = None;
        if !ai.sick {
            // Healed in the interim; the stale schedule is dropped.
            continue;
        }
        ai.sick = false;
        // Head back toward the wander anchor.
        ai.target = Some(ai.home);
        ai.wander_timer = 8.0;
        info!("[AI] {} recovered", npc.name);
    }
}

fn spawn_npcs(mut commands: Commands, existing: Query<(), With<Npc>>) {
    if !existing.is_empty() {
        return;
    }
    for seed in NPC_SEEDS {
        let home = Vec2::new(seed.home.0, seed.home.1);
        let mut ai = NpcAi::at(home);
        ai.follow_distance = seed.follow_distance;
        commands.spawn((
            Npc {
                id: seed.id.to_string(),
                name: seed.name.to_string(),
                role: seed.role,
                dialogue: seed.dialogue.iter().map(|s| s.to_string()).collect(),
            },
            ai,
            Drawable::new(SpriteKind::Npc),
            LogicalPosition(home),
            ContextTag(MapContext::OpenWorld),
        ));
    }
    info!("[AI] Spawned {} NPCs", NPC_SEEDS.len());
}

pub struct AiPlugin;

impl Plugin for AiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(GameState::Playing), spawn_npcs)
            .add_systems(
                Update,
                (sickness_onset, recovery_tick, drive_npc_ai)
                    .chain()
                    .run_if(in_state(GameState::Playing)),
            );
    }
}
