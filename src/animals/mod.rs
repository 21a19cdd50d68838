//! Ambient critters and farm livestock: wandering, feeding, and the
//! overnight produce/happiness pass.

use bevy::prelude::*;
use rand::Rng;

use crate::data::{AMBIENT_ANIMAL_SEEDS, FARM_ANIMAL_SEEDS};
use crate::shared::*;
use crate::spatial::nearest_within;
use crate::world::TileGrid;

/// How close the player must stand to feed an animal, in tiles.
const FEED_RANGE: f32 = 2.0;
const FED_HAPPINESS_GAIN: u8 = 8;

// ═══════════════════════════════════════════════════════════════════════
// WANDERING
// ═══════════════════════════════════════════════════════════════════════

/// Shared idle/walk cycle used by both animal kinds: idle a randomized
/// moment, pick a target inside the home zone, walk there, idle again.
/// Returns the new position.
fn wander_tick(
    pos: Vec2,
    home: Vec2,
    radius: f32,
    speed: f32,
    target: &mut Option<Vec2>,
    idle_timer: &mut f32,
    dt: f32,
    rng: &mut impl Rng,
) -> Vec2 {
    match *target {
        Some(t) => {
            let dist = pos.distance(t);
            if dist <= ARRIVE_EPSILON {
                *target = None;
                *idle_timer = rng.gen_range(1.0..4.0);
                pos
            } else {
                let step = (speed * dt).min(dist);
                pos + (t - pos).normalize_or_zero() * step
            }
        }
        None => {
            *idle_timer -= dt;
            if *idle_timer <= 0.0 {
                let dx = rng.gen_range(-radius..=radius);
                let dy = rng.gen_range(-radius..=radius);
                *target = Some(home + Vec2::new(dx, dy));
            }
            pos
        }
    }
}

fn ambient_wander(
    time: Res<Time>,
    grid: Res<TileGrid>,
    mut animals: Query<(&mut Animal, &mut LogicalPosition)>,
) {
    let dt = time.delta_secs();
    let mut rng = rand::thread_rng();
    for (mut animal, mut pos) in &mut animals {
        let home = animal.home;
        let radius = animal.wander_radius;
        let speed = animal.kind.speed();
        let Animal { target, idle_timer, .. } = &mut *animal;
        let next = wander_tick(pos.0, home, radius, speed, target, idle_timer, dt, &mut rng);
        if !grid.blocks_npc(next.x.floor() as i32, next.y.floor() as i32) {
            pos.0 = next;
        } else {
            animal.target = None;
        }
    }
}

fn farm_wander(
    time: Res<Time>,
    grid: Res<TileGrid>,
    mut animals: Query<(&mut FarmAnimal, &mut LogicalPosition)>,
) {
    let dt = time.delta_secs();
    let mut rng = rand::thread_rng();
    for (mut animal, mut pos) in &mut animals {
        let home = animal.home;
        let radius = animal.wander_radius;
        let speed = animal.kind.speed();
        let FarmAnimal { target, idle_timer, .. } = &mut *animal;
        let next = wander_tick(pos.0, home, radius, speed, target, idle_timer, dt, &mut rng);
        if !grid.blocks_npc(next.x.floor() as i32, next.y.floor() as i32) {
            pos.0 = next;
        } else {
            animal.target = None;
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// FEEDING & ROLLOVER
// ═══════════════════════════════════════════════════════════════════════

/// F feeds the nearest hungry farm animal, consuming one feed.
fn feed_animal(
    keys: Res<ButtonInput<KeyCode>>,
    player: Res<PlayerState>,
    mut inventory: ResMut<Inventory>,
    mut animals: Query<(Entity, &mut FarmAnimal, &LogicalPosition)>,
    mut toasts: EventWriter<ToastEvent>,
) {
    if !keys.just_pressed(KeyCode::KeyF) || player.context != MapContext::OpenWorld {
        return;
    }
    let nearest = nearest_within(
        animals
            .iter()
            .filter(|(_, animal, _)| !animal.fed_today)
            .map(|(entity, _, pos)| (entity, pos.0)),
        player.position(),
        FEED_RANGE,
    );
    let Some((entity, _)) = nearest else {
        toasts.send(ToastEvent::new("No hungry animal nearby."));
        return;
    };
    if inventory.try_remove("animal_feed", 1) == 0 {
        toasts.send(ToastEvent::new("Out of animal feed."));
        return;
    }
    if let Ok((_, mut animal, _)) = animals.get_mut(entity) {
        animal.fed_today = true;
        animal.happiness = (animal.happiness + FED_HAPPINESS_GAIN).min(100);
        toasts.send(ToastEvent::new(format!("{} munches happily.", animal.name)));
    }
}

/// Overnight pass for one animal: fed animals may leave a product (sheep
/// only every third day) and everyone starts the new day hungry. Unfed
/// animals lose happiness instead.
pub fn rollover_farm_animal(animal: &mut FarmAnimal, day: u32) -> Option<&'static str> {
    let product = if animal.fed_today {
        animal.kind.product(day)
    } else {
        animal.happiness = animal.happiness.saturating_sub(UNFED_HAPPINESS_LOSS);
        None
    };
    animal.fed_today = false;
    product
}

fn on_day_rollover(
    mut rollovers: EventReader<DayRolloverEvent>,
    mut inventory: ResMut<Inventory>,
    mut animals: Query<&mut FarmAnimal>,
) {
    for event in rollovers.read() {
        let mut produced = 0;
        for mut animal in &mut animals {
            if let Some(item) = rollover_farm_animal(&mut animal, event.day) {
                inventory.add(item, 1);
                produced += 1;
            }
        }
        info!("[Animals] Day {}: {} animals left a product", event.day, produced);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// SPAWNING & PLUGIN
// ═══════════════════════════════════════════════════════════════════════

fn spawn_animals(mut commands: Commands, existing: Query<(), Or<(With<Animal>, With<FarmAnimal>)>>) {
    if !existing.is_empty() {
        return;
    }
    for &(kind, name, (x, y)) in FARM_ANIMAL_SEEDS {
        let home = Vec2::new(x, y);
        commands.spawn((
            FarmAnimal::new(kind, name, home),
            Drawable::new(SpriteKind::FarmAnimal),
            LogicalPosition(home),
            ContextTag(MapContext::OpenWorld),
        ));
    }
    for &(kind, (x, y), radius) in AMBIENT_ANIMAL_SEEDS {
        let home = Vec2::new(x, y);
        commands.spawn((
            Animal {
                kind,
                home,
                wander_radius: radius,
                target: None,
                idle_timer: 1.0,
                frame: 0,
            },
            Drawable::new(SpriteKind::Animal),
            LogicalPosition(home),
            ContextTag(MapContext::OpenWorld),
        ));
    }
    info!(
        "[Animals] Spawned {} farm animals, {} ambient animals",
        FARM_ANIMAL_SEEDS.len(),
        AMBIENT_ANIMAL_SEEDS.len()
    );
}

pub struct AnimalsPlugin;

impl Plugin for AnimalsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(GameState::Playing), spawn_animals)
            .add_systems(
                Update,
                (ambient_wander, farm_wander, feed_animal, on_day_rollover)
                    .run_if(in_state(GameState::Playing)),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cow() -> FarmAnimal {
        FarmAnimal::new(FarmAnimalKind::Cow, "Marla", Vec2::new(228.0, 258.0))
    }

    #[test]
    fn fed_cow_leaves_milk_and_resets_hunger() {
        let mut animal = cow();
        animal.fed_today = true;
        assert_eq!(rollover_farm_animal(&mut animal, 5), Some("milk"));
        assert!(!animal.fed_today);
    }

    #[test]
    fn unfed_animal_loses_happiness_and_produces_nothing() {
        let mut animal = cow();
        animal.happiness = 20;
        assert_eq!(rollover_farm_animal(&mut animal, 5), None);
        assert_eq!(animal.happiness, 20 - UNFED_HAPPINESS_LOSS);

        // Saturating at zero, never wrapping.
        animal.happiness = 3;
        rollover_farm_animal(&mut animal, 6);
        assert_eq!(animal.happiness, 0);
    }

    #[test]
    fn sheep_wool_follows_the_global_day_gate() {
        let mut sheep = FarmAnimal::new(FarmAnimalKind::Sheep, "Wooly", Vec2::ZERO);
        sheep.fed_today = true;
        assert_eq!(rollover_farm_animal(&mut sheep, 3), Some("wool"));
        sheep.fed_today = true;
        assert_eq!(rollover_farm_animal(&mut sheep, 4), None, "fed but off-cycle");
        sheep.fed_today = true;
        assert_eq!(rollover_farm_animal(&mut sheep, 6), Some("wool"));
    }

    #[test]
    fn wander_tick_idles_then_walks_to_target() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;
        let mut rng = StdRng::seed_from_u64(3);
        let home = Vec2::new(10.0, 10.0);
        let mut target = None;
        let mut idle = 0.5;

        // Idle burns down, then a target appears within the zone.
        let pos = wander_tick(home, home, 4.0, 1.0, &mut target, &mut idle, 1.0, &mut rng);
        assert_eq!(pos, home);
        let t = target.expect("target picked after idling");
        assert!((t.x - home.x).abs() <= 4.0 && (t.y - home.y).abs() <= 4.0);

        // Walking closes in on the target without overshooting.
        let next = wander_tick(pos, home, 4.0, 1.0, &mut target, &mut idle, 0.5, &mut rng);
        assert!(next.distance(t) < pos.distance(t));
    }
}
