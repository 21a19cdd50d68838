//! Farming: tilling, watering, planting, harvesting, and overnight growth.
//!
//! All gameplay mutations go through the pure action functions so the rules
//! are testable without an `App`; the systems only wire input and events to
//! them.

use bevy::prelude::*;

use crate::player::facing_offset;
use crate::shared::*;
use crate::world::TileGrid;

// ═══════════════════════════════════════════════════════════════════════
// ACTIONS
// ═══════════════════════════════════════════════════════════════════════

/// Why a farm action was refused. Every variant maps to a toast, never a
/// crash or a silent no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    Exhausted,
    NotTillable,
    NotFarmland,
    TileOccupied,
    NothingPlanted,
    NotRipe,
    NoSeeds,
    UnknownCrop,
}

impl ActionError {
    pub fn message(&self) -> &'static str {
        match self {
            ActionError::Exhausted => "Too tired. Get some rest.",
            ActionError::NotTillable => "Can't till here.",
            ActionError::NotFarmland => "This isn't farmland.",
            ActionError::TileOccupied => "Something is already growing here.",
            ActionError::NothingPlanted => "Nothing planted here.",
            ActionError::NotRipe => "Not ready to harvest yet.",
            ActionError::NoSeeds => "No seeds of that kind.",
            ActionError::UnknownCrop => "Unknown seed.",
        }
    }
}

fn require_energy(player: &PlayerState) -> Result<(), ActionError> {
    if player.energy <= 0.0 {
        return Err(ActionError::Exhausted);
    }
    Ok(())
}

/// Till a default tile into farmland.
pub fn till_action(
    grid: &mut TileGrid,
    player: &mut PlayerState,
    x: i32,
    y: i32,
) -> Result<(), ActionError> {
    require_energy(player)?;
    if grid.tile_at(x, y) != Some(TileCode::Walkable) {
        return Err(ActionError::NotTillable);
    }
    grid.till(x, y);
    player.spend_energy(TOOL_ENERGY_COST);
    Ok(())
}

/// Water a farmland tile. Watering bare farmland is allowed and remembered;
/// a crop planted later the same day counts as watered.
pub fn water_action(
    grid: &TileGrid,
    farm: &mut FarmState,
    player: &mut PlayerState,
    x: i32,
    y: i32,
) -> Result<(), ActionError> {
    require_energy(player)?;
    if grid.tile_at(x, y) != Some(TileCode::Farmland) {
        return Err(ActionError::NotFarmland);
    }
    farm.watered_tiles.insert((x, y));
    if let Some(crop) = farm.crops.get_mut(&(x, y)) {
        crop.watered = true;
    }
    player.spend_energy(TOOL_ENERGY_COST);
    Ok(())
}

/// Plant a seed on empty farmland. The crop map is keyed by tile, so a
/// second plant on the same tile is refused rather than overwriting.
pub fn plant_action(
    grid: &TileGrid,
    farm: &mut FarmState,
    player: &mut PlayerState,
    inventory: &mut Inventory,
    registry: &CropRegistry,
    seed_id: &str,
    x: i32,
    y: i32,
    day: u32,
) -> Result<(), ActionError> {
    require_energy(player)?;
    if grid.tile_at(x, y) != Some(TileCode::Farmland) {
        return Err(ActionError::NotFarmland);
    }
    if farm.crops.contains_key(&(x, y)) {
        return Err(ActionError::TileOccupied);
    }
    let def = registry.by_seed(seed_id).ok_or(ActionError::UnknownCrop)?;
    if !inventory.has(seed_id, 1) {
        return Err(ActionError::NoSeeds);
    }

    inventory.try_remove(seed_id, 1);
    farm.crops.insert(
        (x, y),
        Crop {
            kind: def.id.to_string(),
            stage: 0,
            watered: farm.watered_tiles.contains(&(x, y)),
            planted_day: day,
        },
    );
    player.spend_energy(TOOL_ENERGY_COST);
    Ok(())
}

/// Harvest a ripe crop: the tile empties, the good lands in the inventory,
/// and the sell price is credited immediately.
pub fn harvest_action(
    farm: &mut FarmState,
    player: &mut PlayerState,
    inventory: &mut Inventory,
    registry: &CropRegistry,
    x: i32,
    y: i32,
) -> Result<CropHarvestedEvent, ActionError> {
    require_energy(player)?;
    let crop = farm.crops.get(&(x, y)).ok_or(ActionError::NothingPlanted)?;
    if crop.stage < MAX_CROP_STAGE {
        return Err(ActionError::NotRipe);
    }
    let def = registry.get(&crop.kind).ok_or(ActionError::UnknownCrop)?;

    let kind = def.id.to_string();
    let gold = def.sell_price;
    farm.crops.remove(&(x, y));
    inventory.add(&kind, 1);
    player.gold += gold;
    player.spend_energy(TOOL_ENERGY_COST);
    Ok(CropHarvestedEvent { kind, x, y, gold })
}

/// Ripe crop at a tile, if any. UI panels ask this before offering a
/// harvest prompt.
pub fn harvestable_crop_at(farm: &FarmState, x: i32, y: i32) -> Option<&Crop> {
    farm.crops.get(&(x, y)).filter(|crop| crop.stage >= MAX_CROP_STAGE)
}

/// Overnight growth: watered crops advance one stage (capped), then every
/// crop and tile starts the new day dry.
pub fn advance_crops(farm: &mut FarmState) {
    for crop in farm.crops.values_mut() {
        if crop.watered && crop.stage < MAX_CROP_STAGE {
            crop.stage += 1;
        }
        crop.watered = false;
    }
    farm.watered_tiles.clear();
}

// ═══════════════════════════════════════════════════════════════════════
// TOOL INPUT
// ═══════════════════════════════════════════════════════════════════════

#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectedTool {
    #[default]
    Hoe,
    WateringCan,
    SeedBag,
    Basket,
}

fn select_tool(keys: Res<ButtonInput<KeyCode>>, mut tool: ResMut<SelectedTool>) {
    if keys.just_pressed(KeyCode::Digit1) {
        *tool = SelectedTool::Hoe;
    } else if keys.just_pressed(KeyCode::Digit2) {
        *tool = SelectedTool::WateringCan;
    } else if keys.just_pressed(KeyCode::Digit3) {
        *tool = SelectedTool::SeedBag;
    } else if keys.just_pressed(KeyCode::Digit4) {
        *tool = SelectedTool::Basket;
    }
}

/// First seed kind the player actually owns, in registry order.
fn first_owned_seed(inventory: &Inventory, registry: &CropRegistry) -> Option<String> {
    let mut owned: Vec<&CropDef> = registry
        .crops
        .values()
        .filter(|def| inventory.has(def.seed_id, 1))
        .collect();
    owned.sort_by_key(|def| def.id);
    owned.first().map(|def| def.seed_id.to_string())
}

#[allow(clippy::too_many_arguments)]
fn use_tool(
    keys: Res<ButtonInput<KeyCode>>,
    clock: Res<GameClock>,
    registry: Res<CropRegistry>,
    tool: Res<SelectedTool>,
    mut grid: ResMut<TileGrid>,
    mut farm: ResMut<FarmState>,
    mut player: ResMut<PlayerState>,
    mut inventory: ResMut<Inventory>,
    mut harvests: EventWriter<CropHarvestedEvent>,
    mut toasts: EventWriter<ToastEvent>,
) {
    if !keys.just_pressed(KeyCode::Space) || player.context != MapContext::OpenWorld {
        return;
    }
    let (px, py) = player.tile();
    let (ox, oy) = facing_offset(player.facing);
    let (x, y) = (px + ox, py + oy);

    let result = match *tool {
        SelectedTool::Hoe => till_action(&mut grid, &mut player, x, y),
        SelectedTool::WateringCan => water_action(&grid, &mut farm, &mut player, x, y),
        SelectedTool::SeedBag => match first_owned_seed(&inventory, &registry) {
            Some(seed_id) => plant_action(
                &grid,
                &mut farm,
                &mut player,
                &mut inventory,
                &registry,
                &seed_id,
                x,
                y,
                clock.day,
            ),
            None => Err(ActionError::NoSeeds),
        },
        SelectedTool::Basket => {
            harvest_action(&mut farm, &mut player, &mut inventory, &registry, x, y).map(|event| {
                info!("[Farming] Harvested {} (+{} gold)", event.kind, event.gold);
                harvests.send(event);
            })
        }
    };

    if let Err(err) = result {
        toasts.send(ToastEvent::new(err.message()));
    }
}

// ═══════════════════════════════════════════════════════════════════════
// ROLLOVER & SPRITES
// ═══════════════════════════════════════════════════════════════════════

fn on_day_rollover(mut rollovers: EventReader<DayRolloverEvent>, mut farm: ResMut<FarmState>) {
    for event in rollovers.read() {
        let before: u32 = farm.crops.values().map(|c| c.stage as u32).sum();
        advance_crops(&mut farm);
        let after: u32 = farm.crops.values().map(|c| c.stage as u32).sum();
        info!(
            "[Farming] Day {}: {} crops grew {} stages",
            event.day,
            farm.crops.len(),
            after - before
        );
    }
}

/// Tile a crop sprite entity belongs to.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropSprite(pub (i32, i32));

/// Keep one drawable entity per planted tile, spawning and despawning as
/// the crop map changes.
fn sync_crop_sprites(
    mut commands: Commands,
    farm: Res<FarmState>,
    sprites: Query<(Entity, &CropSprite)>,
) {
    if !farm.is_changed() {
        return;
    }
    let mut seen = std::collections::HashSet::new();
    for (entity, sprite) in &sprites {
        if farm.crops.contains_key(&sprite.0) {
            seen.insert(sprite.0);
        } else {
            commands.entity(entity).despawn();
        }
    }
    for &(x, y) in farm.crops.keys() {
        if seen.contains(&(x, y)) {
            continue;
        }
        commands.spawn((
            CropSprite((x, y)),
            Drawable::new(SpriteKind::Crop),
            LogicalPosition(Vec2::new(x as f32 + 0.5, y as f32 + 0.5)),
            ContextTag(MapContext::OpenWorld),
        ));
    }
}

pub struct FarmingPlugin;

impl Plugin for FarmingPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<FarmState>()
            .init_resource::<CropRegistry>()
            .init_resource::<SelectedTool>()
            .add_systems(
                Update,
                (select_tool, use_tool, on_day_rollover, sync_crop_sprites)
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

    fn registry() -> CropRegistry {
        let mut registry = CropRegistry::default();
        for def in crate::data::CROP_DEFS {
            registry.crops.insert(def.id.to_string(), def.clone());
        }
        registry
    }

    fn setup() -> (TileGrid, FarmState, PlayerState, Inventory, CropRegistry) {
        (
            TileGrid::new(20, 20),
            FarmState::default(),
            PlayerState::default(),
            Inventory::default(),
            registry(),
        )
    }

    #[test]
    fn plant_water_rollover_reaches_stage_one() {
        let (mut grid, mut farm, mut player, mut inv, reg) = setup();
        inv.add("carrot_seeds", 1);

        till_action(&mut grid, &mut player, 5, 5).unwrap();
        plant_action(&grid, &mut farm, &mut player, &mut inv, &reg, "carrot_seeds", 5, 5, 1)
            .unwrap();
        water_action(&grid, &mut farm, &mut player, 5, 5).unwrap();

        advance_crops(&mut farm);
        let crop = &farm.crops[&(5, 5)];
        assert_eq!(crop.stage, 1);
        assert!(!crop.watered, "morning starts dry");
        assert!(farm.watered_tiles.is_empty());
    }

    #[test]
    fn dry_crops_never_advance() {
        let (mut grid, mut farm, mut player, mut inv, reg) = setup();
        inv.add("wheat_seeds", 1);
        till_action(&mut grid, &mut player, 3, 3).unwrap();
        plant_action(&grid, &mut farm, &mut player, &mut inv, &reg, "wheat_seeds", 3, 3, 1)
            .unwrap();

        for _ in 0..10 {
            advance_crops(&mut farm);
        }
        assert_eq!(farm.crops[&(3, 3)].stage, 0);
    }

    #[test]
    fn growth_caps_at_max_stage() {
        let mut farm = FarmState::default();
        farm.crops.insert(
            (1, 1),
            Crop { kind: "carrot".into(), stage: MAX_CROP_STAGE, watered: true, planted_day: 1 },
        );
        advance_crops(&mut farm);
        assert_eq!(farm.crops[&(1, 1)].stage, MAX_CROP_STAGE);
    }

    #[test]
    fn occupied_tile_rejects_second_plant() {
        let (mut grid, mut farm, mut player, mut inv, reg) = setup();
        inv.add("carrot_seeds", 2);
        till_action(&mut grid, &mut player, 5, 5).unwrap();
        plant_action(&grid, &mut farm, &mut player, &mut inv, &reg, "carrot_seeds", 5, 5, 1)
            .unwrap();
        let err = plant_action(&grid, &mut farm, &mut player, &mut inv, &reg, "carrot_seeds", 5, 5, 1)
            .unwrap_err();
        assert_eq!(err, ActionError::TileOccupied);
        assert_eq!(inv.count("carrot_seeds"), 1, "refused plant keeps the seed");
    }

    #[test]
    fn planting_needs_farmland_and_seeds() {
        let (grid, mut farm, mut player, mut inv, reg) = setup();
        let err = plant_action(&grid, &mut farm, &mut player, &mut inv, &reg, "carrot_seeds", 2, 2, 1)
            .unwrap_err();
        assert_eq!(err, ActionError::NotFarmland);

        let mut grid = TileGrid::new(20, 20);
        grid.till(2, 2);
        let err = plant_action(&grid, &mut farm, &mut player, &mut inv, &reg, "carrot_seeds", 2, 2, 1)
            .unwrap_err();
        assert_eq!(err, ActionError::NoSeeds);
    }

    #[test]
    fn pre_watered_tile_counts_for_a_new_plant() {
        let (mut grid, mut farm, mut player, mut inv, reg) = setup();
        inv.add("tomato_seeds", 1);
        till_action(&mut grid, &mut player, 4, 4).unwrap();
        water_action(&grid, &mut farm, &mut player, 4, 4).unwrap();
        plant_action(&grid, &mut farm, &mut player, &mut inv, &reg, "tomato_seeds", 4, 4, 2)
            .unwrap();
        assert!(farm.crops[&(4, 4)].watered);
    }

    #[test]
    fn harvest_requires_ripeness_and_pays_out() {
        let (_, mut farm, mut player, mut inv, reg) = setup();
        farm.crops.insert(
            (7, 7),
            Crop { kind: "potato".into(), stage: 2, watered: false, planted_day: 1 },
        );
        let err =
            harvest_action(&mut farm, &mut player, &mut inv, &reg, 7, 7).unwrap_err();
        assert_eq!(err, ActionError::NotRipe);

        farm.crops.get_mut(&(7, 7)).unwrap().stage = MAX_CROP_STAGE;
        let gold_before = player.gold;
        let event = harvest_action(&mut farm, &mut player, &mut inv, &reg, 7, 7).unwrap();
        assert_eq!(event.gold, 50);
        assert_eq!(player.gold, gold_before + 50);
        assert_eq!(inv.count("potato"), 1);
        assert!(!farm.crops.contains_key(&(7, 7)), "tile is empty again");
    }

    #[test]
    fn harvestable_query_only_reports_ripe_crops() {
        let mut farm = FarmState::default();
        assert!(harvestable_crop_at(&farm, 5, 5).is_none());

        farm.crops.insert(
            (5, 5),
            Crop { kind: "carrot".into(), stage: 3, watered: false, planted_day: 1 },
        );
        assert!(harvestable_crop_at(&farm, 5, 5).is_none(), "still growing");

        farm.crops.get_mut(&(5, 5)).unwrap().stage = MAX_CROP_STAGE;
        let crop = harvestable_crop_at(&farm, 5, 5).expect("ripe crop found");
        assert_eq!(crop.kind, "carrot");
    }

    #[test]
    fn exhausted_player_cannot_use_tools() {
        let (mut grid, mut farm, mut player, _, _) = setup();
        player.energy = 0.0;
        assert_eq!(till_action(&mut grid, &mut player, 1, 1).unwrap_err(), ActionError::Exhausted);
        assert_eq!(
            water_action(&grid, &mut farm, &mut player, 1, 1).unwrap_err(),
            ActionError::Exhausted
        );
    }

    #[test]
    fn tilling_water_is_refused() {
        let (mut grid, _, mut player, _, _) = setup();
        grid.set_tile(2, 2, TileCode::Water);
        assert_eq!(
            till_action(&mut grid, &mut player, 2, 2).unwrap_err(),
            ActionError::NotTillable
        );
    }
}
