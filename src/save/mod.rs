//! Selective JSON persistence.
//!
//! Only durable progress is written: player, inventory, clock,
//! relationships, quests, crops, and the watered-tile set. Terrain, NPC
//! positions, animals, and anything regenerated at boot stay out of the
//! file. Writes are atomic (temp file + rename) and a failed or malformed
//! load leaves the default state in place instead of crashing.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::shared::*;

#[cfg(not(target_arch = "wasm32"))]
use std::fs;
#[cfg(not(target_arch = "wasm32"))]
use std::path::PathBuf;

const SAVE_DIR: &str = "saves";
const SAVE_FILE: &str = "elmsworth.json";
/// Autosave cadence in real seconds.
const AUTOSAVE_SECS: f32 = 120.0;

// ═══════════════════════════════════════════════════════════════════════
// FILE SCHEMA
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSave {
    pub x: f32,
    pub y: f32,
    pub energy: f32,
    pub gold: u32,
    pub job: Option<Job>,
    #[serde(rename = "inCar")]
    pub in_car: bool,
    pub spouse: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSave {
    pub hour: u8,
    pub minute: u8,
    pub day: u32,
    pub season: Season,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CropSave {
    pub x: i32,
    pub y: i32,
    pub kind: ItemId,
    pub stage: u8,
    pub watered: bool,
    #[serde(rename = "plantedDay")]
    pub planted_day: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveFile {
    pub player: PlayerSave,
    pub inventory: Inventory,
    pub time: TimeSave,
    pub relationships: Relationships,
    pub quests: Vec<String>,
    #[serde(rename = "completedQuests")]
    pub completed_quests: Vec<String>,
    pub crops: Vec<CropSave>,
    /// Watered tiles as "x,y" strings.
    #[serde(rename = "wateredTiles")]
    pub watered_tiles: Vec<String>,
}

// ═══════════════════════════════════════════════════════════════════════
// COLLECT / APPLY
// ═══════════════════════════════════════════════════════════════════════

pub fn collect_save(
    player: &PlayerState,
    inventory: &Inventory,
    clock: &GameClock,
    relationships: &Relationships,
    quests: &QuestLog,
    farm: &FarmState,
) -> SaveFile {
    let mut crops: Vec<CropSave> = farm
        .crops
        .iter()
        .map(|(&(x, y), crop)| CropSave {
            x,
            y,
            kind: crop.kind.clone(),
            stage: crop.stage,
            watered: crop.watered,
            planted_day: crop.planted_day,
        })
        .collect();
    crops.sort_by_key(|c| (c.y, c.x));

    let mut watered: Vec<String> = farm
        .watered_tiles
        .iter()
        .map(|(x, y)| format!("{x},{y}"))
        .collect();
    watered.sort();

    SaveFile {
        player: PlayerSave {
            x: player.x,
            y: player.y,
            energy: player.energy,
            gold: player.gold,
            job: player.job.clone(),
            in_car: player.in_car,
            spouse: player.spouse.clone(),
        },
        inventory: inventory.clone(),
        time: TimeSave {
            hour: clock.hour,
            minute: clock.minute,
            day: clock.day,
            season: clock.season,
        },
        relationships: relationships.clone(),
        quests: quests.active.clone(),
        completed_quests: quests.completed.clone(),
        crops,
        watered_tiles: watered,
    }
}

fn parse_tile_key(key: &str) -> Option<(i32, i32)> {
    let (x, y) = key.split_once(',')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}

pub fn apply_save(
    file: SaveFile,
    player: &mut PlayerState,
    inventory: &mut Inventory,
    clock: &mut GameClock,
    relationships: &mut Relationships,
    quests: &mut QuestLog,
    farm: &mut FarmState,
) {
    player.x = file.player.x;
    player.y = file.player.y;
    player.energy = file.player.energy.clamp(0.0, MAX_ENERGY);
    player.gold = file.player.gold;
    player.job = file.player.job;
    player.in_car = file.player.in_car;
    player.spouse = file.player.spouse;
    // Saves always reopen outdoors.
    player.context = MapContext::OpenWorld;

    *inventory = file.inventory;

    clock.hour = file.time.hour.min(23);
    clock.minute = file.time.minute.min(59);
    clock.day = file.time.day.max(1);
    clock.season = file.time.season;
    clock.elapsed_real_seconds = 0.0;

    *relationships = file.relationships;
    relationships.gifted_today.clear();

    quests.active = file.quests;
    quests.completed = file.completed_quests;

    farm.crops.clear();
    for crop in file.crops {
        farm.crops.insert(
            (crop.x, crop.y),
            Crop {
                kind: crop.kind,
                stage: crop.stage.min(MAX_CROP_STAGE),
                watered: crop.watered,
                planted_day: crop.planted_day,
            },
        );
    }
    farm.watered_tiles = file
        .watered_tiles
        .iter()
        .filter_map(|key| parse_tile_key(key))
        .collect();
}

// ═══════════════════════════════════════════════════════════════════════
// DISK I/O
// ═══════════════════════════════════════════════════════════════════════

#[cfg(not(target_arch = "wasm32"))]
fn save_path() -> PathBuf {
    PathBuf::from(SAVE_DIR).join(SAVE_FILE)
}

#[cfg(not(target_arch = "wasm32"))]
pub fn write_slot(file: &SaveFile) -> Result<(), String> {
    let json = serde_json::to_string_pretty(file)
        .map_err(|e| format!("serialize failed: {e}"))?;
    fs::create_dir_all(SAVE_DIR).map_err(|e| format!("create {SAVE_DIR}/ failed: {e}"))?;
    let path = save_path();
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(|e| format!("write {} failed: {e}", tmp.display()))?;
    fs::rename(&tmp, &path).map_err(|e| format!("rename to {} failed: {e}", path.display()))?;
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
pub fn read_slot() -> Result<SaveFile, String> {
    let path = save_path();
    let json = fs::read_to_string(&path)
        .map_err(|e| format!("read {} failed: {e}", path.display()))?;
    serde_json::from_str(&json).map_err(|e| format!("parse {} failed: {e}", path.display()))
}

#[cfg(target_arch = "wasm32")]
pub fn write_slot(_file: &SaveFile) -> Result<(), String> {
    Err("saving is not available on this platform".to_string())
}

#[cfg(target_arch = "wasm32")]
pub fn read_slot() -> Result<SaveFile, String> {
    Err("loading is not available on this platform".to_string())
}

// ═══════════════════════════════════════════════════════════════════════
// SYSTEMS
// ═══════════════════════════════════════════════════════════════════════

#[derive(Event, Debug, Default)]
pub struct SaveRequestEvent;

#[derive(Event, Debug, Default)]
pub struct LoadRequestEvent;

#[derive(Resource)]
struct AutosaveTimer(Timer);

impl Default for AutosaveTimer {
    fn default() -> Self {
        Self(Timer::from_seconds(AUTOSAVE_SECS, TimerMode::Repeating))
    }
}

fn save_hotkeys(
    keys: Res<ButtonInput<KeyCode>>,
    mut saves: EventWriter<SaveRequestEvent>,
    mut loads: EventWriter<LoadRequestEvent>,
) {
    if keys.just_pressed(KeyCode::F5) {
        saves.send_default();
    }
    if keys.just_pressed(KeyCode::F9) {
        loads.send_default();
    }
}

fn autosave(
    time: Res<Time>,
    mut timer: ResMut<AutosaveTimer>,
    mut saves: EventWriter<SaveRequestEvent>,
) {
    if timer.0.tick(time.delta()).just_finished() {
        saves.send_default();
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_save(
    mut requests: EventReader<SaveRequestEvent>,
    player: Res<PlayerState>,
    inventory: Res<Inventory>,
    clock: Res<GameClock>,
    relationships: Res<Relationships>,
    quests: Res<QuestLog>,
    farm: Res<FarmState>,
    mut toasts: EventWriter<ToastEvent>,
) {
    if requests.read().next().is_none() {
        return;
    }
    let file = collect_save(&player, &inventory, &clock, &relationships, &quests, &farm);
    match write_slot(&file) {
        Ok(()) => {
            info!("[Save] Saved day {} ({} crops)", file.time.day, file.crops.len());
            toasts.send(ToastEvent::new("Game saved."));
        }
        Err(err) => {
            warn!("[Save] {err}");
            toasts.send(ToastEvent::new("Save failed."));
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_load(
    mut requests: EventReader<LoadRequestEvent>,
    mut player: ResMut<PlayerState>,
    mut inventory: ResMut<Inventory>,
    mut clock: ResMut<GameClock>,
    mut relationships: ResMut<Relationships>,
    mut quests: ResMut<QuestLog>,
    mut farm: ResMut<FarmState>,
    mut toasts: EventWriter<ToastEvent>,
) {
    if requests.read().next().is_none() {
        return;
    }
    match read_slot() {
        Ok(file) => {
            apply_save(
                file,
                &mut player,
                &mut inventory,
                &mut clock,
                &mut relationships,
                &mut quests,
                &mut farm,
            );
            info!("[Save] Loaded day {}", clock.day);
            toasts.send(ToastEvent::new("Game loaded."));
        }
        Err(err) => {
            // Defaults stay in place; a missing file on first boot is normal.
            warn!("[Save] {err}");
            toasts.send(ToastEvent::new("No save to load."));
        }
    }
}

pub struct SavePlugin;

impl Plugin for SavePlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<SaveRequestEvent>()
            .add_event::<LoadRequestEvent>()
            .init_resource::<AutosaveTimer>()
            .add_systems(
                Update,
                (save_hotkeys, autosave, handle_save, handle_load)
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

    fn sample_state() -> (PlayerState, Inventory, GameClock, Relationships, QuestLog, FarmState)
    {
        let mut player = PlayerState::default();
        player.x = 210.5;
        player.y = 260.25;
        player.energy = 37.5;
        player.gold = 842;
        player.in_car = true;

        let mut inventory = Inventory::default();
        inventory.add("carrot_seeds", 3);
        inventory.add("egg", 7);

        let mut clock = GameClock::default();
        clock.hour = 14;
        clock.minute = 30;
        clock.day = 31;
        clock.season = Season::Summer;

        let mut relationships = Relationships::default();
        relationships.add_friendship("greta", 240);
        relationships.gifted_today.insert("greta".to_string());

        let quests = QuestLog {
            active: vec!["make_a_friend".into()],
            completed: vec!["first_harvest".into()],
        };

        let mut farm = FarmState::default();
        farm.crops.insert(
            (12, 40),
            Crop { kind: "carrot".into(), stage: 2, watered: true, planted_day: 29 },
        );
        farm.crops.insert(
            (13, 40),
            Crop { kind: "wheat".into(), stage: 0, watered: false, planted_day: 31 },
        );
        farm.watered_tiles.insert((12, 40));
        farm.watered_tiles.insert((99, 7));

        (player, inventory, clock, relationships, quests, farm)
    }

    #[test]
    fn round_trip_through_json_preserves_progress() {
        let (player, inventory, clock, relationships, quests, farm) = sample_state();
        let file = collect_save(&player, &inventory, &clock, &relationships, &quests, &farm);
        let json = serde_json::to_string(&file).unwrap();
        let parsed: SaveFile = serde_json::from_str(&json).unwrap();

        let mut player2 = PlayerState::default();
        let mut inv2 = Inventory::default();
        let mut clock2 = GameClock::default();
        let mut rel2 = Relationships::default();
        let mut quests2 = QuestLog::default();
        let mut farm2 = FarmState::default();
        apply_save(parsed, &mut player2, &mut inv2, &mut clock2, &mut rel2, &mut quests2, &mut farm2);

        assert_eq!(player2.gold, 842);
        assert!((player2.energy - 37.5).abs() < f32::EPSILON);
        assert!(player2.in_car);
        assert_eq!(player2.context, MapContext::OpenWorld);
        assert_eq!(inv2.count("carrot_seeds"), 3);
        assert_eq!(inv2.count("egg"), 7);
        assert_eq!((clock2.hour, clock2.minute, clock2.day), (14, 30, 31));
        assert_eq!(clock2.season, Season::Summer);
        assert_eq!(rel2.friendship["greta"], 240);
        assert!(rel2.gifted_today.is_empty(), "daily gift set resets on load");
        assert_eq!(quests2.active, vec!["make_a_friend".to_string()]);
        assert_eq!(quests2.completed, vec!["first_harvest".to_string()]);
        assert_eq!(farm2.crops[&(12, 40)].stage, 2);
        assert!(farm2.crops[&(12, 40)].watered);
        assert_eq!(farm2.crops[&(13, 40)].stage, 0);
        assert!(farm2.watered_tiles.contains(&(12, 40)));
        assert!(farm2.watered_tiles.contains(&(99, 7)));
    }

    #[test]
    fn watered_tiles_serialize_as_xy_strings() {
        let (player, inventory, clock, relationships, quests, farm) = sample_state();
        let file = collect_save(&player, &inventory, &clock, &relationships, &quests, &farm);
        assert_eq!(file.watered_tiles, vec!["12,40".to_string(), "99,7".to_string()]);

        let json = serde_json::to_string(&file).unwrap();
        assert!(json.contains("\"wateredTiles\""));
        assert!(json.contains("\"completedQuests\""));
    }

    #[test]
    fn malformed_tile_keys_are_skipped() {
        assert_eq!(parse_tile_key("12,40"), Some((12, 40)));
        assert_eq!(parse_tile_key(" -3 , 7 "), Some((-3, 7)));
        assert_eq!(parse_tile_key("nonsense"), None);
        assert_eq!(parse_tile_key("1,2,3"), None);
        assert_eq!(parse_tile_key(""), None);
    }

    #[test]
    fn malformed_json_is_an_error_not_a_panic() {
        let err = serde_json::from_str::<SaveFile>("{\"player\": 12}");
        assert!(err.is_err());
    }

    #[test]
    fn apply_clamps_out_of_range_values() {
        let (player, inventory, clock, relationships, quests, farm) = sample_state();
        let mut file = collect_save(&player, &inventory, &clock, &relationships, &quests, &farm);
        file.player.energy = 9000.0;
        file.time.hour = 99;
        file.time.day = 0;
        file.crops[0].stage = 200;

        let mut player2 = PlayerState::default();
        let mut inv2 = Inventory::default();
        let mut clock2 = GameClock::default();
        let mut rel2 = Relationships::default();
        let mut quests2 = QuestLog::default();
        let mut farm2 = FarmState::default();
        apply_save(file, &mut player2, &mut inv2, &mut clock2, &mut rel2, &mut quests2, &mut farm2);

        assert_eq!(player2.energy, MAX_ENERGY);
        assert_eq!(clock2.hour, 23);
        assert_eq!(clock2.day, 1);
        assert!(farm2.crops.values().all(|c| c.stage <= MAX_CROP_STAGE));
    }
}
