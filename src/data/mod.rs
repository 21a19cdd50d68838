//! Static game data: crop definitions, NPC seeds, buildings, markers, and
//! the geographic projection that anchors them to the tile grid.
//!
//! Everything in here is regenerated at boot and never saved.

use bevy::prelude::*;

use crate::shared::*;

// ═══════════════════════════════════════════════════════════════════════
// GEO PROJECTION
// ═══════════════════════════════════════════════════════════════════════

/// Reference longitude/latitude anchoring the town to the grid centre.
pub const GEO_ORIGIN: (f64, f64) = (11.5755, 48.1374);
/// Tiles per degree at the anchor. Latitude runs south-positive so that
/// larger world Y is "toward the viewer" for the painter's sort.
pub const GEO_SCALE: f64 = 9000.0;

/// Project geographic-style coordinates into world tile space.
pub fn project_geo(lon: f64, lat: f64) -> Vec2 {
    let x = (lon - GEO_ORIGIN.0) * GEO_SCALE + (GRID_SIZE as f64 / 2.0);
    let y = (GEO_ORIGIN.1 - lat) * GEO_SCALE + (GRID_SIZE as f64 / 2.0);
    Vec2::new(x as f32, y as f32)
}

// ═══════════════════════════════════════════════════════════════════════
// CROPS
// ═══════════════════════════════════════════════════════════════════════

pub const CROP_DEFS: &[CropDef] = &[
    CropDef { id: "carrot", name: "Carrot", seed_id: "carrot_seeds", seed_price: 10, sell_price: 35 },
    CropDef { id: "potato", name: "Potato", seed_id: "potato_seeds", seed_price: 15, sell_price: 50 },
    CropDef { id: "tomato", name: "Tomato", seed_id: "tomato_seeds", seed_price: 20, sell_price: 60 },
    CropDef { id: "wheat", name: "Wheat", seed_id: "wheat_seeds", seed_price: 8, sell_price: 25 },
];

// ═══════════════════════════════════════════════════════════════════════
// NPCS
// ═══════════════════════════════════════════════════════════════════════

pub struct NpcSeed {
    pub id: &'static str,
    pub name: &'static str,
    pub role: NpcRole,
    /// Home tile, also the wander anchor.
    pub home: (f32, f32),
    pub dialogue: &'static [&'static str],
    pub follow_distance: f32,
}

pub const NPC_SEEDS: &[NpcSeed] = &[
    NpcSeed {
        id: "greta",
        name: "Greta",
        role: NpcRole::Shopkeeper,
        home: (242.0, 247.0),
        dialogue: &["Fresh seeds, just in!", "The carrots sell well this year."],
        follow_distance: 2.0,
    },
    NpcSeed {
        id: "dr_voss",
        name: "Dr. Voss",
        role: NpcRole::Doctor,
        home: (260.0, 244.0),
        dialogue: &["Eat your vegetables.", "The clinic is always open."],
        follow_distance: 2.0,
    },
    NpcSeed {
        id: "mayor_brandt",
        name: "Mayor Brandt",
        role: NpcRole::Mayor,
        home: (251.0, 238.0),
        dialogue: &["Welcome to Elmsworth!", "The park could use more trees."],
        follow_distance: 3.0,
    },
    NpcSeed {
        id: "old_henrik",
        name: "Old Henrik",
        role: NpcRole::Villager,
        home: (236.0, 256.0),
        dialogue: &["My knees ache when it rains.", "Back in my day..."],
        follow_distance: 2.0,
    },
    NpcSeed {
        id: "lina",
        name: "Lina",
        role: NpcRole::Villager,
        home: (256.0, 258.0),
        dialogue: &["Have you seen the ducks by the pond?", "I love the fall colors."],
        follow_distance: 2.0,
    },
];

// ═══════════════════════════════════════════════════════════════════════
// BUILDINGS & MARKERS
// ═══════════════════════════════════════════════════════════════════════

pub struct BuildingSeed {
    pub name: &'static str,
    /// Footprint rect in tiles: (x, y, w, h). Stamped as `TileCode::Building`.
    pub footprint: (i32, i32, i32, i32),
    /// Interior floor size in tiles, if the player can enter.
    pub interior: Option<(i32, i32)>,
}

pub const BUILDING_SEEDS: &[BuildingSeed] = &[
    BuildingSeed { name: "General Store", footprint: (240, 244, 4, 3), interior: Some((8, 6)) },
    BuildingSeed { name: "Clinic", footprint: (258, 242, 4, 3), interior: Some((7, 5)) },
    BuildingSeed { name: "Town Hall", footprint: (249, 235, 5, 4), interior: Some((10, 7)) },
    BuildingSeed { name: "Farmhouse", footprint: (233, 252, 4, 3), interior: Some((8, 6)) },
    BuildingSeed { name: "Warehouse", footprint: (263, 256, 6, 4), interior: None },
];

pub struct MarkerSeed {
    pub name: &'static str,
    /// Geographic-style anchor, projected via `project_geo` at init.
    pub geo: (f64, f64),
    /// Index into `BUILDING_SEEDS`.
    pub building: Option<usize>,
    pub healer: bool,
    /// (job id, title, pay, energy cost) offered at this marker.
    pub job: Option<(&'static str, &'static str, u32, f32)>,
}

pub const MARKER_SEEDS: &[MarkerSeed] = &[
    MarkerSeed {
        name: "General Store",
        geo: (11.5744, 48.1380),
        building: Some(0),
        healer: false,
        job: Some(("clerk", "Store Clerk", 40, 10.0)),
    },
    MarkerSeed {
        name: "Clinic",
        geo: (11.5764, 48.1382),
        building: Some(1),
        healer: true,
        job: None,
    },
    MarkerSeed {
        name: "Town Hall",
        geo: (11.5754, 48.1390),
        building: Some(2),
        healer: false,
        job: Some(("filing", "Records Clerk", 55, 14.0)),
    },
    MarkerSeed {
        name: "Farmhouse",
        geo: (11.5736, 48.1371),
        building: Some(3),
        healer: false,
        job: None,
    },
    MarkerSeed {
        name: "Old Fountain",
        geo: (11.5752, 48.1377),
        building: None,
        healer: false,
        job: None,
    },
];

// ═══════════════════════════════════════════════════════════════════════
// TERRAIN FEATURES
// ═══════════════════════════════════════════════════════════════════════

/// Hand-placed water rects (x, y, w, h): the pond and the canal. Stamped
/// before the stochastic scatter so scatter and buildings skip them.
pub const WATER_FEATURES: &[(i32, i32, i32, i32)] = &[
    (270, 260, 14, 10),
    (100, 0, 6, 500),
];

/// Park scatter zones: (rect, tree probability per tile).
pub const PARK_ZONES: &[((i32, i32, i32, i32), f64)] = &[
    ((200, 200, 40, 30), 0.06),
    ((300, 320, 60, 50), 0.10),
    ((120, 380, 80, 60), 0.04),
];

/// Street lights along the two main streets, every 8 tiles.
pub const STREET_LIGHT_RUNS: &[((i32, i32), (i32, i32), i32)] = &[
    ((230, 250), (270, 250), 8),
    ((250, 230), (250, 270), 8),
];

/// Where the farm animals live.
pub const FARM_ANIMAL_SEEDS: &[(FarmAnimalKind, &str, (f32, f32))] = &[
    (FarmAnimalKind::Chicken, "Pecky", (230.0, 255.0)),
    (FarmAnimalKind::Chicken, "Noodle", (231.5, 256.0)),
    (FarmAnimalKind::Cow, "Marla", (228.0, 258.0)),
    (FarmAnimalKind::Sheep, "Wooly", (226.0, 255.0)),
];

pub const AMBIENT_ANIMAL_SEEDS: &[(AnimalKind, (f32, f32), f32)] = &[
    (AnimalKind::Bird, (210.0, 210.0), 10.0),
    (AnimalKind::Bird, (310.0, 330.0), 12.0),
    (AnimalKind::Cat, (245.0, 249.0), 5.0),
    (AnimalKind::Dog, (252.0, 252.0), 6.0),
];

/// Non-crop goods sold at the general store: (item id, price).
pub const STORE_GOODS: &[(&str, u32)] = &[
    ("animal_feed", 5),
    ("coffee", 12),
    ("bouquet", 100),
];

// ═══════════════════════════════════════════════════════════════════════
// PLUGIN
// ═══════════════════════════════════════════════════════════════════════

pub struct DataPlugin;

impl Plugin for DataPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, load_registries);
    }
}

/// Populate the registries from the static tables, then leave Loading.
fn load_registries(
    mut crop_registry: ResMut<CropRegistry>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    for def in CROP_DEFS {
        crop_registry.crops.insert(def.id.to_string(), def.clone());
    }
    info!("[Data] Loaded {} crop definitions", crop_registry.crops.len());
    next_state.set(GameState::Playing);
}
