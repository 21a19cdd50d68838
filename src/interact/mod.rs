//! Player interaction: talking, gifts, shopping, jobs, and walking in and
//! out of buildings. Also the small quest ledger fed by harvest events.

use bevy::prelude::*;

use crate::data::STORE_GOODS;
use crate::shared::*;
use crate::spatial::nearest_within;
use crate::world::WorldLayout;

/// How close the player must stand to talk, gift, or use a marker.
const INTERACT_RANGE: f32 = 2.0;
const GIFT_FRIENDSHIP: i32 = 30;

// ═══════════════════════════════════════════════════════════════════════
// PURE RULES
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractError {
    NobodyNearby,
    AlreadyGifted,
    NoGiftToGive,
    CannotAfford,
    NotForSale,
    NoJobHere,
    Exhausted,
}

impl InteractError {
    pub fn message(&self) -> &'static str {
        match self {
            InteractError::NobodyNearby => "Nobody nearby.",
            InteractError::AlreadyGifted => "You already gave them something today.",
            InteractError::NoGiftToGive => "You have nothing to give.",
            InteractError::CannotAfford => "Not enough gold.",
            InteractError::NotForSale => "That's not for sale.",
            InteractError::NoJobHere => "No work offered here.",
            InteractError::Exhausted => "Too tired to work.",
        }
    }
}

/// What an interaction prompt would act on.
#[derive(Debug)]
pub enum Interactable<'a> {
    Npc(&'a Npc),
    Marker(&'a PoiMarker),
}

/// Closest NPC or marker within reach of `point`, whichever is nearer.
/// UI panels ask this before building a prompt; equidistant hits go to the
/// NPC.
pub fn nearest_interactable<'a>(
    npcs: impl IntoIterator<Item = (&'a Npc, Vec2)>,
    markers: impl IntoIterator<Item = (&'a PoiMarker, Vec2)>,
    point: Vec2,
) -> Option<Interactable<'a>> {
    let npc_hit = nearest_within(npcs, point, INTERACT_RANGE);
    let marker_hit = nearest_within(markers, point, INTERACT_RANGE);
    match (npc_hit, marker_hit) {
        (Some((npc, nd)), Some((_, md))) if nd <= md => Some(Interactable::Npc(npc)),
        (Some((npc, _)), None) => Some(Interactable::Npc(npc)),
        (_, Some((marker, _))) => Some(Interactable::Marker(marker)),
        (None, None) => None,
    }
}

/// The job on offer within reach of `point`, if any marker carries one.
pub fn job_at<'a>(
    markers: impl IntoIterator<Item = (&'a PoiMarker, Vec2)>,
    point: Vec2,
) -> Option<&'a Job> {
    nearest_within(
        markers
            .into_iter()
            .filter_map(|(m, pos)| m.job.as_ref().map(|j| (j, pos))),
        point,
        INTERACT_RANGE,
    )
    .map(|(job, _)| job)
}

/// One gift per NPC per day; the daily set clears at rollover.
pub fn give_gift(
    relationships: &mut Relationships,
    inventory: &mut Inventory,
    npc_id: &str,
    item_id: &str,
) -> Result<GiftGivenEvent, InteractError> {
    if relationships.gifted_today.contains(npc_id) {
        return Err(InteractError::AlreadyGifted);
    }
    if inventory.try_remove(item_id, 1) == 0 {
        return Err(InteractError::NoGiftToGive);
    }
    relationships.gifted_today.insert(npc_id.to_string());
    relationships.add_friendship(npc_id, GIFT_FRIENDSHIP);
    Ok(GiftGivenEvent { npc_id: npc_id.to_string(), item_id: item_id.to_string() })
}

/// Price lookup across seeds and the store's flat goods table.
pub fn store_price(registry: &CropRegistry, item_id: &str) -> Option<u32> {
    if let Some(def) = registry.by_seed(item_id) {
        return Some(def.seed_price);
    }
    STORE_GOODS
        .iter()
        .find(|(id, _)| *id == item_id)
        .map(|(_, price)| *price)
}

pub fn buy_item(
    player: &mut PlayerState,
    inventory: &mut Inventory,
    registry: &CropRegistry,
    item_id: &str,
) -> Result<u32, InteractError> {
    let price = store_price(registry, item_id).ok_or(InteractError::NotForSale)?;
    if player.gold < price {
        return Err(InteractError::CannotAfford);
    }
    player.gold -= price;
    inventory.add(item_id, 1);
    Ok(price)
}

/// Work one shift of the marker's job: gold in, energy out. Taking the job
/// also records it on the player.
pub fn work_shift(player: &mut PlayerState, job: &Job) -> Result<u32, InteractError> {
    if player.energy < job.energy_cost {
        return Err(InteractError::Exhausted);
    }
    player.spend_energy(job.energy_cost);
    player.gold += job.pay;
    player.job = Some(job.clone());
    Ok(job.pay)
}

// ═══════════════════════════════════════════════════════════════════════
// SYSTEMS
// ═══════════════════════════════════════════════════════════════════════

/// Where the player stood before entering a building, restored on exit.
#[derive(Resource, Debug, Default)]
pub struct ReturnPoint(pub Option<Vec2>);

/// E talks to the nearest NPC, or enters/exits a building at a marker.
fn interact(
    keys: Res<ButtonInput<KeyCode>>,
    clock: Res<GameClock>,
    layout: Res<WorldLayout>,
    mut player: ResMut<PlayerState>,
    mut return_point: ResMut<ReturnPoint>,
    npcs: Query<(&Npc, &LogicalPosition)>,
    markers: Query<(&PoiMarker, &LogicalPosition)>,
    mut toasts: EventWriter<ToastEvent>,
) {
    if !keys.just_pressed(KeyCode::KeyE) {
        return;
    }

    // Inside, E always walks back out the door.
    if let MapContext::Interior(idx) = player.context {
        let out = return_point.0.take().or_else(|| {
            layout.buildings.get(idx).map(|b| b.door() + Vec2::new(0.0, 0.5))
        });
        if let Some(pos) = out {
            player.x = pos.x;
            player.y = pos.y;
        }
        player.context = MapContext::OpenWorld;
        return;
    }

    let here = player.position();
    match nearest_interactable(
        npcs.iter().map(|(npc, pos)| (npc, pos.0)),
        markers.iter().map(|(marker, pos)| (marker, pos.0)),
        here,
    ) {
        Some(Interactable::Npc(npc)) => talk(npc, &clock, &mut toasts),
        Some(Interactable::Marker(marker)) => {
            enter_marker(marker, &layout, &mut player, &mut return_point, &mut toasts)
        }
        None => {
            toasts.send(ToastEvent::new(InteractError::NobodyNearby.message()));
        }
    }
}

fn talk(npc: &Npc, clock: &GameClock, toasts: &mut EventWriter<ToastEvent>) {
    if npc.dialogue.is_empty() {
        toasts.send(ToastEvent::new(format!("{} nods at you.", npc.name)));
        return;
    }
    let line = &npc.dialogue[clock.day as usize % npc.dialogue.len()];
    toasts.send(ToastEvent::new(format!("{}: {}", npc.name, line)));
}

fn enter_marker(
    marker: &PoiMarker,
    layout: &WorldLayout,
    player: &mut PlayerState,
    return_point: &mut ReturnPoint,
    toasts: &mut EventWriter<ToastEvent>,
) {
    let Some(idx) = marker.building else {
        toasts.send(ToastEvent::new(marker.name.clone()));
        return;
    };
    let Some((w, h)) = layout.buildings.get(idx).and_then(|b| b.interior) else {
        toasts.send(ToastEvent::new(format!("{} is locked.", marker.name)));
        return;
    };
    return_point.0 = Some(player.position());
    player.context = MapContext::Interior(idx);
    player.x = w as f32 / 2.0;
    player.y = h as f32 - 1.0; // just inside the door
    player.in_car = false;
    info!("[Interact] Entered {}", marker.name);
}

/// G gives a bouquet (or, failing that, a harvested crop) to the nearest
/// NPC.
fn gift(
    keys: Res<ButtonInput<KeyCode>>,
    registry: Res<CropRegistry>,
    mut relationships: ResMut<Relationships>,
    mut inventory: ResMut<Inventory>,
    npcs: Query<(&Npc, &LogicalPosition)>,
    player: Res<PlayerState>,
    mut gifts: EventWriter<GiftGivenEvent>,
    mut toasts: EventWriter<ToastEvent>,
) {
    if !keys.just_pressed(KeyCode::KeyG) {
        return;
    }
    let Some((npc, _)) = nearest_within(
        npcs.iter().map(|(npc, pos)| (npc.id.clone(), pos.0)),
        player.position(),
        INTERACT_RANGE,
    ) else {
        toasts.send(ToastEvent::new(InteractError::NobodyNearby.message()));
        return;
    };

    let gift_item = if inventory.has("bouquet", 1) {
        Some("bouquet".to_string())
    } else {
        let mut crops: Vec<&str> = registry
            .crops
            .keys()
            .filter(|id| inventory.has(id.as_str(), 1))
            .map(|id| id.as_str())
            .collect();
        crops.sort_unstable();
        crops.first().map(|s| s.to_string())
    };
    let Some(item_id) = gift_item else {
        toasts.send(ToastEvent::new(InteractError::NoGiftToGive.message()));
        return;
    };

    match give_gift(&mut relationships, &mut inventory, &npc, &item_id) {
        Ok(event) => {
            let hearts = relationships.hearts(&event.npc_id);
            toasts.send(ToastEvent::new(format!("Gift given! ({hearts} hearts)")));
            gifts.send(event);
        }
        Err(err) => {
            toasts.send(ToastEvent::new(err.message()));
        }
    }
}

/// B buys at the store: the cheapest seed the player can afford, falling
/// back to animal feed.
fn buy(
    keys: Res<ButtonInput<KeyCode>>,
    registry: Res<CropRegistry>,
    markers: Query<(&PoiMarker, &LogicalPosition)>,
    mut player: ResMut<PlayerState>,
    mut inventory: ResMut<Inventory>,
    mut toasts: EventWriter<ToastEvent>,
) {
    if !keys.just_pressed(KeyCode::KeyB) {
        return;
    }
    let at_store = nearest_within(
        markers
            .iter()
            .filter(|(m, _)| m.name == "General Store")
            .map(|(_, pos)| ((), pos.0)),
        player.position(),
        INTERACT_RANGE,
    )
    .is_some()
        || matches!(player.context, MapContext::Interior(0));
    if !at_store {
        toasts.send(ToastEvent::new("No shop here."));
        return;
    }

    let mut seeds: Vec<&CropDef> = registry.crops.values().collect();
    seeds.sort_by_key(|def| def.seed_price);
    let pick = seeds
        .iter()
        .find(|def| player.gold >= def.seed_price)
        .map(|def| def.seed_id)
        .unwrap_or("animal_feed");

    match buy_item(&mut player, &mut inventory, &registry, pick) {
        Ok(price) => {
            toasts.send(ToastEvent::new(format!("Bought {pick} for {price}g.")));
        }
        Err(err) => {
            toasts.send(ToastEvent::new(err.message()));
        }
    }
}

/// J works a shift at the nearest job marker.
fn work(
    keys: Res<ButtonInput<KeyCode>>,
    markers: Query<(&PoiMarker, &LogicalPosition)>,
    mut player: ResMut<PlayerState>,
    mut toasts: EventWriter<ToastEvent>,
) {
    if !keys.just_pressed(KeyCode::KeyJ) {
        return;
    }
    let job = job_at(
        markers.iter().map(|(m, pos)| (m, pos.0)),
        player.position(),
    )
    .cloned();
    let Some(job) = job else {
        toasts.send(ToastEvent::new(InteractError::NoJobHere.message()));
        return;
    };
    match work_shift(&mut player, &job) {
        Ok(pay) => {
            info!("[Interact] Worked a shift as {} (+{pay} gold)", job.title);
            toasts.send(ToastEvent::new(format!("Shift done: +{pay}g")));
        }
        Err(err) => {
            toasts.send(ToastEvent::new(err.message()));
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// QUESTS & ROLLOVER
// ═══════════════════════════════════════════════════════════════════════

fn seed_quests(mut quests: ResMut<QuestLog>) {
    if quests.active.is_empty() && quests.completed.is_empty() {
        quests.active.push("first_harvest".to_string());
        quests.active.push("make_a_friend".to_string());
    }
}

fn complete_quest(quests: &mut QuestLog, id: &str) -> bool {
    let Some(pos) = quests.active.iter().position(|q| q == id) else {
        return false;
    };
    quests.active.remove(pos);
    quests.completed.push(id.to_string());
    true
}

fn track_quests(
    mut harvests: EventReader<CropHarvestedEvent>,
    mut gifts: EventReader<GiftGivenEvent>,
    relationships: Res<Relationships>,
    mut quests: ResMut<QuestLog>,
    mut toasts: EventWriter<ToastEvent>,
) {
    if harvests.read().next().is_some() && complete_quest(&mut quests, "first_harvest") {
        toasts.send(ToastEvent::new("Quest complete: First Harvest"));
    }
    for event in gifts.read() {
        if relationships.hearts(&event.npc_id) >= 1
            && complete_quest(&mut quests, "make_a_friend")
        {
            toasts.send(ToastEvent::new("Quest complete: Make a Friend"));
        }
    }
}

fn on_day_rollover(
    mut rollovers: EventReader<DayRolloverEvent>,
    mut relationships: ResMut<Relationships>,
) {
    for _ in rollovers.read() {
        relationships.gifted_today.clear();
    }
}

pub struct InteractPlugin;

impl Plugin for InteractPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Inventory>()
            .init_resource::<Relationships>()
            .init_resource::<QuestLog>()
            .init_resource::<ReturnPoint>()
            .add_systems(OnEnter(GameState::Playing), seed_quests)
            .add_systems(
                Update,
                (interact, gift, buy, work, track_quests, on_day_rollover)
                    .run_if(in_state(GameState::Playing)),
            );
    }
}

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

    #[test]
    fn gift_once_per_day_per_npc() {
        let mut rel = Relationships::default();
        let mut inv = Inventory::default();
        inv.add("bouquet", 2);

        let event = give_gift(&mut rel, &mut inv, "greta", "bouquet").unwrap();
        assert_eq!(event.npc_id, "greta");
        assert_eq!(rel.friendship["greta"], GIFT_FRIENDSHIP as u32);

        let err = give_gift(&mut rel, &mut inv, "greta", "bouquet").unwrap_err();
        assert_eq!(err, InteractError::AlreadyGifted);
        assert_eq!(inv.count("bouquet"), 1, "refused gift keeps the item");

        // A different NPC still accepts today.
        give_gift(&mut rel, &mut inv, "lina", "bouquet").unwrap();

        // Tomorrow Greta accepts again.
        rel.gifted_today.clear();
        inv.add("bouquet", 1);
        give_gift(&mut rel, &mut inv, "greta", "bouquet").unwrap();
        assert_eq!(rel.friendship["greta"], 2 * GIFT_FRIENDSHIP as u32);
    }

    #[test]
    fn gift_without_item_is_refused() {
        let mut rel = Relationships::default();
        let mut inv = Inventory::default();
        let err = give_gift(&mut rel, &mut inv, "greta", "bouquet").unwrap_err();
        assert_eq!(err, InteractError::NoGiftToGive);
        assert!(rel.gifted_today.is_empty());
    }

    #[test]
    fn buying_moves_gold_and_stocks_inventory() {
        let reg = registry();
        let mut player = PlayerState { gold: 25, ..Default::default() };
        let mut inv = Inventory::default();

        let price = buy_item(&mut player, &mut inv, &reg, "carrot_seeds").unwrap();
        assert_eq!(price, 10);
        assert_eq!(player.gold, 15);
        assert_eq!(inv.count("carrot_seeds"), 1);

        // Store goods table works too.
        buy_item(&mut player, &mut inv, &reg, "animal_feed").unwrap();
        assert_eq!(player.gold, 10);

        let err = buy_item(&mut player, &mut inv, &reg, "tomato_seeds").unwrap_err();
        assert_eq!(err, InteractError::CannotAfford);
        let err = buy_item(&mut player, &mut inv, &reg, "moon_rock").unwrap_err();
        assert_eq!(err, InteractError::NotForSale);
    }

    #[test]
    fn working_a_shift_pays_and_drains_energy() {
        let mut player = PlayerState::default();
        let job = Job { id: "clerk".into(), title: "Store Clerk".into(), pay: 40, energy_cost: 10.0 };
        let gold = player.gold;
        work_shift(&mut player, &job).unwrap();
        assert_eq!(player.gold, gold + 40);
        assert!((player.energy - (MAX_ENERGY - 10.0)).abs() < f32::EPSILON);
        assert_eq!(player.job.as_ref().map(|j| j.id.as_str()), Some("clerk"));

        player.energy = 5.0;
        assert_eq!(work_shift(&mut player, &job).unwrap_err(), InteractError::Exhausted);
    }

    fn villager(id: &str) -> Npc {
        Npc {
            id: id.to_string(),
            name: id.to_string(),
            role: NpcRole::Villager,
            dialogue: vec![],
        }
    }

    fn fountain() -> PoiMarker {
        PoiMarker { name: "Old Fountain".into(), building: None, healer: false, job: None }
    }

    #[test]
    fn nearest_interactable_prefers_the_closer_hit() {
        let npc = villager("lina");
        let marker = fountain();

        match nearest_interactable(
            [(&npc, Vec2::new(1.0, 0.0))],
            [(&marker, Vec2::new(1.5, 0.0))],
            Vec2::ZERO,
        ) {
            Some(Interactable::Npc(n)) => assert_eq!(n.id, "lina"),
            other => panic!("expected the NPC, got {other:?}"),
        }

        match nearest_interactable(
            [(&npc, Vec2::new(1.9, 0.0))],
            [(&marker, Vec2::new(0.5, 0.0))],
            Vec2::ZERO,
        ) {
            Some(Interactable::Marker(m)) => assert_eq!(m.name, "Old Fountain"),
            other => panic!("expected the marker, got {other:?}"),
        }

        // Equidistant hits go to the NPC.
        match nearest_interactable(
            [(&npc, Vec2::new(1.0, 0.0))],
            [(&marker, Vec2::new(-1.0, 0.0))],
            Vec2::ZERO,
        ) {
            Some(Interactable::Npc(_)) => {}
            other => panic!("expected the NPC on a tie, got {other:?}"),
        }

        // Everything out of range.
        assert!(nearest_interactable(
            [(&npc, Vec2::new(50.0, 0.0))],
            [(&marker, Vec2::new(50.0, 0.0))],
            Vec2::ZERO,
        )
        .is_none());
    }

    #[test]
    fn job_at_finds_only_markers_offering_work() {
        let store = PoiMarker {
            name: "General Store".into(),
            building: Some(0),
            healer: false,
            job: Some(Job {
                id: "clerk".into(),
                title: "Store Clerk".into(),
                pay: 40,
                energy_cost: 10.0,
            }),
        };
        let plain = fountain();

        assert!(job_at([(&plain, Vec2::ZERO)], Vec2::ZERO).is_none());

        let found = job_at(
            [(&plain, Vec2::ZERO), (&store, Vec2::new(1.0, 0.0))],
            Vec2::ZERO,
        )
        .expect("store offers work");
        assert_eq!(found.id, "clerk");

        assert!(job_at([(&store, Vec2::new(50.0, 0.0))], Vec2::ZERO).is_none());
    }

    #[test]
    fn quest_completion_moves_between_lists() {
        let mut quests = QuestLog {
            active: vec!["first_harvest".into()],
            completed: vec![],
        };
        assert!(complete_quest(&mut quests, "first_harvest"));
        assert!(quests.active.is_empty());
        assert_eq!(quests.completed, vec!["first_harvest".to_string()]);
        // Completing twice is a no-op.
        assert!(!complete_quest(&mut quests, "first_harvest"));
    }
}
