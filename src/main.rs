mod shared;
mod data;
mod world;
mod spatial;
mod camera;
mod player;
mod ai;
mod clock;
mod farming;
mod animals;
mod render;
mod interact;
mod save;

use bevy::prelude::*;
use bevy::window::{PresentMode, WindowResolution};

use shared::*;

fn main() {
    App::new()
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Elmsworth".into(),
                        resolution: WindowResolution::new(SCREEN_WIDTH, SCREEN_HEIGHT),
                        present_mode: PresentMode::AutoVsync,
                        resizable: true,
                        ..default()
                    }),
                    ..default()
                })
                .set(ImagePlugin::default_nearest()),
        )
        // Game state
        .init_state::<GameState>()
        // Events
        .add_event::<DayRolloverEvent>()
        .add_event::<SeasonChangeEvent>()
        .add_event::<HourTickEvent>()
        .add_event::<CropHarvestedEvent>()
        .add_event::<GiftGivenEvent>()
        .add_event::<ToastEvent>()
        // Domain plugins
        .add_plugins(data::DataPlugin)
        .add_plugins(world::WorldPlugin)
        .add_plugins(camera::CameraPlugin)
        .add_plugins(player::PlayerPlugin)
        .add_plugins(ai::AiPlugin)
        .add_plugins(clock::ClockPlugin)
        .add_plugins(farming::FarmingPlugin)
        .add_plugins(animals::AnimalsPlugin)
        .add_plugins(interact::InteractPlugin)
        .add_plugins(render::RenderPlugin)
        .add_plugins(save::SavePlugin)
        .run();
}
