//! The in-game wall clock: 10-minute steps, hour crossings, day rollover,
//! and season advancement.
//!
//! Day rollover is atomic: the clock mutates and every listener sees the
//! same `DayRolloverEvent` within the same tick, so no system ever observes
//! a half-rolled day.

use bevy::prelude::*;

use crate::shared::*;

/// What one 10-minute step crossed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClockAdvance {
    pub hour_crossed: bool,
    pub day_rolled: bool,
    pub season_changed: bool,
}

/// Advance the clock by one `MINUTES_PER_STEP` quantum. Pure; the system
/// wrapper turns the returned flags into events.
pub fn advance_step(clock: &mut GameClock) -> ClockAdvance {
    let mut adv = ClockAdvance::default();

    clock.minute += MINUTES_PER_STEP;
    if clock.minute >= 60 {
        clock.minute = 0;
        clock.hour += 1;
        adv.hour_crossed = true;
    }
    if clock.hour >= 24 {
        clock.hour = 0;
        clock.day += 1;
        adv.day_rolled = true;
        // Season flips when the new day starts a fresh 28-day block.
        if (clock.day - 1) % DAYS_PER_SEASON == 0 {
            clock.season = clock.season.next();
            adv.season_changed = true;
        }
    }

    adv
}

fn tick_clock(
    time: Res<Time>,
    mut clock: ResMut<GameClock>,
    mut player: ResMut<PlayerState>,
    mut hour_events: EventWriter<HourTickEvent>,
    mut rollover_events: EventWriter<DayRolloverEvent>,
    mut season_events: EventWriter<SeasonChangeEvent>,
) {
    if clock.time_paused {
        return;
    }

    clock.elapsed_real_seconds += time.delta_secs();
    let step_secs = SECS_PER_GAME_MINUTE * MINUTES_PER_STEP as f32;

    while clock.elapsed_real_seconds >= step_secs {
        clock.elapsed_real_seconds -= step_secs;
        let adv = advance_step(&mut clock);

        if adv.hour_crossed {
            player.restore_energy(ENERGY_PER_HOUR);
            hour_events.send(HourTickEvent { hour: clock.hour });
        }
        if adv.day_rolled {
            info!(
                "[Clock] Day {} begins ({:?}, day {} of season)",
                clock.day,
                clock.season,
                clock.day_of_season()
            );
            rollover_events.send(DayRolloverEvent { day: clock.day, season: clock.season });
        }
        if adv.season_changed {
            info!("[Clock] Season changed to {:?}", clock.season);
            season_events.send(SeasonChangeEvent { season: clock.season });
        }
    }
}

fn pause_clock(mut clock: ResMut<GameClock>) {
    clock.time_paused = true;
}

fn resume_clock(mut clock: ResMut<GameClock>) {
    clock.time_paused = false;
    clock.elapsed_real_seconds = 0.0;
}

pub struct ClockPlugin;

impl Plugin for ClockPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GameClock>()
            .add_systems(Update, tick_clock.run_if(in_state(GameState::Playing)))
            .add_systems(OnExit(GameState::Playing), pause_clock)
            .add_systems(OnEnter(GameState::Playing), resume_clock);
    }
}
