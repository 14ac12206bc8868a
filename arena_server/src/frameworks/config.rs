use std::{env, str::FromStr, time::Duration};

use crate::domain::tuning::ArenaTuning;
use crate::use_cases::{DispatcherSettings, FanoutSettings, SnapshotPolicy};

// Runtime/server settings read from the environment, with gameplay geometry alongside.

pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;
pub const MAX_INVALID_MESSAGES: u32 = 10;

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

pub fn http_port() -> u16 {
    env_or("ARENA_SERVER_PORT", 3001)
}

pub fn arena_tuning() -> ArenaTuning {
    let defaults = ArenaTuning::default();
    let grid_size: i32 = env_or("ARENA_GRID_SIZE", defaults.grid_size);
    let spacing: f64 = env_or("ARENA_GRID_SPACING", defaults.spacing);
    let player_radius: f64 = env_or("ARENA_PLAYER_RADIUS", defaults.player_radius);

    ArenaTuning {
        grid_size: if grid_size > 0 { grid_size } else { defaults.grid_size },
        spacing: if spacing.is_finite() && spacing > 0.0 { spacing } else { defaults.spacing },
        player_radius: if player_radius.is_finite() && player_radius > 0.0 {
            player_radius
        } else {
            defaults.player_radius
        },
    }
}

pub fn event_deadline() -> Duration {
    Duration::from_millis(env_or("ARENA_EVENT_DEADLINE_MS", 3000))
}

pub fn fanout_settings() -> FanoutSettings {
    FanoutSettings {
        max_in_flight: env_or("ARENA_FANOUT_MAX_IN_FLIGHT", 64_usize).max(1),
        send_timeout: Duration::from_millis(env_or("ARENA_SEND_TIMEOUT_MS", 1000)),
    }
}

pub fn snapshot_policy() -> SnapshotPolicy {
    // 0 disables the activity window.
    let window_secs: u64 = env_or("ARENA_SNAPSHOT_ACTIVE_WINDOW_SECS", 0);
    SnapshotPolicy {
        online_only: env_or("ARENA_SNAPSHOT_ONLINE_ONLY", false),
        active_window: (window_secs > 0).then_some(Duration::from_secs(window_secs)),
    }
}

pub fn dispatcher_settings() -> DispatcherSettings {
    DispatcherSettings {
        tuning: arena_tuning(),
        snapshot: snapshot_policy(),
        fanout: fanout_settings(),
        event_deadline: event_deadline(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Keys here are never set by other tests, so reading them yields the defaults.
    #[test]
    fn when_variables_are_unset_then_defaults_apply() {
        assert_eq!(env_or("ARENA_TEST_UNSET_PORT", 3001_u16), 3001);
        assert!(!env_or("ARENA_TEST_UNSET_FLAG", false));
    }

    #[test]
    fn defaults_match_the_documented_arena() {
        let settings = DispatcherSettings::default();
        assert_eq!(settings.tuning, ArenaTuning::default());
        assert_eq!(settings.event_deadline, Duration::from_millis(3000));
        assert_eq!(settings.fanout.max_in_flight, 64);
        assert_eq!(settings.snapshot.active_window, None);
    }
}
