use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeDelta, Utc};
use serde::Serialize;

use archivault_types::ResourceType;
use archivault_vault::NormalizedState;

use crate::config::TrashConfig;

const SECONDS_PER_DAY: i64 = 86_400;

/// Summary of the trash contents.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TrashStats {
    pub item_count: usize,
    pub oldest_item: Option<DateTime<Utc>>,
    pub newest_item: Option<DateTime<Utc>>,
    pub items_by_type: BTreeMap<ResourceType, usize>,
    /// Records that expire within `expiring_soon_days`.
    pub expiring_soon: usize,
    /// Records whose entity payload is missing.
    pub corrupted_count: usize,
}

/// Trash summary under the default policy, as of now.
pub fn get_trash_stats(state: &NormalizedState) -> TrashStats {
    get_trash_stats_at(state, &TrashConfig::default(), Utc::now())
}

/// Trash summary under `config`, as of `now`.
pub fn get_trash_stats_at(
    state: &NormalizedState,
    config: &TrashConfig,
    now: DateTime<Utc>,
) -> TrashStats {
    let mut stats = TrashStats::default();
    for record in state.trashed().values() {
        stats.item_count += 1;
        match record.kind() {
            Some(kind) => *stats.items_by_type.entry(kind).or_default() += 1,
            None => stats.corrupted_count += 1,
        }
        let Some(at) = record.trashed_at else {
            continue;
        };
        stats.oldest_item = Some(stats.oldest_item.map_or(at, |o| o.min(at)));
        stats.newest_item = Some(stats.newest_item.map_or(at, |n| n.max(at)));
        let days_left = get_days_until_expiration(at, config.retention_days, now);
        if days_left <= config.expiring_soon_days {
            stats.expiring_soon += 1;
        }
    }
    stats
}

/// Whole days left before a record trashed at `trashed_at` becomes eligible
/// for cleanup. Partial days round up; expired records report 0.
///
/// A negative window disables cleanup, and a window that runs past the
/// representable calendar is never reached: both report `i64::MAX`.
pub fn get_days_until_expiration(
    trashed_at: DateTime<Utc>,
    retention_days: i64,
    now: DateTime<Utc>,
) -> i64 {
    if retention_days < 0 {
        return i64::MAX;
    }
    let expires_at =
        TimeDelta::try_days(retention_days).and_then(|d| trashed_at.checked_add_signed(d));
    let Some(expires_at) = expires_at else {
        return i64::MAX;
    };
    let remaining = (expires_at - now).num_seconds();
    if remaining <= 0 {
        return 0;
    }
    (remaining + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
}

/// Human-readable age such as "5 minutes ago" or "yesterday".
///
/// Anything older than four weeks is shown as a calendar date.
pub fn format_relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now - then;
    let plural = |n: i64, unit: &str| {
        if n == 1 {
            format!("1 {unit} ago")
        } else {
            format!("{n} {unit}s ago")
        }
    };
    match elapsed {
        e if e < Duration::minutes(1) => "just now".to_string(),
        e if e < Duration::hours(1) => plural(e.num_minutes(), "minute"),
        e if e < Duration::days(1) => plural(e.num_hours(), "hour"),
        e if e < Duration::days(2) => "yesterday".to_string(),
        e if e < Duration::weeks(1) => plural(e.num_days(), "day"),
        e if e < Duration::weeks(4) => plural(e.num_weeks(), "week"),
        _ => then.format("%Y-%m-%d").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archivault_types::{Entity, EntityId};
    use archivault_vault::ops;
    use chrono::TimeZone;

    use crate::service::move_to_trash_at;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    #[test]
    fn expiration_counts_down() {
        assert_eq!(get_days_until_expiration(now(), 30, now()), 30);
        assert_eq!(get_days_until_expiration(now() - Duration::hours(1), 30, now()), 30);
        assert_eq!(get_days_until_expiration(now() - Duration::days(29), 30, now()), 1);
        assert_eq!(get_days_until_expiration(now() - Duration::days(30), 30, now()), 0);
        assert_eq!(get_days_until_expiration(now() - Duration::days(90), 30, now()), 0);
    }

    #[test]
    fn relative_time_buckets() {
        let n = now();
        assert_eq!(format_relative_time(n - Duration::seconds(10), n), "just now");
        assert_eq!(format_relative_time(n - Duration::minutes(1), n), "1 minute ago");
        assert_eq!(format_relative_time(n - Duration::minutes(5), n), "5 minutes ago");
        assert_eq!(format_relative_time(n - Duration::hours(3), n), "3 hours ago");
        assert_eq!(format_relative_time(n - Duration::hours(30), n), "yesterday");
        assert_eq!(format_relative_time(n - Duration::days(4), n), "4 days ago");
        assert_eq!(format_relative_time(n - Duration::days(15), n), "2 weeks ago");
        assert_eq!(format_relative_time(n - Duration::days(60), n), "2024-05-01");
    }

    #[test]
    fn expiration_past_the_calendar_never_arrives() {
        assert_eq!(get_days_until_expiration(now(), 200_000_000_000_000, now()), i64::MAX);
        assert_eq!(get_days_until_expiration(now(), 365 * 300_000, now()), i64::MAX);
        assert_eq!(get_days_until_expiration(DateTime::<Utc>::MAX_UTC, 1, now()), i64::MAX);
        assert_eq!(get_days_until_expiration(now(), -1, now()), i64::MAX);
        let at_the_edge = get_days_until_expiration(DateTime::<Utc>::MAX_UTC, 0, now());
        assert!(at_the_edge > 0 && at_the_edge < i64::MAX);
    }

    fn manifest_with_canvases() -> NormalizedState {
        let m = EntityId::new("m");
        let s = NormalizedState::new();
        let s = ops::add_entity(&s, Entity::new("m", ResourceType::Manifest)).unwrap();
        let s = ops::add_child(&s, &m, Entity::new("c1", ResourceType::Canvas), None).unwrap();
        let s = ops::add_child(&s, &m, Entity::new("c2", ResourceType::Canvas), None).unwrap();
        let page = Entity::new("p", ResourceType::AnnotationPage);
        ops::add_child(&s, &EntityId::new("c1"), page, None).unwrap()
    }

    // Fresh, old and damaged records together.
    #[test]
    fn stats_over_mixed_trash() {
        let s = manifest_with_canvases();
        let s = move_to_trash_at(&s, &EntityId::new("c1"), now() - Duration::days(25)).unwrap();
        let s = move_to_trash_at(&s, &EntityId::new("c2"), now() - Duration::days(1)).unwrap();
        let mut s = move_to_trash_at(&s, &EntityId::new("p"), now()).unwrap();
        s.insert_trashed(EntityId::new("junk"), serde_json::from_str("{}").unwrap());

        let stats = get_trash_stats_at(&s, &TrashConfig::default(), now());
        assert_eq!(stats.item_count, 4);
        assert_eq!(stats.corrupted_count, 1);
        assert_eq!(stats.items_by_type[&ResourceType::Canvas], 2);
        assert_eq!(stats.items_by_type[&ResourceType::AnnotationPage], 1);
        assert_eq!(stats.oldest_item, Some(now() - Duration::days(25)));
        assert_eq!(stats.newest_item, Some(now()));
        assert_eq!(stats.expiring_soon, 1);
    }

    #[test]
    fn stats_with_record_at_end_of_calendar() {
        let s = manifest_with_canvases();
        let end = DateTime::<Utc>::MAX_UTC;
        let s = move_to_trash_at(&s, &EntityId::new("c2"), end).unwrap();

        let stats = get_trash_stats_at(&s, &TrashConfig::default(), now());
        assert_eq!(stats.item_count, 1);
        assert_eq!(stats.newest_item, Some(end));
        assert_eq!(stats.expiring_soon, 0);
    }

    #[test]
    fn stats_with_huge_retention_from_toml() {
        let config: TrashConfig = toml::from_str("retention_days = 200000000000000").unwrap();
        let s = manifest_with_canvases();
        let s = move_to_trash_at(&s, &EntityId::new("c2"), now() - Duration::days(400)).unwrap();

        let stats = get_trash_stats_at(&s, &config, now());
        assert_eq!(stats.item_count, 1);
        assert_eq!(stats.expiring_soon, 0);
    }

    #[test]
    fn negative_retention_expires_nothing() {
        let config = TrashConfig {
            retention_days: -5,
            ..TrashConfig::default()
        };
        let s = manifest_with_canvases();
        let s = move_to_trash_at(&s, &EntityId::new("c2"), now() - Duration::days(40)).unwrap();
        assert_eq!(get_trash_stats_at(&s, &config, now()).expiring_soon, 0);
    }

    #[test]
    fn empty_trash_stats() {
        let stats = get_trash_stats(&NormalizedState::new());
        assert_eq!(stats, TrashStats::default());
    }
}
