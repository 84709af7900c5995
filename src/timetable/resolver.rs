//! Deterministic weekday assignment for classes whose column could not be
//! read from the layout.

use std::collections::{HashMap, HashSet};

use super::grammar::ParsedClass;
use super::weeks::clock_minutes;
use crate::log_warn;

const ENABLE_LOGS: bool = true;

/// Monday..Saturday; Sunday is never assigned.
const WEEKDAYS: u8 = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverReport {
    pub groups: usize,
    /// Groups that could not be placed clash-free and sit on their seed day.
    pub forced_clashes: usize,
}

/// FNV-1a (32 bit) of `key`, reduced to a weekday in 1..=6.
pub fn day_seed(key: &str) -> u8 {
    let mut hash: u32 = 2_166_136_261;
    for unit in key.encode_utf16() {
        hash ^= u32::from(unit);
        hash = hash.wrapping_mul(16_777_619);
    }
    (hash % u32::from(WEEKDAYS)) as u8 + 1
}

/// Occurrences sharing this key always land on the same weekday.
pub fn stability_key(class: &ParsedClass) -> String {
    format!(
        "{}::{}::{}",
        class.course_code.trim(),
        class.component.as_str(),
        class.group_index
    )
}

/// True when layout gave no usable weekday spread (some class has no day, or
/// every class sits on the same one) and there are at least two groups to
/// spread. A lone group keeps the fallback day.
pub fn needs_resolution(classes: &[ParsedClass]) -> bool {
    let Some(first) = classes.first() else {
        return false;
    };
    let groups: HashSet<String> = classes.iter().map(stability_key).collect();
    if groups.len() < 2 {
        return false;
    }
    classes.iter().any(|c| c.day_of_week.is_none())
        || classes.iter().all(|c| c.day_of_week == first.day_of_week)
}

fn window(class: &ParsedClass) -> (u32, u32) {
    let start = clock_minutes(&class.start_time).unwrap_or(8 * 60 + 30);
    let end = clock_minutes(&class.end_time).unwrap_or(start + 50);
    (start, end.max(start))
}

fn overlaps(a: (u32, u32), b: (u32, u32)) -> bool {
    !(a.1 <= b.0 || b.1 <= a.0)
}

/// Assigns every class a weekday in 1..=6.
///
/// Groups are placed in order of their earliest start time. Each group tries
/// its seed day first and then the following days cyclically; the first day
/// on which none of its sessions overlaps an already placed session wins. A
/// group that fits nowhere is put on its seed day regardless.
pub fn resolve_weekdays(classes: &mut [ParsedClass]) -> ResolverReport {
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, class) in classes.iter().enumerate() {
        groups.entry(stability_key(class)).or_default().push(idx);
    }

    let mut ordered: Vec<(String, Vec<usize>)> = groups.into_iter().collect();
    ordered.sort_by(|(key_a, members_a), (key_b, members_b)| {
        let earliest = |members: &Vec<usize>| {
            members
                .iter()
                .map(|&i| window(&classes[i]).0)
                .min()
                .unwrap_or(0)
        };
        earliest(members_a)
            .cmp(&earliest(members_b))
            .then_with(|| key_a.cmp(key_b))
    });

    let mut placed: HashMap<u8, Vec<(u32, u32)>> = HashMap::new();
    let mut report = ResolverReport {
        groups: ordered.len(),
        forced_clashes: 0,
    };

    for (key, members) in ordered {
        let seed = day_seed(&key);
        let windows: Vec<(u32, u32)> = members.iter().map(|&i| window(&classes[i])).collect();

        let mut day = seed;
        let mut chosen = None;
        for _ in 0..WEEKDAYS {
            let taken = placed.get(&day).map(Vec::as_slice).unwrap_or(&[]);
            let clash = windows
                .iter()
                .any(|w| taken.iter().any(|p| overlaps(*w, *p)));
            if !clash {
                chosen = Some(day);
                break;
            }
            day = day % WEEKDAYS + 1;
        }

        let day = match chosen {
            Some(day) => day,
            None => {
                log_warn!("No clash-free weekday for {key}; keeping seed day {seed}");
                report.forced_clashes += 1;
                seed
            }
        };

        placed.entry(day).or_default().extend(windows);
        for &i in &members {
            classes[i].day_of_week = Some(day);
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{ClassComponent, DeliveryMode};

    fn class(code: &str, component: ClassComponent, group: &str, start: &str, end: &str) -> ParsedClass {
        ParsedClass {
            course_code: code.to_string(),
            component,
            group_index: group.to_string(),
            location: None,
            delivery: DeliveryMode::Physical,
            day_of_week: None,
            start_time: start.to_string(),
            end_time: end.to_string(),
            weeks: vec![1],
        }
    }

    #[test]
    fn seed_is_stable_and_in_range() {
        assert_eq!(day_seed("SC2006::LEC::SCL2"), day_seed("SC2006::LEC::SCL2"));
        for key in ["", "a", "SC2005::TUT::T3", "MH1810::LEC::ALL"] {
            assert!((1..=6).contains(&day_seed(key)));
        }
        // empty key hashes to the offset basis, 2166136261 % 6 == 1
        assert_eq!(day_seed(""), 2);
    }

    #[test]
    fn same_group_lands_on_same_day() {
        let mut classes = vec![
            class("SC2006", ClassComponent::Lec, "SCL2", "08:30", "09:20"),
            class("SC2006", ClassComponent::Lec, "SCL2", "14:30", "15:20"),
            class("SC2005", ClassComponent::Tut, "T3", "10:30", "11:20"),
        ];
        resolve_weekdays(&mut classes);
        assert_eq!(classes[0].day_of_week, classes[1].day_of_week);
        assert!(classes.iter().all(|c| matches!(c.day_of_week, Some(1..=6))));
    }

    #[test]
    fn overlapping_groups_are_spread_across_days() {
        let mut classes: Vec<ParsedClass> = (0..6)
            .map(|i| class("SC2006", ClassComponent::Tut, &format!("T{i}"), "09:00", "10:00"))
            .collect();
        let report = resolve_weekdays(&mut classes);

        let mut days: Vec<u8> = classes.iter().filter_map(|c| c.day_of_week).collect();
        days.sort_unstable();
        days.dedup();
        assert_eq!(days.len(), 6);
        assert_eq!(report.forced_clashes, 0);
    }

    #[test]
    fn seventh_overlapping_group_is_forced() {
        let mut classes: Vec<ParsedClass> = (0..7)
            .map(|i| class("SC2006", ClassComponent::Tut, &format!("T{i}"), "09:00", "10:00"))
            .collect();
        let report = resolve_weekdays(&mut classes);
        assert_eq!(report.forced_clashes, 1);
        assert!(classes.iter().all(|c| c.day_of_week.is_some()));
    }

    #[test]
    fn resolution_trigger() {
        let mut a = class("SC2006", ClassComponent::Lec, "SCL2", "08:30", "09:20");
        let mut b = class("SC2005", ClassComponent::Lec, "SCL1", "08:30", "09:20");
        assert!(needs_resolution(&[a.clone(), b.clone()]));

        a.day_of_week = Some(1);
        b.day_of_week = Some(1);
        assert!(needs_resolution(&[a.clone(), b.clone()]));

        b.day_of_week = Some(3);
        assert!(!needs_resolution(&[a.clone(), b]));
        assert!(!needs_resolution(&[]));

        // one group, even across several rows, has nothing to spread
        let mut other_row = a.clone();
        other_row.start_time = "14:30".into();
        a.day_of_week = None;
        assert!(!needs_resolution(&[a, other_row]));
    }
}
