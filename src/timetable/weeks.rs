use std::collections::BTreeSet;

/// Highest week number a semester can carry.
pub const MAX_WEEK: u32 = 53;

pub fn is_valid_week(week: u32) -> bool {
    (1..=MAX_WEEK).contains(&week)
}

/// Expands a compact week list such as `"1-9,11-13"` into sorted, unique
/// week numbers. Ranges are inclusive in either direction; anything that is
/// not a week in `1..=MAX_WEEK` or a range between two such weeks is skipped.
pub fn expand_weeks(spec: &str) -> Vec<u32> {
    let compact: String = spec
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '–' || c == '—' { '-' } else { c })
        .collect();

    let mut weeks = BTreeSet::new();
    for part in compact.split(',').filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((a, b)) => {
                let (Ok(a), Ok(b)) = (a.parse::<u32>(), b.parse::<u32>()) else {
                    continue;
                };
                if a.max(b) > MAX_WEEK {
                    continue;
                }
                weeks.extend((a.min(b)..=a.max(b)).filter(|w| is_valid_week(*w)));
            }
            None => {
                if let Ok(week) = part.parse::<u32>() {
                    if is_valid_week(week) {
                        weeks.insert(week);
                    }
                }
            }
        }
    }

    weeks.into_iter().collect()
}

/// `"830"` / `"0830"` / `"08:30"` to `"08:30"`. `None` for anything that is
/// not a valid time of day.
pub fn hhmm_to_clock(raw: &str) -> Option<String> {
    let digits: String = raw.trim().chars().filter(|c| *c != ':').collect();
    if digits.is_empty() || digits.len() > 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let padded = format!("{digits:0>4}");
    let hours: u32 = padded[..2].parse().ok()?;
    let minutes: u32 = padded[2..].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(format!("{hours:02}:{minutes:02}"))
}

/// Minutes since midnight of an `"HH:MM"` string.
pub fn clock_minutes(clock: &str) -> Option<u32> {
    let (h, m) = clock.split_once(':')?;
    Some(h.parse::<u32>().ok()? * 60 + m.parse::<u32>().ok()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_singles_and_ranges() {
        assert_eq!(expand_weeks("1-3,5,7-9"), vec![1, 2, 3, 5, 7, 8, 9]);
        assert_eq!(expand_weeks("1-9,11-13").len(), 12);
    }

    #[test]
    fn reversed_range_is_equivalent() {
        assert_eq!(expand_weeks("9-1"), expand_weeks("1-9"));
        assert_eq!(expand_weeks("9-1"), (1..=9).collect::<Vec<_>>());
    }

    #[test]
    fn tolerates_spaces_duplicates_and_junk() {
        assert_eq!(expand_weeks(" 2, 1 - 3 ,x, 0,,3"), vec![1, 2, 3]);
        assert!(expand_weeks("").is_empty());
    }

    #[test]
    fn out_of_range_weeks_are_dropped() {
        assert!(expand_weeks("99999999").is_empty());
        assert!(expand_weeks("1-4000000000").is_empty());
        assert_eq!(expand_weeks("1-2,54,53"), vec![1, 2, 53]);
        assert_eq!(expand_weeks("0-3"), vec![1, 2, 3]);
    }

    #[test]
    fn clock_normalization() {
        assert_eq!(hhmm_to_clock("830").as_deref(), Some("08:30"));
        assert_eq!(hhmm_to_clock("0920").as_deref(), Some("09:20"));
        assert_eq!(hhmm_to_clock("13:05").as_deref(), Some("13:05"));
        assert_eq!(hhmm_to_clock("2460"), None);
        assert_eq!(clock_minutes("09:20"), Some(560));
    }
}
