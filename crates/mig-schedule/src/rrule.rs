//! Recurrence-rule repair
//!
//! Controller schedules carry an iCalendar-style rule block: a start anchor
//! (`DTSTART...`) followed by one or more repetition lines (`RRULE:...`).
//! Exported schedules sometimes lose the anchor; [`synthesize`] rebuilds it
//! from the schedule's next-run timestamp.
//!
//! # Anchor forms
//! - `DTSTART;TZID=Europe/Berlin:20251016T160000` when a resolvable timezone
//!   is known (local wall-clock time)
//! - `DTSTART:20251016T140000Z` otherwise (UTC, zulu suffix)

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

const ANCHOR_PREFIX: &str = "DTSTART";
const UTC_ZONE: &str = "UTC";

/// What [`synthesize`] did to the rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Repair {
    /// Anchor already first
    None,
    /// Anchor derived from the next-run timestamp and prepended
    Anchored,
    /// Existing anchor moved in front of the repetition lines
    Reordered,
    /// No anchor and nothing to derive one from; rule passed through
    Missing,
}

/// Repaired rule plus the timezone it is expressed in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesized {
    /// Rule text to submit
    pub rule: String,
    /// Timezone the anchor is expressed in, if known
    pub timezone: Option<String>,
    /// Repair applied
    pub repair: Repair,
}

/// Complete a rule that may lack its start anchor
///
/// Never fails: an unrepairable rule is returned unchanged with
/// [`Repair::Missing`] so the target's own validation reports it.
/// The output keeps the input's layout: newline-separated if the input was
/// multi-line, otherwise single-space separated.
#[must_use]
pub fn synthesize(raw: &str, next_run: Option<&str>, timezone: Option<&str>) -> Synthesized {
    let multi_line = raw.contains('\n');
    let parts: Vec<&str> = if multi_line {
        raw.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
    } else {
        raw.split_whitespace().collect()
    };
    let separator = if multi_line { "\n" } else { " " };
    let timezone = timezone.map(str::trim).filter(|tz| !tz.is_empty());

    if let Some(pos) = parts.iter().position(|p| is_anchor(p)) {
        let zone = anchor_zone(parts[pos], timezone);
        if pos == 0 {
            return Synthesized {
                rule: raw.to_string(),
                timezone: zone,
                repair: Repair::None,
            };
        }
        let mut reordered = Vec::with_capacity(parts.len());
        reordered.push(parts[pos]);
        reordered.extend(parts.iter().enumerate().filter(|(i, _)| *i != pos).map(|(_, p)| *p));
        return Synthesized {
            rule: reordered.join(separator),
            timezone: zone,
            repair: Repair::Reordered,
        };
    }

    let instant = next_run.and_then(parse_instant);
    let (Some(instant), false) = (instant, parts.is_empty()) else {
        return Synthesized {
            rule: raw.to_string(),
            timezone: timezone.map(str::to_string),
            repair: Repair::Missing,
        };
    };

    let (anchor, zone) = anchor_for(instant, timezone);
    let mut rule = anchor;
    for part in parts {
        rule.push_str(separator);
        rule.push_str(part);
    }

    Synthesized {
        rule,
        timezone: Some(zone),
        repair: Repair::Anchored,
    }
}

fn is_anchor(part: &str) -> bool {
    part.get(..ANCHOR_PREFIX.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(ANCHOR_PREFIX))
}

/// Zone an existing anchor is expressed in
///
/// `TZID` wins, a zulu timestamp is UTC, and only a floating local time
/// takes the schedule's own timezone.
fn anchor_zone(anchor: &str, timezone: Option<&str>) -> Option<String> {
    if let Some(zone) = anchor_timezone(anchor) {
        return Some(zone.to_string());
    }
    if anchor.trim_end().ends_with(['Z', 'z']) {
        return Some(UTC_ZONE.to_string());
    }
    timezone.map(str::to_string)
}

/// `TZID` parameter of an anchor line, if any
fn anchor_timezone(anchor: &str) -> Option<&str> {
    let params = anchor.split_once(':')?.0;
    params
        .split(';')
        .find_map(|p| p.strip_prefix("TZID=").or_else(|| p.strip_prefix("tzid=")))
}

/// Parse a next-run timestamp; fractional seconds are dropped by formatting
fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn anchor_for(instant: DateTime<Utc>, timezone: Option<&str>) -> (String, String) {
    match timezone {
        Some(name) if !name.eq_ignore_ascii_case(UTC_ZONE) => match name.parse::<Tz>() {
            Ok(tz) => {
                let local = instant.with_timezone(&tz);
                return (
                    format!("{ANCHOR_PREFIX};TZID={name}:{}", local.format("%Y%m%dT%H%M%S")),
                    name.to_string(),
                );
            }
            Err(_) => {
                tracing::warn!("Unknown timezone {}, anchoring in UTC", name);
            }
        },
        _ => {}
    }
    (
        format!("{ANCHOR_PREFIX}:{}", instant.format("%Y%m%dT%H%M%SZ")),
        UTC_ZONE.to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn anchors_in_utc_without_timezone() {
        let out = synthesize("RRULE:FREQ=DAILY", Some("2025-10-16T14:00:00Z"), None);
        assert_eq!(out.rule, "DTSTART:20251016T140000Z RRULE:FREQ=DAILY");
        assert_eq!(out.timezone.as_deref(), Some("UTC"));
        assert_eq!(out.repair, Repair::Anchored);

        let anchor = out.rule.find("DTSTART").unwrap();
        let rrule = out.rule.find("RRULE:").unwrap();
        assert!(anchor < rrule);
    }

    #[test]
    fn anchors_in_local_time_with_timezone() {
        let out = synthesize(
            "RRULE:FREQ=DAILY",
            Some("2025-10-16T14:00:00Z"),
            Some("America/New_York"),
        );
        assert_eq!(
            out.rule,
            "DTSTART;TZID=America/New_York:20251016T100000 RRULE:FREQ=DAILY"
        );
        assert_eq!(out.timezone.as_deref(), Some("America/New_York"));
    }

    #[test]
    fn unknown_timezone_falls_back_to_utc() {
        let out = synthesize("RRULE:FREQ=DAILY", Some("2025-10-16T14:00:00Z"), Some("Mars/Base"));
        assert_eq!(out.rule, "DTSTART:20251016T140000Z RRULE:FREQ=DAILY");
        assert_eq!(out.timezone.as_deref(), Some("UTC"));
    }

    #[test]
    fn fractional_seconds_and_offsets_are_normalized() {
        let out = synthesize(
            "RRULE:FREQ=HOURLY",
            Some("2025-10-16T16:00:00.123456+02:00"),
            None,
        );
        assert_eq!(out.rule, "DTSTART:20251016T140000Z RRULE:FREQ=HOURLY");

        let naive = synthesize("RRULE:FREQ=HOURLY", Some("2025-10-16T14:00:00"), None);
        assert_eq!(naive.rule, "DTSTART:20251016T140000Z RRULE:FREQ=HOURLY");
    }

    #[test]
    fn multi_line_layout_is_kept() {
        let out = synthesize("RRULE:FREQ=WEEKLY\n", Some("2025-01-01T00:00:00Z"), None);
        assert_eq!(out.rule, "DTSTART:20250101T000000Z\nRRULE:FREQ=WEEKLY");
    }

    #[test]
    fn misplaced_anchor_is_moved_first() {
        let out = synthesize(
            "RRULE:FREQ=WEEKLY\nDTSTART;TZID=Europe/Berlin:20250101T090000",
            None,
            None,
        );
        assert_eq!(
            out.rule,
            "DTSTART;TZID=Europe/Berlin:20250101T090000\nRRULE:FREQ=WEEKLY"
        );
        assert_eq!(out.timezone.as_deref(), Some("Europe/Berlin"));
        assert_eq!(out.repair, Repair::Reordered);
    }

    #[test]
    fn well_formed_rule_is_untouched() {
        let raw = "DTSTART:20250101T000000Z RRULE:FREQ=DAILY;INTERVAL=1";
        let out = synthesize(raw, Some("2030-01-01T00:00:00Z"), Some("UTC"));
        assert_eq!(out.rule, raw);
        assert_eq!(out.repair, Repair::None);
    }

    #[test]
    fn zulu_anchor_reports_utc_over_schedule_timezone() {
        let raw = "DTSTART:20250101T000000Z RRULE:FREQ=DAILY";
        let out = synthesize(raw, None, Some("Europe/Berlin"));
        assert_eq!(out.rule, raw);
        assert_eq!(out.timezone.as_deref(), Some("UTC"));

        let floating = synthesize("DTSTART:20250101T090000 RRULE:FREQ=DAILY", None, Some("Europe/Berlin"));
        assert_eq!(floating.timezone.as_deref(), Some("Europe/Berlin"));
    }

    #[test]
    fn unrepairable_rule_passes_through() {
        let out = synthesize("RRULE:FREQ=DAILY", None, None);
        assert_eq!(out.rule, "RRULE:FREQ=DAILY");
        assert_eq!(out.repair, Repair::Missing);

        let garbage = synthesize("RRULE:FREQ=DAILY", Some("next tuesday"), None);
        assert_eq!(garbage.repair, Repair::Missing);
    }
}
