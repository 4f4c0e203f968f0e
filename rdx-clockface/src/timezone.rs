//! Timezone resolution and the built-in timezone catalog.
//!
//! The clock never computes offsets itself. It asks a `TimezoneResolver` for the
//! offset of a `TimezoneId` at a specific instant, which lets DST-aware zones
//! change offset between two samples.

use crate::common::TimezoneId;
use crate::error::ResolveError;
use crate::time::WallClockSample;
use chrono::{FixedOffset, Offset, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;

/// Resolves a timezone identifier to its UTC offset at a given instant.
pub trait TimezoneResolver: Send + Sync {
    fn resolve(
        &self,
        timezone: &TimezoneId,
        instant: WallClockSample,
    ) -> Result<FixedOffset, ResolveError>;
}

/// Resolves identifiers against the IANA database compiled into `chrono-tz`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TzDatabase;

impl TimezoneResolver for TzDatabase {
    fn resolve(
        &self,
        timezone: &TimezoneId,
        instant: WallClockSample,
    ) -> Result<FixedOffset, ResolveError> {
        let tz: Tz = timezone
            .as_str()
            .parse()
            .map_err(|_| ResolveError::UnknownTimezone(timezone.clone()))?;
        Ok(instant.with_timezone(&tz).offset().fix())
    }
}

/// A resolver backed by a fixed table of offsets. `UTC` is always known.
#[derive(Debug, Default, Clone)]
pub struct StaticResolver {
    offsets: HashMap<TimezoneId, FixedOffset>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_offset(mut self, timezone: impl Into<TimezoneId>, offset: FixedOffset) -> Self {
        self.offsets.insert(timezone.into(), offset);
        self
    }
}

impl TimezoneResolver for StaticResolver {
    fn resolve(
        &self,
        timezone: &TimezoneId,
        _instant: WallClockSample,
    ) -> Result<FixedOffset, ResolveError> {
        if let Some(offset) = self.offsets.get(timezone) {
            return Ok(*offset);
        }
        if timezone.is_utc() {
            return Ok(utc_offset());
        }
        Err(ResolveError::UnknownTimezone(timezone.clone()))
    }
}

pub(crate) fn utc_offset() -> FixedOffset {
    Utc.fix()
}

/// One selectable entry of the timezone catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimezoneEntry {
    pub id: &'static str,
    pub label: &'static str,
    /// Nominal (standard time) offset from UTC in minutes. The real offset at a
    /// given instant comes from the resolver.
    pub offset_minutes: i32,
}

impl TimezoneEntry {
    pub fn timezone_id(&self) -> TimezoneId {
        TimezoneId::new(self.id)
    }

    /// The place name, e.g. `"Mumbai"` for `"Mumbai (GMT+5:30)"`.
    pub fn display_name(&self) -> &'static str {
        self.label.split(" (").next().unwrap_or(self.label)
    }

    /// The parenthesised code, e.g. `"GMT+5:30"`, or `""` if the label has none.
    pub fn offset_code(&self) -> &'static str {
        match self.label.split_once('(') {
            Some((_, rest)) => rest.trim_end_matches(')'),
            None => "",
        }
    }

    pub fn formatted_offset(&self) -> String {
        format_offset(self.offset_minutes)
    }
}

/// Formats an offset in minutes as `±HH:MM`.
pub fn format_offset(offset_minutes: i32) -> String {
    let sign = if offset_minutes >= 0 { '+' } else { '-' };
    let minutes = offset_minutes.unsigned_abs();
    format!("{}{:02}:{:02}", sign, minutes / 60, minutes % 60)
}

/// The selectable timezones, ordered by nominal offset from west to east.
pub const CATALOG: &[TimezoneEntry] = &[
    TimezoneEntry { id: "Etc/GMT+12", label: "Line Islands (GMT-12)", offset_minutes: -720 },
    TimezoneEntry { id: "Pacific/Midway", label: "Midway (GMT-11)", offset_minutes: -660 },
    TimezoneEntry { id: "America/Adak", label: "Adak (GMT-10)", offset_minutes: -600 },
    TimezoneEntry { id: "America/Anchorage", label: "Anchorage (GMT-9)", offset_minutes: -540 },
    TimezoneEntry { id: "America/Los_Angeles", label: "Los Angeles (GMT-8)", offset_minutes: -480 },
    TimezoneEntry { id: "America/Denver", label: "Denver (GMT-7)", offset_minutes: -420 },
    TimezoneEntry { id: "America/Chicago", label: "Chicago (GMT-6)", offset_minutes: -360 },
    TimezoneEntry { id: "America/Mexico_City", label: "Mexico City (GMT-6)", offset_minutes: -360 },
    TimezoneEntry { id: "America/New_York", label: "New York (GMT-5)", offset_minutes: -300 },
    TimezoneEntry { id: "America/Caracas", label: "Caracas (GMT-4:30)", offset_minutes: -270 },
    TimezoneEntry { id: "America/Halifax", label: "Halifax (GMT-4)", offset_minutes: -240 },
    TimezoneEntry { id: "America/Sao_Paulo", label: "São Paulo (GMT-3)", offset_minutes: -180 },
    TimezoneEntry { id: "America/Noronha", label: "Fernando de Noronha (GMT-2)", offset_minutes: -120 },
    TimezoneEntry { id: "Atlantic/Azores", label: "Azores (GMT-1)", offset_minutes: -60 },
    TimezoneEntry { id: "UTC", label: "UTC (Coordinated Universal Time)", offset_minutes: 0 },
    TimezoneEntry { id: "Europe/London", label: "London (GMT+0)", offset_minutes: 0 },
    TimezoneEntry { id: "Europe/Paris", label: "Paris (GMT+1)", offset_minutes: 60 },
    TimezoneEntry { id: "Africa/Cairo", label: "Cairo (GMT+2)", offset_minutes: 120 },
    TimezoneEntry { id: "Africa/Johannesburg", label: "Johannesburg (GMT+2)", offset_minutes: 120 },
    TimezoneEntry { id: "Europe/Moscow", label: "Moscow (GMT+3)", offset_minutes: 180 },
    TimezoneEntry { id: "Asia/Dubai", label: "Dubai (GMT+4)", offset_minutes: 240 },
    TimezoneEntry { id: "Asia/Kolkata", label: "Mumbai (GMT+5:30)", offset_minutes: 330 },
    TimezoneEntry { id: "Asia/Shanghai", label: "Shanghai (GMT+8)", offset_minutes: 480 },
    TimezoneEntry { id: "Asia/Tokyo", label: "Tokyo (GMT+9)", offset_minutes: 540 },
    TimezoneEntry { id: "Asia/Seoul", label: "Seoul (GMT+9)", offset_minutes: 540 },
    TimezoneEntry { id: "Australia/Sydney", label: "Sydney (GMT+10)", offset_minutes: 600 },
    TimezoneEntry { id: "Pacific/Auckland", label: "Auckland (GMT+12)", offset_minutes: 720 },
    TimezoneEntry { id: "Pacific/Fiji", label: "Fiji (GMT+12)", offset_minutes: 720 },
    TimezoneEntry { id: "Pacific/Tongatapu", label: "Tongatapu (GMT+13)", offset_minutes: 780 },
    TimezoneEntry { id: "Pacific/Kiritimati", label: "Kiritimati (GMT+14)", offset_minutes: 840 },
];

/// Looks up a catalog entry by id.
pub fn find(timezone: &TimezoneId) -> Option<&'static TimezoneEntry> {
    CATALOG.iter().find(|entry| entry.id == timezone.as_str())
}

/// The entry a selector should show for `timezone`: the matching entry, or the
/// first catalog entry when the id is not in the catalog.
pub fn selector_entry(timezone: &TimezoneId) -> &'static TimezoneEntry {
    find(timezone).unwrap_or(&CATALOG[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn catalog_is_sorted_by_offset() {
        assert_eq!(CATALOG.len(), 30);
        assert!(CATALOG
            .windows(2)
            .all(|pair| pair[0].offset_minutes <= pair[1].offset_minutes));
    }

    #[test]
    fn every_catalog_entry_resolves() {
        let instant = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        for entry in CATALOG {
            assert!(
                TzDatabase.resolve(&entry.timezone_id(), instant).is_ok(),
                "{} did not resolve",
                entry.id
            );
        }
    }

    #[test]
    fn offsets_format_with_sign_and_padding() {
        assert_eq!(format_offset(0), "+00:00");
        assert_eq!(format_offset(330), "+05:30");
        assert_eq!(format_offset(-270), "-04:30");
        assert_eq!(format_offset(-720), "-12:00");
    }

    #[test]
    fn labels_split_into_name_and_code() {
        let mumbai = find(&TimezoneId::new("Asia/Kolkata")).unwrap();
        assert_eq!(mumbai.display_name(), "Mumbai");
        assert_eq!(mumbai.offset_code(), "GMT+5:30");

        let utc = find(&TimezoneId::utc()).unwrap();
        assert_eq!(utc.display_name(), "UTC");
        assert_eq!(utc.offset_code(), "Coordinated Universal Time");
    }

    #[test]
    fn unknown_ids_show_the_first_entry() {
        let entry = selector_entry(&TimezoneId::new("Mars/Olympus_Mons"));
        assert_eq!(entry.id, "Etc/GMT+12");
    }

    #[test]
    fn database_reresolves_dst_per_instant() {
        let new_york = TimezoneId::new("America/New_York");
        let winter = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        let summer = Utc.with_ymd_and_hms(2026, 7, 15, 12, 0, 0).unwrap();
        assert_eq!(
            TzDatabase.resolve(&new_york, winter).unwrap().local_minus_utc(),
            -5 * 3600
        );
        assert_eq!(
            TzDatabase.resolve(&new_york, summer).unwrap().local_minus_utc(),
            -4 * 3600
        );
    }

    #[test]
    fn unknown_ids_fail_to_resolve() {
        let instant = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        let bogus = TimezoneId::new("Nowhere/Special");
        assert_eq!(
            TzDatabase.resolve(&bogus, instant),
            Err(ResolveError::UnknownTimezone(bogus.clone()))
        );
        assert_eq!(
            StaticResolver::new().resolve(&bogus, instant),
            Err(ResolveError::UnknownTimezone(bogus))
        );
    }
}
