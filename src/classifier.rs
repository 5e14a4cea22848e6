use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};

/// Age below which a domain counts as recently registered.
pub const RECENT_REGISTRATION_MONTHS: u32 = 6;

/// `now` minus six calendar months, time of day preserved.
///
/// A day past the end of the target month rolls over into the next one
/// (2024-08-31 gives "2024-02-31", which is 2024-03-02).
pub fn six_months_before(now: DateTime<Utc>) -> DateTime<Utc> {
    months_before(now, RECENT_REGISTRATION_MONTHS).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn months_before(now: DateTime<Utc>, months: u32) -> Option<DateTime<Utc>> {
    let total = now.year() * 12 + now.month0() as i32 - months as i32;
    let first_of_month = NaiveDate::from_ymd_opt(total.div_euclid(12), total.rem_euclid(12) as u32 + 1, 1)?;
    let date = first_of_month.checked_add_days(Days::new(u64::from(now.day0())))?;

    Some(date.and_time(now.time()).and_utc())
}

/// True when `created` is strictly after the six-month cutoff.
pub fn is_recently_registered(created: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    created > six_months_before(now)
}
