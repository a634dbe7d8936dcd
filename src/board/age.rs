use chrono::{DateTime, Utc};

/// Format how long ago `created` was, e.g. "3d", "2w", "5mo".
pub fn format_age(created: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days = (now - created).num_days().max(0) as u64;
    if days == 0 {
        "new".to_string()
    } else if days < 14 {
        format!("{days}d")
    } else if days < 60 {
        format!("{}w", days / 7)
    } else if days < 730 {
        format!("{}mo", days / 30)
    } else {
        format!("{}y", days / 365)
    }
}

/// `format_age` for optional timestamps; unknown dates render as "-".
pub fn format_age_opt(created: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    created.map_or_else(|| "-".to_string(), |c| format_age(c, now))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ts: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc)
    }

    const NOW: &str = "2024-11-20T09:30:00Z";

    #[test]
    fn same_day_is_new() {
        assert_eq!(format_age(at("2024-11-20T01:00:00Z"), at(NOW)), "new");
        assert_eq!(format_age(at("2024-11-19T10:00:00Z"), at(NOW)), "new");
    }

    #[test]
    fn picks_unit_by_span() {
        let now = at(NOW);
        assert_eq!(format_age(at("2024-11-15T09:30:00Z"), now), "5d");
        assert_eq!(format_age(at("2024-10-30T09:30:00Z"), now), "3w");
        assert_eq!(format_age(at("2024-05-20T09:30:00Z"), now), "6mo");
        assert_eq!(format_age(at("2021-11-01T09:30:00Z"), now), "3y");
    }

    #[test]
    fn unit_changes_at_two_weeks_and_sixty_days() {
        let now = at(NOW);
        assert_eq!(format_age(at("2024-11-07T09:30:00Z"), now), "13d");
        assert_eq!(format_age(at("2024-11-06T09:30:00Z"), now), "2w");
        assert_eq!(format_age(at("2024-09-22T09:30:00Z"), now), "8w");
        assert_eq!(format_age(at("2024-09-21T09:30:00Z"), now), "2mo");
    }

    #[test]
    fn clock_skew_reads_as_new() {
        // Server timestamps can run slightly ahead of the local clock
        assert_eq!(format_age(at("2024-11-20T09:31:00Z"), at(NOW)), "new");
    }

    #[test]
    fn missing_date_is_a_dash() {
        assert_eq!(format_age_opt(None, at(NOW)), "-");
        assert_eq!(format_age_opt(Some(at("2024-11-13T09:30:00Z")), at(NOW)), "7d");
    }
}
