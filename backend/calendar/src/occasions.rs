//! Hijri occasions.

use wird_core::HijriDate;

/// Exact-date occasions keyed by (hijri month, day).
const OCCASIONS: &[((u32, u32), &str)] = &[
    ((1, 1), "🌙 رأس السنة الهجرية"),
    ((1, 10), "🕌 صيام يوم عاشوراء"),
    ((9, 1), "🌙 رمضان كريم"),
    ((9, 27), "⭐ ليلة القدر"),
    ((10, 1), "🎉 عيد الفطر المبارك"),
    // Arafah and Eid al-Adha fall in Dhu al-Hijjah (month 12), not Shawwal.
    ((12, 9), "🕋 يوم عرفة"),
    ((12, 10), "🎊 عيد الأضحى المبارك"),
];

/// Days 13, 14 and 15 of every hijri month.
pub const WHITE_DAYS: [u32; 3] = [13, 14, 15];

/// Label for today's occasion, if any. The white days take precedence over the
/// exact-date table.
pub fn check_occasion(date: &HijriDate) -> Option<String> {
    if WHITE_DAYS.contains(&date.day) {
        return Some(format!(
            "⚪ صيام الأيام البيض ({} {})",
            date.day, date.month_name
        ));
    }
    OCCASIONS
        .iter()
        .find(|(key, _)| *key == (date.month, date.day))
        .map(|(_, label)| label.to_string())
}

pub fn is_day_before_white_days(date: &HijriDate) -> bool {
    date.day == 12
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(month: u32, day: u32) -> HijriDate {
        HijriDate {
            day,
            month,
            month_name: "شعبان".into(),
            year: "1447".into(),
        }
    }

    #[test]
    fn white_days_label_includes_day_and_month() {
        for day in WHITE_DAYS {
            let label = check_occasion(&date(8, day)).unwrap();
            assert!(label.contains(&format!("({day} شعبان)")), "{label}");
        }
        assert_eq!(check_occasion(&date(8, 16)), None);
    }

    #[test]
    fn exact_table_lookup() {
        assert_eq!(check_occasion(&date(1, 10)).as_deref(), Some("🕌 صيام يوم عاشوراء"));
        assert_eq!(check_occasion(&date(12, 9)).as_deref(), Some("🕋 يوم عرفة"));
        assert_eq!(check_occasion(&date(12, 10)).as_deref(), Some("🎊 عيد الأضحى المبارك"));
        assert_eq!(check_occasion(&date(10, 9)), None);
        assert_eq!(check_occasion(&date(10, 10)), None);
        assert_eq!(check_occasion(&date(3, 1)), None);
    }

    #[test]
    fn eve_of_white_days_is_day_twelve_only() {
        for day in 1..=30 {
            assert_eq!(is_day_before_white_days(&date(5, day)), day == 12);
        }
    }
}
