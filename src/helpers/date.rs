//! Date helper functions

use anyhow::Result;
use chrono::{DateTime, Locale, Utc};
use chrono_tz::Tz;

use crate::config::SiteConfig;

/// Day, abbreviated month, four-digit year (`25 mar 2021`)
const SHORT_DATE: &str = "%d %b %Y";

/// Formats publication dates in one fixed locale and timezone
#[derive(Debug, Clone)]
pub struct DateFormatter {
    locale: Locale,
    tz: Tz,
    unpublished: String,
}

impl DateFormatter {
    pub fn new(locale: Locale, tz: Tz, unpublished: impl Into<String>) -> Self {
        Self {
            locale,
            tz,
            unpublished: unpublished.into(),
        }
    }

    /// Build from the site's `language`, `timezone` and unpublished label
    pub fn from_config(config: &SiteConfig) -> Result<Self> {
        Ok(Self::new(
            config.locale()?,
            config.tz()?,
            config.labels.unpublished.clone(),
        ))
    }

    /// Short display date, or the unpublished label when there is no date
    pub fn format(&self, date: Option<&DateTime<Utc>>) -> String {
        match date {
            Some(date) => date
                .with_timezone(&self.tz)
                .format_localized(SHORT_DATE, self.locale)
                .to_string(),
            None => self.unpublished.clone(),
        }
    }

    /// Value for a `<time datetime="...">` attribute
    pub fn datetime_attr(&self, date: Option<&DateTime<Utc>>) -> Option<String> {
        date.map(|d| {
            d.with_timezone(&self.tz)
                .format("%Y-%m-%dT%H:%M:%S%:z")
                .to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn pt_br() -> DateFormatter {
        DateFormatter::new(Locale::pt_BR, chrono_tz::UTC, "Não publicado")
    }

    #[test]
    fn test_format_pt_br() {
        let date = Utc.with_ymd_and_hms(2021, 3, 25, 0, 0, 0).unwrap();
        assert_eq!(pt_br().format(Some(&date)), "25 mar 2021");

        let date = Utc.with_ymd_and_hms(2021, 2, 5, 12, 0, 0).unwrap();
        assert_eq!(pt_br().format(Some(&date)), "05 fev 2021");
    }

    #[test]
    fn test_format_other_locale() {
        let formatter = DateFormatter::new(Locale::en_US, chrono_tz::UTC, "Unpublished");
        let date = Utc.with_ymd_and_hms(2021, 3, 25, 0, 0, 0).unwrap();
        assert_eq!(formatter.format(Some(&date)), "25 Mar 2021");
    }

    #[test]
    fn test_timezone_shifts_day() {
        let formatter = DateFormatter::new(
            Locale::pt_BR,
            chrono_tz::America::Sao_Paulo,
            "Não publicado",
        );
        let date = Utc.with_ymd_and_hms(2021, 3, 25, 0, 0, 0).unwrap();
        assert_eq!(formatter.format(Some(&date)), "24 mar 2021");
        assert_eq!(
            formatter.datetime_attr(Some(&date)).as_deref(),
            Some("2021-03-24T21:00:00-03:00")
        );
    }

    #[test]
    fn test_unpublished() {
        assert_eq!(pt_br().format(None), "Não publicado");
        assert_eq!(pt_br().datetime_attr(None), None);
    }

    #[test]
    fn test_from_config() {
        let config = SiteConfig::default();
        let formatter = DateFormatter::from_config(&config).unwrap();
        let date = Utc.with_ymd_and_hms(2021, 3, 25, 0, 0, 0).unwrap();
        assert_eq!(formatter.format(Some(&date)), "25 mar 2021");
    }
}
