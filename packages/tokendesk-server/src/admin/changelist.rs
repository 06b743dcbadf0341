//! Changelist query parameters: search, list filters, ordering and paging.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::Deserialize;

use crate::admin::config::{ApiTokenAdmin, ModelAdmin};

/// Query string of `/admin/tokens/`. Everything arrives as text and unknown
/// values are ignored rather than rejected.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ChangeListQuery {
    pub q: Option<String>,
    pub is_active: Option<String>,
    pub expires_at: Option<String>,
    pub created_at: Option<String>,
    pub o: Option<String>,
    pub p: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DateFilter {
    Today,
    Past7Days,
    ThisMonth,
    ThisYear,
    NoDate,
    HasDate,
}

impl DateFilter {
    pub(crate) const BOUNDED: [DateFilter; 4] = [
        DateFilter::Today,
        DateFilter::Past7Days,
        DateFilter::ThisMonth,
        DateFilter::ThisYear,
    ];

    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value {
            "today" => Some(Self::Today),
            "past_7_days" => Some(Self::Past7Days),
            "this_month" => Some(Self::ThisMonth),
            "this_year" => Some(Self::ThisYear),
            "no_date" => Some(Self::NoDate),
            "has_date" => Some(Self::HasDate),
            _ => None,
        }
    }

    pub(crate) fn as_param(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Past7Days => "past_7_days",
            Self::ThisMonth => "this_month",
            Self::ThisYear => "this_year",
            Self::NoDate => "no_date",
            Self::HasDate => "has_date",
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Past7Days => "Past 7 days",
            Self::ThisMonth => "This month",
            Self::ThisYear => "This year",
            Self::NoDate => "No date",
            Self::HasDate => "Has date",
        }
    }

    /// Half-open `[start, end)` range in UTC; `None` for the null checks.
    pub(crate) fn range(self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let today = now.date_naive();
        let tomorrow = today.succ_opt()?;
        let (start, end) = match self {
            Self::Today => (today, tomorrow),
            Self::Past7Days => (today - Duration::days(7), tomorrow),
            Self::ThisMonth => {
                let first = NaiveDate::from_ymd_opt(today.year(), today.month(), 1)?;
                let next = if today.month() == 12 {
                    NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)?
                } else {
                    NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)?
                };
                (first, next)
            }
            Self::ThisYear => (
                NaiveDate::from_ymd_opt(today.year(), 1, 1)?,
                NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)?,
            ),
            Self::NoDate | Self::HasDate => return None,
        };
        Some((midnight(start)?, midnight(end)?))
    }
}

fn midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ordering {
    pub field: &'static str,
    pub descending: bool,
}

impl Ordering {
    pub(crate) fn as_param(&self) -> String {
        if self.descending {
            format!("-{}", self.field)
        } else {
            self.field.to_string()
        }
    }
}

impl ChangeListQuery {
    pub(crate) fn search_terms(&self) -> Vec<&str> {
        self.q
            .as_deref()
            .map(|q| q.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub(crate) fn active_filter(&self) -> Option<bool> {
        match self.is_active.as_deref() {
            Some("1") => Some(true),
            Some("0") => Some(false),
            _ => None,
        }
    }

    pub(crate) fn expires_filter(&self) -> Option<DateFilter> {
        self.expires_at.as_deref().and_then(DateFilter::parse)
    }

    /// created_at is never null, so only the bounded choices apply.
    pub(crate) fn created_filter(&self) -> Option<DateFilter> {
        self.created_at
            .as_deref()
            .and_then(DateFilter::parse)
            .filter(|filter| DateFilter::BOUNDED.contains(filter))
    }

    pub(crate) fn ordering(&self) -> Ordering {
        let admin = ApiTokenAdmin;
        self.o
            .as_deref()
            .and_then(|raw| parse_ordering(raw, admin.sortable_fields()))
            .or_else(|| parse_ordering(admin.ordering(), admin.sortable_fields()))
            .unwrap_or(Ordering {
                field: "created_at",
                descending: true,
            })
    }

    /// Zero-based page index; anything that is not a number means the first page.
    pub(crate) fn page(&self) -> u64 {
        self.p
            .as_deref()
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Query string for a link that replaces `key` (or drops it with `None`).
    /// Any change other than paging resets to the first page.
    pub(crate) fn link_with(&self, key: &str, value: Option<&str>) -> String {
        let mut pairs: Vec<(&str, String)> = Vec::new();
        let current = [
            ("q", self.q.clone()),
            ("is_active", self.is_active.clone()),
            ("expires_at", self.expires_at.clone()),
            ("created_at", self.created_at.clone()),
            ("o", self.o.clone()),
            ("p", self.p.clone()),
        ];
        for (name, existing) in current {
            if name == key || (name == "p" && key != "p") {
                continue;
            }
            if let Some(existing) = existing.filter(|v| !v.is_empty()) {
                pairs.push((name, existing));
            }
        }
        if let Some(value) = value {
            pairs.push((key, value.to_string()));
        }

        if pairs.is_empty() {
            return "?".to_string();
        }
        let encoded: Vec<String> = pairs
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(&v)))
            .collect();
        format!("?{}", encoded.join("&"))
    }
}

fn parse_ordering(raw: &str, sortable: &[&'static str]) -> Option<Ordering> {
    let (descending, name) = match raw.strip_prefix('-') {
        Some(name) => (true, name),
        None => (false, raw),
    };
    sortable
        .iter()
        .find(|field| **field == name)
        .map(|field| Ordering {
            field: *field,
            descending,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 30, 0).unwrap()
    }

    #[test]
    fn search_terms_split_on_whitespace() {
        let query = ChangeListQuery {
            q: Some("  alice   mobile ".to_string()),
            ..Default::default()
        };
        assert_eq!(query.search_terms(), vec!["alice", "mobile"]);
        assert!(ChangeListQuery::default().search_terms().is_empty());
    }

    #[test]
    fn unknown_filter_values_are_ignored() {
        let query = ChangeListQuery {
            is_active: Some("maybe".to_string()),
            expires_at: Some("tomorrow".to_string()),
            created_at: Some("no_date".to_string()),
            ..Default::default()
        };
        assert_eq!(query.active_filter(), None);
        assert_eq!(query.expires_filter(), None);
        assert_eq!(query.created_filter(), None);
    }

    #[test]
    fn ordering_defaults_to_newest_first() {
        let ordering = ChangeListQuery::default().ordering();
        assert_eq!(ordering.field, "created_at");
        assert!(ordering.descending);

        let bogus = ChangeListQuery {
            o: Some("-token".to_string()),
            ..Default::default()
        };
        assert_eq!(bogus.ordering(), ordering);
    }

    #[test]
    fn ordering_accepts_sortable_columns() {
        let query = ChangeListQuery {
            o: Some("-name".to_string()),
            ..Default::default()
        };
        let ordering = query.ordering();
        assert_eq!(ordering.field, "name");
        assert!(ordering.descending);
        assert_eq!(ordering.as_param(), "-name");
    }

    #[test]
    fn month_range_rolls_over_december() {
        let (start, end) = DateFilter::ThisMonth.range(at(2025, 12, 14, 9)).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn past_seven_days_includes_today() {
        let now = at(2025, 3, 10, 15);
        let (start, end) = DateFilter::Past7Days.range(now).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 3, 3, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 3, 11, 0, 0, 0).unwrap());
        assert!(DateFilter::NoDate.range(now).is_none());
    }

    #[test]
    fn links_reset_paging_and_encode_values() {
        let query = ChangeListQuery {
            q: Some("a b".to_string()),
            p: Some("3".to_string()),
            ..Default::default()
        };
        assert_eq!(query.link_with("is_active", Some("1")), "?q=a%20b&is_active=1");
        assert_eq!(query.link_with("p", Some("4")), "?q=a%20b&p=4");
        assert_eq!(ChangeListQuery::default().link_with("q", None), "?");
    }

    #[test]
    fn malformed_page_falls_back_to_first() {
        for raw in ["abc", "-1", "", "1.5"] {
            let query = ChangeListQuery {
                p: Some(raw.to_string()),
                ..Default::default()
            };
            assert_eq!(query.page(), 0, "{raw:?}");
        }
        let query = ChangeListQuery {
            p: Some(" 2 ".to_string()),
            ..Default::default()
        };
        assert_eq!(query.page(), 2);
    }
}
