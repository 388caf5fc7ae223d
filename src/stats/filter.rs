//! Lenient report filters: any value that fails to parse degrades to
//! "no filter applied" instead of erroring.

use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::shared::enums::TicketStatus;

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    /// Comma-separated status codes.
    pub status: Option<String>,
    pub office: Option<String>,
    pub tech: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct StatsFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub statuses: Option<Vec<TicketStatus>>,
    pub office_id: Option<Uuid>,
    pub technician_id: Option<Uuid>,
}

fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    value.and_then(|v| NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").ok())
}

fn parse_statuses(value: Option<&str>) -> Option<Vec<TicketStatus>> {
    let codes: Vec<TicketStatus> = value?
        .split(',')
        .filter_map(|code| code.trim().parse::<TicketStatus>().ok())
        .collect();
    if codes.is_empty() {
        None
    } else {
        Some(codes)
    }
}

impl StatsFilter {
    pub fn from_query(query: &StatsQuery) -> Self {
        Self {
            from: parse_date(query.from.as_deref()),
            to: parse_date(query.to.as_deref()),
            statuses: parse_statuses(query.status.as_deref()),
            office_id: query.office.as_deref().and_then(|v| Uuid::parse_str(v.trim()).ok()),
            technician_id: query.tech.as_deref().and_then(|v| Uuid::parse_str(v.trim()).ok()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(
        from: Option<&str>,
        to: Option<&str>,
        status: Option<&str>,
        office: Option<&str>,
        tech: Option<&str>,
    ) -> StatsQuery {
        StatsQuery {
            from: from.map(String::from),
            to: to.map(String::from),
            status: status.map(String::from),
            office: office.map(String::from),
            tech: tech.map(String::from),
        }
    }

    #[test]
    fn valid_values_parse() {
        let id = Uuid::new_v4();
        let q = query(
            Some("2025-01-01"),
            Some("2025-02-01"),
            Some("ASSIGNED,IN_PROGRESS"),
            Some(&id.to_string()),
            None,
        );
        let filter = StatsFilter::from_query(&q);
        assert_eq!(
            filter.from,
            Some(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
        );
        assert_eq!(
            filter.statuses,
            Some(vec![TicketStatus::Assigned, TicketStatus::InProgress])
        );
        assert_eq!(filter.office_id, Some(id));
    }

    #[test]
    fn garbage_degrades_to_no_filter() {
        let q = query(
            Some("not-a-date"),
            Some("01/02/2025"),
            Some("BOGUS,ALSO_BOGUS"),
            Some("42"),
            Some("xyz"),
        );
        let filter = StatsFilter::from_query(&q);
        assert_eq!(filter, StatsFilter::default());
    }

    #[test]
    fn partially_valid_status_list_keeps_the_valid_codes() {
        let q = query(None, None, Some("COMPLETED,nope"), None, None);
        let filter = StatsFilter::from_query(&q);
        assert_eq!(filter.statuses, Some(vec![TicketStatus::Completed]));
    }

    #[test]
    fn empty_query_is_no_filter() {
        let filter = StatsFilter::from_query(&StatsQuery::default());
        assert_eq!(filter, StatsFilter::default());
    }
}
