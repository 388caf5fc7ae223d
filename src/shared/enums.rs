//! Closed enum types mapped to their database representations.
//!
//! `Role` and `TicketStatus` are stored as text codes, `TicketPriority` as a
//! small integer. All of them round-trip through Diesel so model structs can
//! carry the enum instead of raw strings.

use diesel::deserialize::{self, FromSql};
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::{SmallInt, Text};
use diesel::{AsExpression, FromSqlRow};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// A user holds exactly one role; permissions derive from exhaustive matches
/// on this enum, never from independent boolean flags.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Unassigned,
    Jefe,
    Supervisor,
    Tecnico,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unassigned => "UNASSIGNED",
            Self::Jefe => "JEFE",
            Self::Supervisor => "SUPERVISOR",
            Self::Tecnico => "TECNICO",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::Unassigned
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Unassigned => "Unassigned",
            Self::Jefe => "Jefe",
            Self::Supervisor => "Supervisor",
            Self::Tecnico => "Técnico",
        };
        write!(f, "{label}")
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "UNASSIGNED" => Ok(Self::Unassigned),
            "JEFE" => Ok(Self::Jefe),
            "SUPERVISOR" => Ok(Self::Supervisor),
            "TECNICO" => Ok(Self::Tecnico),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

impl ToSql<Text, Pg> for Role {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for Role {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let value = std::str::from_utf8(bytes.as_bytes())?;
        value.parse::<Self>().map_err(Into::into)
    }
}

/// Ticket workflow states. `Completed` is terminal; `Draft` is a legacy state
/// only ever produced by seeding, never by the creation endpoint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Draft,
    Assigned,
    InProgress,
    PendingSupplies,
    Completed,
}

impl TicketStatus {
    pub const ALL: [Self; 5] = [
        Self::Draft,
        Self::Assigned,
        Self::InProgress,
        Self::PendingSupplies,
        Self::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Assigned => "ASSIGNED",
            Self::InProgress => "IN_PROGRESS",
            Self::PendingSupplies => "PENDING_SUPPLIES",
            Self::Completed => "COMPLETED",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Assigned => "Assigned",
            Self::InProgress => "In progress",
            Self::PendingSupplies => "Pending supplies",
            Self::Completed => "Completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Ok(Self::Draft),
            "ASSIGNED" => Ok(Self::Assigned),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "PENDING_SUPPLIES" => Ok(Self::PendingSupplies),
            "COMPLETED" => Ok(Self::Completed),
            _ => Err(format!("unknown ticket status: {s}")),
        }
    }
}

impl ToSql<Text, Pg> for TicketStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for TicketStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let value = std::str::from_utf8(bytes.as_bytes())?;
        value.parse::<Self>().map_err(Into::into)
    }
}

/// Ticket priority, 1 = very low through 5 = urgent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = SmallInt)]
#[serde(try_from = "i16", into = "i16")]
#[repr(i16)]
pub enum TicketPriority {
    VeryLow = 1,
    Low = 2,
    Medium = 3,
    High = 4,
    Urgent = 5,
}

impl TicketPriority {
    pub fn label(&self) -> &'static str {
        match self {
            Self::VeryLow => "Very low",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Urgent => "Urgent",
        }
    }
}

impl Default for TicketPriority {
    fn default() -> Self {
        Self::Medium
    }
}

impl std::fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl From<TicketPriority> for i16 {
    fn from(p: TicketPriority) -> Self {
        p as i16
    }
}

impl TryFrom<i16> for TicketPriority {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::VeryLow),
            2 => Ok(Self::Low),
            3 => Ok(Self::Medium),
            4 => Ok(Self::High),
            5 => Ok(Self::Urgent),
            _ => Err(format!("priority out of range: {value}")),
        }
    }
}

impl ToSql<SmallInt, Pg> for TicketPriority {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        let v = *self as i16;
        out.write_all(&v.to_be_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<SmallInt, Pg> for TicketPriority {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let value = i16::from_sql(bytes)?;
        Self::try_from(value).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_codes_round_trip() {
        for role in [Role::Unassigned, Role::Jefe, Role::Supervisor, Role::Tecnico] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn role_parse_is_case_insensitive() {
        assert_eq!("jefe".parse::<Role>().unwrap(), Role::Jefe);
        assert!("CAPATAZ".parse::<Role>().is_err());
    }

    #[test]
    fn status_codes_round_trip() {
        for status in TicketStatus::ALL {
            assert_eq!(status.as_str().parse::<TicketStatus>().unwrap(), status);
        }
    }

    #[test]
    fn only_completed_is_terminal() {
        for status in TicketStatus::ALL {
            assert_eq!(status.is_terminal(), status == TicketStatus::Completed);
        }
    }

    #[test]
    fn priority_range_is_closed() {
        assert_eq!(TicketPriority::try_from(1).unwrap(), TicketPriority::VeryLow);
        assert_eq!(TicketPriority::try_from(5).unwrap(), TicketPriority::Urgent);
        assert!(TicketPriority::try_from(0).is_err());
        assert!(TicketPriority::try_from(6).is_err());
    }

    #[test]
    fn status_serde_uses_wire_codes() {
        let json = serde_json::to_string(&TicketStatus::PendingSupplies).unwrap();
        assert_eq!(json, "\"PENDING_SUPPLIES\"");
        let back: TicketStatus = serde_json::from_str("\"IN_PROGRESS\"").unwrap();
        assert_eq!(back, TicketStatus::InProgress);
    }
}
