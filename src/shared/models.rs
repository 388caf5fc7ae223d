use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{Role, TicketPriority, TicketStatus};
use super::schema::{evidences, notifications, offices, ticket_notes, tickets, users};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Insertable, Selectable)]
#[diesel(table_name = offices)]
pub struct Office {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub supervisor_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Insertable, Selectable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub office_id: Option<Uuid>,
    pub approved: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Insertable, Selectable)]
#[diesel(table_name = tickets)]
pub struct Ticket {
    pub id: Uuid,
    pub ticket_number: String,
    pub requester_name: String,
    pub requester_office_id: Option<Uuid>,
    pub requester_office_text: String,
    pub description: String,
    pub priority: TicketPriority,
    pub assigned_office_id: Uuid,
    pub supervisor_id: Option<Uuid>,
    pub technician_id: Option<Uuid>,
    pub equipment_code: String,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Insertable, Selectable)]
#[diesel(table_name = ticket_notes)]
pub struct TicketNote {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub author_id: Option<Uuid>,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Insertable, Selectable)]
#[diesel(table_name = evidences)]
pub struct Evidence {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub image_path: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Insertable, Selectable)]
#[diesel(table_name = notifications)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub ticket_id: Option<Uuid>,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}
