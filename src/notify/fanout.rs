//! Recipient planning and wire payloads for lifecycle events.
//!
//! Planning is pure: callers pass the directory rows they already hold and
//! get back the notification rows to insert. Emission to the live channel
//! happens separately, after the transaction has committed.

use uuid::Uuid;

use crate::notify::broadcaster::Broadcaster;
use crate::shared::enums::Role;
use crate::shared::models::{Notification, Office, Ticket, User};

/// Notification text column width.
pub const MAX_NOTICE_LEN: usize = 255;

/// A notification row waiting to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedNotice {
    pub recipient_id: Uuid,
    pub text: String,
}

/// Character-safe prefix of `text`, at most `max` characters.
pub fn excerpt(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    text.chars().take(max).collect()
}

fn clamp(text: String) -> String {
    excerpt(&text, MAX_NOTICE_LEN)
}

/// Whether the office supervisor gets their own copy: present, and not
/// already covered by the Jefe-wide delivery.
fn supervisor_copy(supervisor: Option<&User>) -> Option<&User> {
    supervisor.filter(|s| s.role != Role::Jefe)
}

/// Ticket created: every active Jefe, plus the office supervisor when the
/// supervisor is not themself a Jefe.
pub fn creation_notices(
    ticket: &Ticket,
    office: &Office,
    active_jefes: &[User],
    supervisor: Option<&User>,
) -> Vec<PlannedNotice> {
    let mut notices: Vec<PlannedNotice> = active_jefes
        .iter()
        .map(|jefe| PlannedNotice {
            recipient_id: jefe.id,
            text: clamp(format!(
                "New ticket {}: {} requests service in {}",
                ticket.ticket_number, ticket.requester_name, office.name
            )),
        })
        .collect();
    if let Some(supervisor) = supervisor_copy(supervisor) {
        notices.push(PlannedNotice {
            recipient_id: supervisor.id,
            text: clamp(format!(
                "New ticket assigned to your office {}: {}",
                ticket.ticket_number, ticket.requester_name
            )),
        });
    }
    notices
}

/// Transition to pending-supplies: every active Jefe and the office
/// supervisor (if distinct), message carrying the supply-request note.
pub fn supplies_notices(
    ticket: &Ticket,
    office: &Office,
    active_jefes: &[User],
    supervisor: Option<&User>,
    technician_name: &str,
    note: &str,
) -> Vec<PlannedNotice> {
    let mut notices: Vec<PlannedNotice> = active_jefes
        .iter()
        .map(|jefe| PlannedNotice {
            recipient_id: jefe.id,
            text: clamp(format!(
                "Supplies requested for ticket {}: {} ({}) - {}",
                ticket.ticket_number, ticket.requester_name, office.name, note
            )),
        })
        .collect();
    if let Some(supervisor) = supervisor_copy(supervisor) {
        notices.push(PlannedNotice {
            recipient_id: supervisor.id,
            text: clamp(format!(
                "Your technician {} needs supplies for ticket {}: {}",
                technician_name, ticket.ticket_number, note
            )),
        });
    }
    notices
}

/// Technician (or self-assigning supervisor) just got the ticket.
pub fn assignment_notice(ticket: &Ticket, assignee: &User) -> PlannedNotice {
    PlannedNotice {
        recipient_id: assignee.id,
        text: clamp(format!(
            "New ticket assigned {}: {}",
            ticket.ticket_number,
            excerpt(&ticket.description, 80)
        )),
    }
}

/// Body of the best-effort assignment email.
pub fn assignment_email(ticket: &Ticket, assignee: &User) -> (String, String) {
    let subject = format!("New ticket assigned {}", ticket.ticket_number);
    let body = format!(
        "Hello {},\n\nTicket {} has been assigned to you.\nDescription: {}\nPriority: {}\nStatus: {}\n",
        assignee.username,
        ticket.ticket_number,
        ticket.description,
        ticket.priority,
        ticket.status
    );
    (subject, body)
}

/// Topics interested in a ticket change: all Jefes, the assigned office, and
/// the assigned technician when present.
pub fn ticket_topics(ticket: &Ticket) -> Vec<String> {
    let mut topics = vec!["stats_jefes".to_string()];
    topics.push(format!("stats_office_{}", ticket.assigned_office_id));
    if let Some(technician_id) = ticket.technician_id {
        topics.push(format!("stats_tech_{technician_id}"));
    }
    topics
}

pub fn ticket_event(ticket: &Ticket) -> serde_json::Value {
    serde_json::json!({
        "event": "ticket_update",
        "ticket_id": ticket.id,
        "status": ticket.status,
        "assigned_office_id": ticket.assigned_office_id,
        "technician_id": ticket.technician_id,
        "supervisor_id": ticket.supervisor_id,
    })
}

pub fn notification_event(notification: &Notification) -> serde_json::Value {
    serde_json::json!({
        "event": "notification_update",
        "notification_id": notification.id,
        "ticket_id": notification.ticket_id,
        "text": notification.text,
        "created_at": notification.created_at.to_rfc3339(),
    })
}

/// Publish the ticket-changed event to every interested topic.
pub fn broadcast_ticket_change(broadcaster: &dyn Broadcaster, ticket: &Ticket) {
    let payload = ticket_event(ticket);
    for topic in ticket_topics(ticket) {
        broadcaster.publish(&topic, payload.clone());
    }
}

/// Publish a stored notification to its recipient's personal topic.
pub fn broadcast_notification(broadcaster: &dyn Broadcaster, notification: &Notification) {
    broadcaster.publish(
        &format!("user_{}", notification.recipient_id),
        notification_event(notification),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::enums::{TicketPriority, TicketStatus};
    use chrono::Utc;

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            username: "someone".to_string(),
            email: String::new(),
            role,
            office_id: None,
            approved: true,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn office() -> Office {
        Office {
            id: Uuid::new_v4(),
            name: "Sistemas".to_string(),
            description: String::new(),
            supervisor_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn ticket(office_id: Uuid) -> Ticket {
        Ticket {
            id: Uuid::new_v4(),
            ticket_number: "TKT-000042".to_string(),
            requester_name: "Juan".to_string(),
            requester_office_id: None,
            requester_office_text: String::new(),
            description: "Fix the PC".to_string(),
            priority: TicketPriority::Medium,
            assigned_office_id: office_id,
            supervisor_id: None,
            technician_id: None,
            equipment_code: String::new(),
            status: TicketStatus::Assigned,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn creation_notifies_every_jefe_and_the_supervisor() {
        let office = office();
        let ticket = ticket(office.id);
        let jefes = vec![user(Role::Jefe), user(Role::Jefe)];
        let supervisor = user(Role::Supervisor);

        let notices = creation_notices(&ticket, &office, &jefes, Some(&supervisor));
        assert_eq!(notices.len(), 3);
        assert_eq!(notices[0].recipient_id, jefes[0].id);
        assert_eq!(notices[2].recipient_id, supervisor.id);
        assert!(notices[0].text.contains("TKT-000042"));
        assert!(notices[0].text.contains("Sistemas"));
    }

    #[test]
    fn supervisor_who_is_jefe_gets_no_duplicate() {
        let office = office();
        let ticket = ticket(office.id);
        let jefe_supervisor = user(Role::Jefe);
        let jefes = vec![jefe_supervisor.clone()];

        let notices = creation_notices(&ticket, &office, &jefes, Some(&jefe_supervisor));
        assert_eq!(notices.len(), 1);
    }

    #[test]
    fn missing_supervisor_skips_the_office_copy() {
        let office = office();
        let ticket = ticket(office.id);
        let notices = creation_notices(&ticket, &office, &[user(Role::Jefe)], None);
        assert_eq!(notices.len(), 1);
    }

    #[test]
    fn supplies_notices_carry_the_note_text() {
        let office = office();
        let ticket = ticket(office.id);
        let jefes = vec![user(Role::Jefe)];
        let supervisor = user(Role::Supervisor);

        let notices =
            supplies_notices(&ticket, &office, &jefes, Some(&supervisor), "tech1", "need RAM");
        assert_eq!(notices.len(), 2);
        assert!(notices.iter().all(|n| n.text.contains("need RAM")));
        assert!(notices[1].text.contains("tech1"));
    }

    #[test]
    fn assignment_notice_excerpts_the_description() {
        let office = office();
        let mut t = ticket(office.id);
        t.description = "x".repeat(200);
        let tech = user(Role::Tecnico);

        let notice = assignment_notice(&t, &tech);
        assert_eq!(notice.recipient_id, tech.id);
        assert!(notice.text.len() < 130);
    }

    #[test]
    fn notices_never_exceed_the_column_width() {
        let office = office();
        let mut t = ticket(office.id);
        t.requester_name = "y".repeat(300);
        let notices = creation_notices(&t, &office, &[user(Role::Jefe)], None);
        assert!(notices[0].text.chars().count() <= MAX_NOTICE_LEN);
    }

    #[test]
    fn topics_cover_jefes_office_and_technician() {
        let office = office();
        let mut t = ticket(office.id);
        let tech_id = Uuid::new_v4();
        t.technician_id = Some(tech_id);

        let topics = ticket_topics(&t);
        assert_eq!(topics[0], "stats_jefes");
        assert_eq!(topics[1], format!("stats_office_{}", office.id));
        assert_eq!(topics[2], format!("stats_tech_{tech_id}"));
    }

    #[test]
    fn unassigned_ticket_has_no_technician_topic() {
        let office = office();
        let topics = ticket_topics(&ticket(office.id));
        assert_eq!(topics.len(), 2);
    }

    #[test]
    fn ticket_event_matches_the_wire_shape() {
        let office = office();
        let t = ticket(office.id);
        let event = ticket_event(&t);
        assert_eq!(event["event"], "ticket_update");
        assert_eq!(event["status"], "ASSIGNED");
        assert_eq!(event["ticket_id"], serde_json::json!(t.id));
        assert!(event["technician_id"].is_null());
    }

    #[test]
    fn excerpt_respects_multibyte_boundaries() {
        assert_eq!(excerpt("áéíóú", 3), "áéí");
        assert_eq!(excerpt("short", 80), "short");
    }
}
