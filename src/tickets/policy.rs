//! Role-scoped authorization over ticket operations.
//!
//! Pure predicates; the lifecycle engine consults them before touching
//! storage. Every rule matches exhaustively on `Role`.

use crate::shared::enums::{Role, TicketStatus};
use crate::shared::models::{Ticket, User};

/// Operations an actor can attempt against a single ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    AssignTechnician,
    UpdateStatus(TicketStatus),
    AddNote,
    AddEvidence,
    ViewDetail,
    Delete,
}

/// Statuses the assigned technician may drive a ticket to.
pub fn technician_targets() -> [TicketStatus; 3] {
    [
        TicketStatus::InProgress,
        TicketStatus::PendingSupplies,
        TicketStatus::Completed,
    ]
}

pub fn is_ticket_technician(actor: &User, ticket: &Ticket) -> bool {
    ticket.technician_id == Some(actor.id)
}

pub fn is_ticket_supervisor(actor: &User, ticket: &Ticket) -> bool {
    ticket.supervisor_id == Some(actor.id)
}

/// Supervisor of the office the ticket is assigned to.
pub fn supervises_office(actor: &User, ticket: &Ticket) -> bool {
    match actor.role {
        Role::Supervisor => actor.office_id == Some(ticket.assigned_office_id),
        Role::Jefe | Role::Tecnico | Role::Unassigned => false,
    }
}

/// The full predicate: `true` iff `actor` may perform `operation`.
/// `ticket` is `None` only for `Create`.
pub fn can_perform(actor: &User, operation: Operation, ticket: Option<&Ticket>) -> bool {
    match operation {
        Operation::Create => matches!(actor.role, Role::Jefe),
        Operation::AssignTechnician => {
            let Some(ticket) = ticket else { return false };
            supervises_office(actor, ticket) && !ticket.status.is_terminal()
        }
        Operation::UpdateStatus(target) => {
            let Some(ticket) = ticket else { return false };
            is_ticket_technician(actor, ticket)
                && !ticket.status.is_terminal()
                && technician_targets().contains(&target)
        }
        // Jefe is deliberately excluded from note and evidence authorship.
        Operation::AddNote | Operation::AddEvidence => {
            let Some(ticket) = ticket else { return false };
            is_ticket_technician(actor, ticket)
                || is_ticket_supervisor(actor, ticket)
                || supervises_office(actor, ticket)
        }
        Operation::ViewDetail => {
            let Some(ticket) = ticket else { return false };
            match actor.role {
                Role::Jefe => true,
                Role::Supervisor => {
                    supervises_office(actor, ticket)
                        || is_ticket_technician(actor, ticket)
                        || is_ticket_supervisor(actor, ticket)
                }
                Role::Tecnico | Role::Unassigned => {
                    is_ticket_technician(actor, ticket) || is_ticket_supervisor(actor, ticket)
                }
            }
        }
        Operation::Delete => matches!(actor.role, Role::Jefe),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::enums::TicketPriority;
    use chrono::Utc;
    use uuid::Uuid;

    fn user(role: Role, office_id: Option<Uuid>) -> User {
        User {
            id: Uuid::new_v4(),
            username: "u".to_string(),
            email: String::new(),
            role,
            office_id,
            approved: true,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn ticket(office_id: Uuid, status: TicketStatus) -> Ticket {
        Ticket {
            id: Uuid::new_v4(),
            ticket_number: "TKT-000001".to_string(),
            requester_name: "Juan".to_string(),
            requester_office_id: None,
            requester_office_text: String::new(),
            description: "desc".to_string(),
            priority: TicketPriority::Medium,
            assigned_office_id: office_id,
            supervisor_id: None,
            technician_id: None,
            equipment_code: String::new(),
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn only_jefe_creates() {
        let office = Uuid::new_v4();
        assert!(can_perform(&user(Role::Jefe, None), Operation::Create, None));
        for role in [Role::Supervisor, Role::Tecnico, Role::Unassigned] {
            assert!(!can_perform(&user(role, Some(office)), Operation::Create, None));
        }
    }

    #[test]
    fn assignment_is_office_scoped() {
        let office = Uuid::new_v4();
        let other_office = Uuid::new_v4();
        let t = ticket(office, TicketStatus::Assigned);

        let own = user(Role::Supervisor, Some(office));
        let foreign = user(Role::Supervisor, Some(other_office));
        let jefe = user(Role::Jefe, None);

        assert!(can_perform(&own, Operation::AssignTechnician, Some(&t)));
        assert!(!can_perform(&foreign, Operation::AssignTechnician, Some(&t)));
        assert!(!can_perform(&jefe, Operation::AssignTechnician, Some(&t)));
    }

    #[test]
    fn completed_tickets_reject_assignment() {
        let office = Uuid::new_v4();
        let t = ticket(office, TicketStatus::Completed);
        let supervisor = user(Role::Supervisor, Some(office));
        assert!(!can_perform(&supervisor, Operation::AssignTechnician, Some(&t)));
    }

    #[test]
    fn only_the_assigned_technician_updates_status() {
        let office = Uuid::new_v4();
        let tech = user(Role::Tecnico, Some(office));
        let other = user(Role::Tecnico, Some(office));
        let mut t = ticket(office, TicketStatus::InProgress);
        t.technician_id = Some(tech.id);

        let op = Operation::UpdateStatus(TicketStatus::Completed);
        assert!(can_perform(&tech, op, Some(&t)));
        assert!(!can_perform(&other, op, Some(&t)));
    }

    #[test]
    fn self_assigned_supervisor_counts_as_technician() {
        let office = Uuid::new_v4();
        let supervisor = user(Role::Supervisor, Some(office));
        let mut t = ticket(office, TicketStatus::InProgress);
        t.technician_id = Some(supervisor.id);

        assert!(can_perform(
            &supervisor,
            Operation::UpdateStatus(TicketStatus::PendingSupplies),
            Some(&t)
        ));
    }

    #[test]
    fn technician_cannot_target_draft_or_assigned() {
        let office = Uuid::new_v4();
        let tech = user(Role::Tecnico, Some(office));
        let mut t = ticket(office, TicketStatus::InProgress);
        t.technician_id = Some(tech.id);

        assert!(!can_perform(&tech, Operation::UpdateStatus(TicketStatus::Draft), Some(&t)));
        assert!(!can_perform(
            &tech,
            Operation::UpdateStatus(TicketStatus::Assigned),
            Some(&t)
        ));
    }

    #[test]
    fn jefe_is_excluded_from_notes_and_evidence() {
        let office = Uuid::new_v4();
        let jefe = user(Role::Jefe, None);
        let t = ticket(office, TicketStatus::InProgress);

        assert!(!can_perform(&jefe, Operation::AddNote, Some(&t)));
        assert!(!can_perform(&jefe, Operation::AddEvidence, Some(&t)));
    }

    #[test]
    fn office_supervisor_and_participants_may_annotate() {
        let office = Uuid::new_v4();
        let t_supervisor = user(Role::Supervisor, Some(office));
        let tech = user(Role::Tecnico, Some(office));
        let ticket_supervisor = user(Role::Supervisor, Some(Uuid::new_v4()));
        let stranger = user(Role::Tecnico, Some(office));

        let mut t = ticket(office, TicketStatus::InProgress);
        t.technician_id = Some(tech.id);
        t.supervisor_id = Some(ticket_supervisor.id);

        assert!(can_perform(&tech, Operation::AddNote, Some(&t)));
        assert!(can_perform(&t_supervisor, Operation::AddNote, Some(&t)));
        assert!(can_perform(&ticket_supervisor, Operation::AddEvidence, Some(&t)));
        assert!(!can_perform(&stranger, Operation::AddNote, Some(&t)));
    }

    #[test]
    fn view_detail_scoping() {
        let office = Uuid::new_v4();
        let jefe = user(Role::Jefe, None);
        let own_supervisor = user(Role::Supervisor, Some(office));
        let foreign_supervisor = user(Role::Supervisor, Some(Uuid::new_v4()));
        let tech = user(Role::Tecnico, Some(office));
        let stranger = user(Role::Tecnico, Some(office));

        let mut t = ticket(office, TicketStatus::InProgress);
        t.technician_id = Some(tech.id);

        assert!(can_perform(&jefe, Operation::ViewDetail, Some(&t)));
        assert!(can_perform(&own_supervisor, Operation::ViewDetail, Some(&t)));
        assert!(!can_perform(&foreign_supervisor, Operation::ViewDetail, Some(&t)));
        assert!(can_perform(&tech, Operation::ViewDetail, Some(&t)));
        assert!(!can_perform(&stranger, Operation::ViewDetail, Some(&t)));
    }

    #[test]
    fn only_jefe_deletes() {
        let office = Uuid::new_v4();
        let t = ticket(office, TicketStatus::Assigned);
        assert!(can_perform(&user(Role::Jefe, None), Operation::Delete, Some(&t)));
        assert!(!can_perform(
            &user(Role::Supervisor, Some(office)),
            Operation::Delete,
            Some(&t)
        ));
    }
}
