//! Demo data seeding (`servidesk seed`).
//!
//! This is the only path that writes tickets directly, bypassing the
//! lifecycle engine; it is also the only producer of Draft tickets.

use anyhow::Context;
use chrono::Utc;
use diesel::prelude::*;
use log::info;
use uuid::Uuid;

use crate::directory::normalize_role;
use crate::shared::enums::{Role, TicketPriority, TicketStatus};
use crate::shared::models::{Office, Ticket, User};
use crate::shared::schema::{offices, tickets, users};
use crate::shared::utils::DbPool;

fn make_user(username: &str, role: Role, office_id: Option<Uuid>) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        email: format!("{username}@servidesk.local"),
        role: normalize_role(role, office_id),
        office_id,
        approved: true,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

fn make_ticket(
    number: i64,
    requester: &str,
    description: &str,
    priority: TicketPriority,
    office: &Office,
    status: TicketStatus,
    supervisor_id: Option<Uuid>,
    technician_id: Option<Uuid>,
) -> Ticket {
    let now = Utc::now();
    Ticket {
        id: Uuid::new_v4(),
        ticket_number: format!("TKT-{number:06}"),
        requester_name: requester.to_string(),
        requester_office_id: Some(office.id),
        requester_office_text: office.name.clone(),
        description: description.to_string(),
        priority,
        assigned_office_id: office.id,
        supervisor_id,
        technician_id,
        equipment_code: String::new(),
        status,
        created_at: now,
        updated_at: now,
    }
}

pub fn run(pool: &DbPool) -> anyhow::Result<()> {
    let mut conn = pool.get().context("failed to get database connection")?;

    let existing: i64 = users::table.count().get_result(&mut conn)?;
    if existing > 0 {
        info!("directory already populated, skipping seed");
        return Ok(());
    }

    conn.transaction::<_, anyhow::Error, _>(|conn| {
        let now = Utc::now();
        let sistemas = Office {
            id: Uuid::new_v4(),
            name: "Sistemas".to_string(),
            description: "IT systems office".to_string(),
            supervisor_id: None,
            created_at: now,
            updated_at: now,
        };
        let soporte = Office {
            id: Uuid::new_v4(),
            name: "Soporte".to_string(),
            description: "Field support office".to_string(),
            supervisor_id: None,
            created_at: now,
            updated_at: now,
        };
        diesel::insert_into(offices::table)
            .values(vec![sistemas.clone(), soporte.clone()])
            .execute(conn)?;

        let jefe = make_user("jefe", Role::Jefe, None);
        let sup1 = make_user("sup1", Role::Supervisor, Some(sistemas.id));
        let sup2 = make_user("sup2", Role::Supervisor, Some(soporte.id));
        let tech1 = make_user("tech1", Role::Tecnico, Some(sistemas.id));
        let tech2 = make_user("tech2", Role::Tecnico, Some(soporte.id));
        let pending = User {
            approved: false,
            ..make_user("recien", Role::Unassigned, None)
        };
        diesel::insert_into(users::table)
            .values(vec![
                jefe.clone(),
                sup1.clone(),
                sup2.clone(),
                tech1.clone(),
                tech2.clone(),
                pending,
            ])
            .execute(conn)?;

        // office ↔ supervisor consistency is kept here, the one write path
        diesel::update(offices::table.find(sistemas.id))
            .set(offices::supervisor_id.eq(Some(sup1.id)))
            .execute(conn)?;
        diesel::update(offices::table.find(soporte.id))
            .set(offices::supervisor_id.eq(Some(sup2.id)))
            .execute(conn)?;

        let demo_tickets = vec![
            make_ticket(
                1,
                "Juan Pérez",
                "Workstation does not boot",
                TicketPriority::High,
                &sistemas,
                TicketStatus::Assigned,
                Some(sup1.id),
                None,
            ),
            make_ticket(
                2,
                "Ana Gómez",
                "Replace toner in the shared printer",
                TicketPriority::Low,
                &soporte,
                TicketStatus::InProgress,
                Some(sup2.id),
                Some(tech2.id),
            ),
            make_ticket(
                3,
                "Carlos Ruiz",
                "Laptop needs a new battery",
                TicketPriority::Medium,
                &sistemas,
                TicketStatus::PendingSupplies,
                Some(sup1.id),
                Some(tech1.id),
            ),
            make_ticket(
                4,
                "Lucía Torres",
                "Projector installed in meeting room",
                TicketPriority::Medium,
                &soporte,
                TicketStatus::Completed,
                Some(sup2.id),
                Some(tech2.id),
            ),
            // legacy state, unreachable through the API
            make_ticket(
                5,
                "Mesa de entrada",
                "Unfiled request from the migration backlog",
                TicketPriority::VeryLow,
                &sistemas,
                TicketStatus::Draft,
                None,
                None,
            ),
        ];
        diesel::insert_into(tickets::table)
            .values(&demo_tickets)
            .execute(conn)?;

        info!(
            "seeded {} offices, 6 users, {} tickets",
            2,
            demo_tickets.len()
        );
        Ok(())
    })
}
