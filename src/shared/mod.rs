pub mod enums;
pub mod models;
pub mod schema;
pub mod state;
pub mod utils;

pub use enums::{Role, TicketPriority, TicketStatus};
pub use models::{Evidence, Notification, Office, Ticket, TicketNote, User};
pub use state::AppState;
pub use utils::{create_conn, run_migrations, DbPool};
