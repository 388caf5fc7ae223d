diesel::table! {
    offices (id) {
        id -> Uuid,
        name -> Text,
        description -> Text,
        supervisor_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    users (id) {
        id -> Uuid,
        username -> Text,
        email -> Text,
        role -> Text,
        office_id -> Nullable<Uuid>,
        approved -> Bool,
        is_active -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    tickets (id) {
        id -> Uuid,
        ticket_number -> Text,
        requester_name -> Text,
        requester_office_id -> Nullable<Uuid>,
        requester_office_text -> Text,
        description -> Text,
        priority -> SmallInt,
        assigned_office_id -> Uuid,
        supervisor_id -> Nullable<Uuid>,
        technician_id -> Nullable<Uuid>,
        equipment_code -> Text,
        status -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    ticket_notes (id) {
        id -> Uuid,
        ticket_id -> Uuid,
        author_id -> Nullable<Uuid>,
        text -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    evidences (id) {
        id -> Uuid,
        ticket_id -> Uuid,
        image_path -> Text,
        uploaded_at -> Timestamptz,
    }
}

diesel::table! {
    notifications (id) {
        id -> Uuid,
        recipient_id -> Uuid,
        ticket_id -> Nullable<Uuid>,
        text -> Text,
        created_at -> Timestamptz,
        read_at -> Nullable<Timestamptz>,
    }
}

diesel::joinable!(users -> offices (office_id));
diesel::joinable!(tickets -> offices (assigned_office_id));
diesel::joinable!(ticket_notes -> tickets (ticket_id));
diesel::joinable!(evidences -> tickets (ticket_id));
diesel::joinable!(notifications -> users (recipient_id));

diesel::allow_tables_to_appear_in_same_query!(
    offices,
    users,
    tickets,
    ticket_notes,
    evidences,
    notifications,
);
