diesel::table! {
    bookings (id) {
        id -> Uuid,
        user_id -> Uuid,
        machine_id -> Uuid,
        laundromat_id -> Uuid,
        start_time -> Timestamptz,
        end_time -> Timestamptz,
        status -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    laundromats (id) {
        id -> Uuid,
        name -> Varchar,
        borough -> Varchar,
        address -> Varchar,
        latitude -> Float8,
        longitude -> Float8,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    machines (id) {
        id -> Uuid,
        laundromat_id -> Uuid,
        label -> Varchar,
        #[sql_name = "type"]
        kind -> Varchar,
        status -> Varchar,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    bookings,
    laundromats,
    machines,
);
