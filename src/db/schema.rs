diesel::table! {
    boards (id) {
        id -> Integer,
        name -> Text,
        parent_id -> Nullable<Integer>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}
