// Hand-maintained: the ledger creates these tables itself at open.

diesel::table! {
    web_pages (id) {
        id -> Integer,
        url -> Text,
        created_at -> Text,
    }
}

diesel::table! {
    page_versions (id) {
        id -> Integer,
        web_page_id -> Integer,
        source_name -> Text,
        source_file -> Text,
        status_code -> Nullable<Integer>,
        dataset_name -> Nullable<Text>,
        content_file_path -> Nullable<Text>,
        version_date -> Text,
    }
}

diesel::joinable!(page_versions -> web_pages (web_page_id));

diesel::allow_tables_to_appear_in_same_query!(web_pages, page_versions);
