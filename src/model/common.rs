use uuid::Uuid;

pub type Id = String;

/// Collision-resistant identifier for projects and branches
pub fn generate_id() -> Id {
    Uuid::new_v4().simple().to_string()
}

/// RFC 3339 timestamp for `created_at` / `updated_at` fields
pub fn timestamp_now() -> String {
    chrono::Utc::now().to_rfc3339()
}
