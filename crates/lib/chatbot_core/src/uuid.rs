// Helper for generating UUIDv7 (timestamp-sortable UUIDs).
//
// Messages are replayed in creation order; a v7 id breaks ties between
// rows that share a `created_at` instant. Users and chat sessions use
// the same generator so every id is produced app-side.

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}
