use uuid::Uuid;

/// Edge `user -> author`. At most one per pair, never `user == author`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Follow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub author_id: Uuid,
}
