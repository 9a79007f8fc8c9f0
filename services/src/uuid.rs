use uuid::Uuid;

/// Deterministic UUIDv5 from an arbitrary string id
pub fn stable_uuid(id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, id.as_bytes())
}

/// Stable id of a chunk: same file name + digest + position always yields the same id.
pub fn chunk_uuid(file_name: &str, file_sha256: &str, ordinal: usize) -> Uuid {
    stable_uuid(&format!("chunk://{file_sha256}/{file_name}/{ordinal}"))
}
