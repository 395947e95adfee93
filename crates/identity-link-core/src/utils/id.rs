// Row-id generation: nanoid-based opaque identifiers.

/// Generate a unique row id (21 characters).
pub fn generate_id() -> String {
    nanoid::nanoid!()
}

/// Generate an id with a custom length.
pub fn generate_id_with_length(len: usize) -> String {
    nanoid::nanoid!(len)
}
