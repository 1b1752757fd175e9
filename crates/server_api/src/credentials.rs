pub use bcrypt::DEFAULT_COST;

/// Lowest work factor bcrypt accepts (mirrors the private `bcrypt::MIN_COST`).
pub const MIN_COST: u32 = 4;

pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, cost)
}

/// A stored hash that is not valid bcrypt never matches.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    bcrypt::verify(password, stored_hash).unwrap_or(false)
}
