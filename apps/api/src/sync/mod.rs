// Sync API: the primary system pushes job, user and review changes here.
// Payloads are validated field by field before the store resolves references.

pub mod extract;
pub mod handlers;
pub mod payloads;
pub mod validation;
