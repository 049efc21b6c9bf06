pub mod memory;
pub mod token;
pub mod user;

pub use memory::InMemoryStore;
pub use token::PostgresTokenRepository;
pub use user::PostgresUserRepository;

use crate::account::errors::AuthError;

fn database_error(e: sqlx::Error) -> AuthError {
    AuthError::DatabaseError(e.to_string())
}
