pub mod password;

pub use password::{Argon2Hasher, PasswordHasher};
