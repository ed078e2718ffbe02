mod token;

#[cfg(test)]
mod token_tests;

pub use token::{AuthError, BearerAuth, Claims};
