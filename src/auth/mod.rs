//! User registration, log-in and the token checks that guard the rest of the API.

mod current_user;
mod log_in;
mod middleware;
mod password;
mod register;
mod token;
mod user;

pub use current_user::get_current_user;
pub use log_in::{AuthResponse, post_log_in};
pub use middleware::{AUTH_TOKEN_HEADER, auth_guard};
pub use password::{PasswordHash, ValidatedPassword};
pub use register::register_user;
pub use token::{Claims, DEFAULT_TOKEN_DURATION, JwtKeys, decode_token, encode_token};
pub use user::{
    User, UserID, UserProfile, create_user, create_user_table, get_user_by_email, get_user_by_id,
    parse_email,
};
