//! # Portal SSO
//!
//! Signs requests for servers configured with the portal authenticator. Each request carries
//! a timestamp, a random number, the user name and an MD5 token computed from those values and
//! the shared secret. The server recomputes the token and rejects stale timestamps, so the
//! headers are generated again for every request.
use base64::{Engine, engine::general_purpose::STANDARD};
use md5::{Digest, Md5};

pub const TIMESTAMP_HEADER: &str = "NX_TS";
pub const RANDOM_HEADER: &str = "NX_RD";
pub const TOKEN_HEADER: &str = "NX_TOKEN";
pub const USER_HEADER: &str = "NX_USER";

/// Builds the four signed headers for `username`, as of now.
pub fn portal_sso_headers(username: &str, secret: &str) -> [(&'static str, String); 4] {
    let timestamp = chrono::Utc::now().timestamp_millis();
    let random = rand::random::<i32>();
    signed_headers(username, secret, timestamp, random)
}

fn signed_headers(
    username: &str,
    secret: &str,
    timestamp: i64,
    random: i32,
) -> [(&'static str, String); 4] {
    [
        (TIMESTAMP_HEADER, timestamp.to_string()),
        (RANDOM_HEADER, random.to_string()),
        (TOKEN_HEADER, sign(username, secret, timestamp, random)),
        (USER_HEADER, username.to_string()),
    ]
}

fn sign(username: &str, secret: &str, timestamp: i64, random: i32) -> String {
    let clear = format!("{timestamp}:{random}:{secret}:{username}");
    STANDARD.encode(Md5::digest(clear.as_bytes()))
}
