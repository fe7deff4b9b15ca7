/// Visitor session lifetime (4 hours).
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 240;

/// Cookie and header names a visitor token may arrive in.
pub const SESSION_COOKIE_NAME: &str = "session";
pub const SESSION_HEADER_NAME: &str = "x-session-token";

/// Random bytes in a visitor token before hex encoding.
pub const SESSION_TOKEN_BYTES: usize = 32;

pub const MAX_PARTICIPANT_NAME_CHARS: usize = 100;

pub const MAX_ANSWER_CHARS: usize = 500;

pub const MAX_PARTICIPANT_AGE: u32 = 120;
