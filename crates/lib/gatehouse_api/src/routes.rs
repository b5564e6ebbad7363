//! Route paths.

pub const GET_API_HEALTH: &str = "/api/health";
pub const POST_API_TOKENS: &str = "/api/tokens";
pub const DELETE_API_TOKENS_TOKEN: &str = "/api/tokens/{token}";
/// `GET` session info, `DELETE` log out.
pub const GET_API_SESSION: &str = "/api/session";
pub const GET_API_SESSION_PERMISSIONS: &str = "/api/session/data/{data_source}/permissions";
