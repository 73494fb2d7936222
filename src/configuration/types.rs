use serde::{Deserialize, Serialize};

/// Basic-auth credential pair used by the WebDAV client.
///
/// Credentials are always carried as a pair; a configuration with only one
/// side set is rejected during validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}
