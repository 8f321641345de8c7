use std::{net::SocketAddr, path::PathBuf};

/// Configuration for the flag HTTP server.
///
/// # Examples
/// ```
/// # use flagpole::ServerConfig;
/// let config = ServerConfig::from_admin_token("secret")
///     .snapshot_path("/var/lib/flagpole/flags.json")
///     .listen_addr(([127, 0, 0, 1], 9000).into());
/// assert_eq!(config.listen_addr.port(), 9000);
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub listen_addr: SocketAddr,
    /// Location of the flag snapshot.
    pub snapshot_path: PathBuf,
    pub(crate) admin_token: String,
}

impl ServerConfig {
    /// Default listen address.
    pub const DEFAULT_LISTEN_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 8080);

    /// Default snapshot location, relative to the working directory.
    pub const DEFAULT_SNAPSHOT_PATH: &'static str = "flags.json";

    /// Create a default configuration. Mutating requests must carry
    /// `Authorization: Bearer <admin_token>`.
    pub fn from_admin_token(admin_token: impl Into<String>) -> Self {
        ServerConfig {
            listen_addr: Self::DEFAULT_LISTEN_ADDR.into(),
            snapshot_path: Self::DEFAULT_SNAPSHOT_PATH.into(),
            admin_token: admin_token.into(),
        }
    }

    /// Override the listen address.
    pub fn listen_addr(mut self, listen_addr: SocketAddr) -> Self {
        self.listen_addr = listen_addr;
        self
    }

    /// Override the snapshot location.
    pub fn snapshot_path(mut self, snapshot_path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = snapshot_path.into();
        self
    }

    /// Returns `true` if `header` is a bearer `Authorization` header value carrying the admin
    /// token.
    pub(crate) fn is_authorized(&self, header: Option<&str>) -> bool {
        header
            .and_then(|value| value.strip_prefix("Bearer "))
            .is_some_and(|token| !self.admin_token.is_empty() && token == self.admin_token)
    }
}
