//! Transport selection: turn global options and stored credentials into a
//! ready-to-use session.
//!
//! `--local` talks to the server's Unix-domain socket and needs no credentials,
//! but only after the socket passes ownership and permission checks. Otherwise
//! the active profile's URL and token are used, and the token is verified with
//! a who-am-I probe before any command runs.

use std::path::{Path, PathBuf};

use crate::client::{ApiClient, UserApi};
use crate::constants::{LOCAL_SOCKET_FILE, SERVER_API_VERSION};
use crate::credentials::{self, CredentialsError, CredentialsStore};
use crate::error::ApiError;
use crate::model::User;
use crate::printer::Printer;
use crate::transport::{BackendKind, HttpTransport};
use crate::GlobalArgs;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("local mode is only supported on Unix platforms")]
    LocalUnsupported,
    #[error("socket file {0} doesn't exist, check that local mode is enabled on the server")]
    SocketMissing(PathBuf),
    #[error("{0} is not a socket file")]
    NotSocket(PathBuf),
    #[error("invalid file mode for socket {path}: expected 0600, found {mode:04o}")]
    BadMode { path: PathBuf, mode: u32 },
    #[error("socket {path} is owned by uid {owner}, not by the current user (uid {uid})")]
    WrongOwner { path: PathBuf, owner: u32, uid: u32 },
    #[error("inspecting socket {path}: {source}")]
    SocketIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid instance URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
    #[error("could not verify the session against {url}: {source}")]
    Probe {
        url: String,
        #[source]
        source: ApiError,
    },
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// `<runtime dir>/chatctl_local.sock`, falling back to the temp directory.
pub fn default_socket_path() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(LOCAL_SOCKET_FILE)
}

#[cfg(unix)]
pub fn current_uid() -> u32 {
    // SAFETY: getuid has no preconditions and cannot fail
    unsafe { libc::getuid() }
}

/// Check that `path` is a socket with mode 0600 owned by `uid`.
#[cfg(unix)]
pub fn validate_socket(path: &Path, uid: u32) -> Result<(), SessionError> {
    use std::os::unix::fs::{FileTypeExt, MetadataExt};

    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SessionError::SocketMissing(path.to_path_buf()))
        }
        Err(source) => {
            return Err(SessionError::SocketIo {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if !meta.file_type().is_socket() {
        return Err(SessionError::NotSocket(path.to_path_buf()));
    }
    let mode = meta.mode() & 0o777;
    if mode != 0o600 {
        return Err(SessionError::BadMode {
            path: path.to_path_buf(),
            mode,
        });
    }
    if meta.uid() != uid {
        return Err(SessionError::WrongOwner {
            path: path.to_path_buf(),
            owner: meta.uid(),
            uid,
        });
    }
    Ok(())
}

/// Validate an instance URL and return it without a trailing slash.
///
/// A bare host gets `https://` prepended.
pub fn normalize_instance_url(raw: &str) -> Result<String, SessionError> {
    // The scheme is split off before trailing slashes go, so "https://" keeps its empty host.
    let candidate = match raw.trim().split_once("://") {
        Some((scheme, rest)) => format!("{scheme}://{}", rest.trim_end_matches('/')),
        None => format!("https://{}", raw.trim().trim_end_matches('/')),
    };
    let invalid = |reason: String| SessionError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };
    let parsed = url::Url::parse(&candidate).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(candidate)
}

/// Warning text when the server's major or minor version differs from the
/// server release this client targets.
pub fn version_mismatch(server: &str) -> Option<String> {
    version_mismatch_between(SERVER_API_VERSION, server)
}

fn major_minor(raw: &str) -> Option<(u64, u64)> {
    let core: Vec<&str> = raw.split('.').take(3).collect();
    let text = match core.len() {
        3 => core.join("."),
        2 => format!("{}.0", core.join(".")),
        _ => return None,
    };
    semver::Version::parse(&text).ok().map(|v| (v.major, v.minor))
}

pub fn version_mismatch_between(client: &str, server: &str) -> Option<String> {
    let (Some(c), Some(s)) = (major_minor(client), major_minor(server)) else {
        return None;
    };
    (c != s).then(|| {
        format!("server version {server} doesn't match client version {client}, some commands may not work as expected")
    })
}

/// A validated capability to issue remote operations.
pub struct Session {
    client: ApiClient,
    user: Option<User>,
    server_version: Option<String>,
    token: Option<String>,
}

impl Session {
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn kind(&self) -> BackendKind {
        self.client.kind()
    }

    /// The authenticated user for remote sessions.
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn server_version(&self) -> Option<&str> {
        self.server_version.as_deref()
    }

    /// Base URL or socket address.
    pub fn address(&self) -> &str {
        self.client.address()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Build the session the global options ask for.
    pub async fn establish(opts: &GlobalArgs, printer: &Printer) -> Result<Session, SessionError> {
        if opts.local {
            let path = opts
                .local_socket_path
                .clone()
                .unwrap_or_else(default_socket_path);
            return Session::local(&path);
        }

        let location = credentials::locate_from_env(opts.config.as_deref())?;
        if let Some(legacy) = &location.shadowed_legacy {
            printer.print_warning(format!(
                "ignoring legacy credentials file {} in favour of {}",
                legacy.display(),
                location.path.display()
            ));
        }
        let creds = CredentialsStore::new(&location.path).read()?;
        let profile = creds.select(opts.instance_url.as_deref())?;
        tracing::debug!(profile = %profile.name, url = %profile.instance_url, "using credentials profile");

        let session =
            Session::remote(&profile.instance_url, &profile.auth_token, opts.insecure_skip_verify)
                .await?;
        if let Some(server) = session.server_version() {
            if let Some(warning) = version_mismatch(server) {
                printer.print_warning(warning);
            }
        }
        Ok(session)
    }

    #[cfg(unix)]
    pub fn local(path: &Path) -> Result<Session, SessionError> {
        validate_socket(path, current_uid())?;
        tracing::debug!(socket = %path.display(), "using local mode");
        let transport = crate::transport::SocketTransport::new(path);
        Ok(Session {
            client: ApiClient::new(Box::new(transport)),
            user: None,
            server_version: None,
            token: None,
        })
    }

    #[cfg(not(unix))]
    pub fn local(_path: &Path) -> Result<Session, SessionError> {
        Err(SessionError::LocalUnsupported)
    }

    /// Connect with a bearer token and verify it.
    pub async fn remote(
        url: &str,
        token: &str,
        insecure_skip_verify: bool,
    ) -> Result<Session, SessionError> {
        let transport = HttpTransport::new(url, Some(token), insecure_skip_verify)?;
        let client = ApiClient::new(Box::new(transport));
        let (user, response) = client.get_me().await.map_err(|source| SessionError::Probe {
            url: url.to_string(),
            source,
        })?;
        Ok(Session {
            client,
            user: Some(user),
            server_version: response.server_version,
            token: Some(token.to_string()),
        })
    }
}

/// Exchange a password for a token against `url`.
pub async fn password_login(
    url: &str,
    username: &str,
    password: &str,
    mfa_token: Option<&str>,
    insecure_skip_verify: bool,
) -> Result<(User, String), SessionError> {
    let transport = HttpTransport::new(url, None, insecure_skip_verify)?;
    let client = ApiClient::new(Box::new(transport));
    Ok(client.login(username, password, mfa_token).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_normalization() {
        assert_eq!(
            normalize_instance_url("https://example.example/").unwrap(),
            "https://example.example"
        );
        assert_eq!(
            normalize_instance_url("chat.example.com").unwrap(),
            "https://chat.example.com"
        );
        assert!(normalize_instance_url("ftp://x").is_err());
        assert!(normalize_instance_url("https://").is_err());
        assert!(normalize_instance_url("http:///").is_err());
        assert!(normalize_instance_url("  https:// ").is_err());
    }

    #[test]
    fn version_mismatch_compares_major_and_minor() {
        assert_eq!(version_mismatch_between("9.5.1", "9.5.0.9.5.0.abc.false"), None);
        assert!(version_mismatch_between("9.5.1", "9.6.0").is_some());
        assert!(version_mismatch_between("9.5.1", "10.5.0").is_some());
        assert_eq!(version_mismatch_between("9.5.1", "dev"), None);
    }

    #[test]
    fn matching_servers_do_not_warn() {
        let server = format!("{SERVER_API_VERSION}.{SERVER_API_VERSION}.abc.false");
        assert_eq!(version_mismatch(&server), None);
        assert!(version_mismatch("1.0.0").is_some());
        assert!(version_mismatch(crate::constants::CLIENT_VERSION).is_some());
    }

    proptest::proptest! {
        #[test]
        fn property_normalized_urls_are_stable(host in "[a-z][a-z0-9]{0,10}(\\.[a-z]{2,4})?", slashes in 0usize..3) {
            let raw = format!("https://{host}{}", "/".repeat(slashes));
            let once = normalize_instance_url(&raw).unwrap();
            proptest::prop_assert!(!once.ends_with('/'));
            proptest::prop_assert_eq!(normalize_instance_url(&once).unwrap(), once);
        }
    }

    #[cfg(unix)]
    mod socket_checks {
        use super::super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use std::os::unix::net::UnixListener;
        use tempfile::TempDir;

        fn bound_socket(dir: &TempDir, mode: u32) -> (PathBuf, UnixListener) {
            let path = dir.path().join("local.sock");
            let listener = UnixListener::bind(&path).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
            (path, listener)
        }

        #[test]
        fn accepts_private_socket_owned_by_caller() {
            let dir = TempDir::new().unwrap();
            let (path, _l) = bound_socket(&dir, 0o600);
            validate_socket(&path, current_uid()).unwrap();
        }

        #[test]
        fn rejects_loose_mode() {
            let dir = TempDir::new().unwrap();
            let (path, _l) = bound_socket(&dir, 0o660);
            let err = validate_socket(&path, current_uid()).unwrap_err();
            assert!(matches!(err, SessionError::BadMode { mode: 0o660, .. }));
        }

        #[test]
        fn rejects_foreign_owner() {
            let dir = TempDir::new().unwrap();
            let (path, _l) = bound_socket(&dir, 0o600);
            let err = validate_socket(&path, current_uid().wrapping_add(1)).unwrap_err();
            assert!(matches!(err, SessionError::WrongOwner { .. }));
        }

        #[test]
        fn rejects_regular_file_and_missing_path() {
            let dir = TempDir::new().unwrap();
            let file = dir.path().join("plain");
            fs::write(&file, "").unwrap();
            fs::set_permissions(&file, fs::Permissions::from_mode(0o600)).unwrap();
            assert!(matches!(
                validate_socket(&file, current_uid()),
                Err(SessionError::NotSocket(_))
            ));
            assert!(matches!(
                validate_socket(&dir.path().join("absent"), current_uid()),
                Err(SessionError::SocketMissing(_))
            ));
        }

        #[test]
        fn local_session_needs_no_credentials() {
            let dir = TempDir::new().unwrap();
            let (path, _l) = bound_socket(&dir, 0o600);
            let session = Session::local(&path).unwrap();
            assert_eq!(session.kind(), BackendKind::LocalSocket);
            assert!(session.user().is_none());
        }
    }
}
