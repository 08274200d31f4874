//! Credentials storage for chatctl
//!
//! Operators authenticate once with `chatctl auth login`; the resulting bearer
//! token is kept in a small YAML document mapping profile names to records.
//! Exactly one profile is marked active and is used by every remote command.
//!
//! ## Location
//!
//! The file is looked up in this order, first hit wins:
//! 1. `<--config dir>/credentials.yaml`
//! 2. `$XDG_CONFIG_HOME/chatctl/credentials.yaml`
//! 3. `$HOME/.config/chatctl/credentials.yaml` if it exists
//! 4. the legacy `$HOME/.chatctl` if it exists
//!
//! When nothing exists yet, new credentials are written to location 3.
//!
//! ## Example
//!
//! ```yaml
//! production:
//!   name: production
//!   instanceUrl: https://chat.example.com
//!   username: sysadmin
//!   authToken: 9xk3...
//!   active: true
//! ```

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::constants::{APP_DIR, CREDENTIALS_FILE, LEGACY_CREDENTIALS_FILE};

#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    #[error("no credentials, run login first")]
    NoCredentials,
    #[error("no active credentials profile, run `chatctl auth set <name>` or login again")]
    NoActiveProfile,
    #[error("credentials profile '{0}' not found")]
    ProfileNotFound(String),
    #[error("unable to determine the home directory")]
    NoHome,
    #[error("reading credentials from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing credentials in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// One named login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub name: String,
    pub instance_url: String,
    pub username: String,
    pub auth_token: String,
    #[serde(default)]
    pub active: bool,
}

/// All stored profiles, in the order they were first written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    profiles: Vec<Profile>,
}

impl Credentials {
    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn active(&self) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.active)
    }

    /// The profile to use for `instance_url`, or the active one when unset.
    pub fn select(&self, instance_url: Option<&str>) -> Result<&Profile, CredentialsError> {
        match instance_url {
            Some(url) => {
                let wanted = url.trim_end_matches('/');
                self.profiles
                    .iter()
                    .find(|p| p.instance_url.trim_end_matches('/') == wanted)
                    .ok_or_else(|| CredentialsError::ProfileNotFound(url.to_string()))
            }
            None => self.active().ok_or(CredentialsError::NoActiveProfile),
        }
    }

    /// Insert or replace `profile` by name and make it the active one.
    pub fn upsert_active(&mut self, mut profile: Profile) {
        profile.active = true;
        for p in &mut self.profiles {
            p.active = false;
        }
        match self.profiles.iter_mut().find(|p| p.name == profile.name) {
            Some(existing) => *existing = profile,
            None => self.profiles.push(profile),
        }
    }

    pub fn set_active(&mut self, name: &str) -> Result<(), CredentialsError> {
        if self.get(name).is_none() {
            return Err(CredentialsError::ProfileNotFound(name.to_string()));
        }
        for p in &mut self.profiles {
            p.active = p.name == name;
        }
        Ok(())
    }

    /// Remove a profile, returning it. Removing the active profile leaves none active.
    pub fn remove(&mut self, name: &str) -> Result<Profile, CredentialsError> {
        let idx = self
            .profiles
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| CredentialsError::ProfileNotFound(name.to_string()))?;
        Ok(self.profiles.remove(idx))
    }

    /// Replace the token of an existing profile, leaving its active flag alone.
    pub fn update_token(&mut self, name: &str, token: &str) -> Result<(), CredentialsError> {
        let profile = self
            .profiles
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| CredentialsError::ProfileNotFound(name.to_string()))?;
        profile.auth_token = token.to_string();
        Ok(())
    }

    fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        let mut map = Mapping::new();
        for p in &self.profiles {
            map.insert(Value::String(p.name.clone()), serde_yaml::to_value(p)?);
        }
        serde_yaml::to_string(&map)
    }

    /// Parse either the profile map or a legacy single-record document.
    fn from_yaml(data: &str) -> Result<Self, serde_yaml::Error> {
        let doc: Value = serde_yaml::from_str(data)?;
        let map = match doc {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(map) => map,
            other => {
                let p: Profile = serde_yaml::from_value(other)?;
                return Ok(Self { profiles: vec![p] });
            }
        };
        if map.contains_key("instanceUrl") {
            let mut p: Profile = serde_yaml::from_value(Value::Mapping(map))?;
            if p.name.is_empty() {
                p.name = "default".to_string();
            }
            p.active = true;
            return Ok(Self { profiles: vec![p] });
        }
        let mut profiles = Vec::with_capacity(map.len());
        for (key, value) in map {
            let mut p: Profile = serde_yaml::from_value(value)?;
            if let Value::String(name) = key {
                p.name = name;
            }
            profiles.push(p);
        }
        Ok(Self { profiles })
    }
}

/// Where the credentials live, plus any legacy file the new one shadows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialsLocation {
    pub path: PathBuf,
    pub shadowed_legacy: Option<PathBuf>,
}

impl CredentialsLocation {
    /// Where updated credentials are written. The legacy file is only ever
    /// read; saving from it migrates to `~/.config/chatctl/credentials.yaml`.
    pub fn write_path(&self) -> PathBuf {
        let is_legacy = self
            .path
            .file_name()
            .map_or(false, |name| name == LEGACY_CREDENTIALS_FILE);
        match self.path.parent() {
            Some(home) if is_legacy => home.join(".config").join(APP_DIR).join(CREDENTIALS_FILE),
            _ => self.path.clone(),
        }
    }
}

/// Resolve the credentials path from explicit inputs.
pub fn locate(
    config_dir: Option<&Path>,
    xdg_config_home: Option<&Path>,
    home: &Path,
) -> CredentialsLocation {
    let legacy = home.join(LEGACY_CREDENTIALS_FILE);
    let shadow = |path: PathBuf| CredentialsLocation {
        shadowed_legacy: (path.exists() && legacy.exists()).then(|| legacy.clone()),
        path,
    };
    if let Some(dir) = config_dir {
        return shadow(dir.join(CREDENTIALS_FILE));
    }
    if let Some(xdg) = xdg_config_home {
        return shadow(xdg.join(APP_DIR).join(CREDENTIALS_FILE));
    }
    let user_config = home.join(".config").join(APP_DIR).join(CREDENTIALS_FILE);
    if user_config.exists() {
        return shadow(user_config);
    }
    if legacy.exists() {
        return CredentialsLocation {
            path: legacy,
            shadowed_legacy: None,
        };
    }
    CredentialsLocation {
        path: user_config,
        shadowed_legacy: None,
    }
}

/// Resolve the credentials path from the process environment.
pub fn locate_from_env(config_dir: Option<&Path>) -> Result<CredentialsLocation, CredentialsError> {
    let home = dirs::home_dir().ok_or(CredentialsError::NoHome)?;
    let xdg = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    Ok(locate(config_dir, xdg.as_deref(), &home))
}

/// The on-disk credentials file.
#[derive(Debug, Clone)]
pub struct CredentialsStore {
    path: PathBuf,
}

impl CredentialsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn read(&self) -> Result<Credentials, CredentialsError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CredentialsError::NoCredentials)
            }
            Err(source) => {
                return Err(CredentialsError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        Credentials::from_yaml(&data).map_err(|source| CredentialsError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Like [`read`](Self::read), but a missing file yields empty credentials.
    pub fn read_or_default(&self) -> Result<Credentials, CredentialsError> {
        match self.read() {
            Err(CredentialsError::NoCredentials) => Ok(Credentials::default()),
            other => other,
        }
    }

    /// Write atomically (temp file + rename) with owner-only permissions.
    pub fn save(&self, creds: &Credentials) -> Result<(), CredentialsError> {
        let io_err = |source| CredentialsError::Io {
            path: self.path.clone(),
            source,
        };
        let data = creds.to_yaml().map_err(|source| CredentialsError::Parse {
            path: self.path.clone(),
            source,
        })?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_private_dir(parent).map_err(io_err)?;
        }
        let tmp = self.path.with_extension("tmp");
        {
            let mut file = open_private(&tmp).map_err(io_err)?;
            file.write_all(data.as_bytes()).map_err(io_err)?;
            file.sync_all().map_err(io_err)?;
        }
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        tracing::debug!(path = %self.path.display(), "credentials saved");
        Ok(())
    }

    /// Remove the file. A missing file is not an error.
    pub fn clean(&self) -> Result<(), CredentialsError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CredentialsError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    if dir.exists() {
        return Ok(());
    }
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies on creation; a stale temp file keeps its old bits
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}
