//! Search-root resolution.
//!
//! [`LocationResolver`] computes where to look for toolchain installs and
//! user sketchbooks. It performs no I/O: the host family and home directory
//! are inputs, so results are deterministic under test.

use bk_core::{DiscoveryConfig, HostPlatform, RootKind, ScanRoot};
use camino::Utf8PathBuf;
use tracing::{debug, warn};

/// Bundle directory name of the macOS install.
const MAC_BUNDLE: &str = "Arduino.app";

/// Where resources live inside the macOS bundle.
const MAC_BUNDLE_CONTENT: &str = "Contents/Java";

/// Sketchbook location below the user's home directory.
const USER_SKETCHBOOK: &str = "Documents/Arduino";

/// Computes default and overridden search roots.
///
/// # Examples
///
/// ```
/// use bk_core::{HostPlatform, RootKind};
/// use bk_scanner::LocationResolver;
///
/// let resolver = LocationResolver::new(HostPlatform::MacOs, Some("/Users/ada".into()));
/// let runtime = resolver.resolve(RootKind::Runtime, &[], true);
/// assert_eq!(runtime[0].as_str(), "/Applications/Arduino.app/Contents/Java");
///
/// let user = resolver.resolve(RootKind::User, &[], true);
/// assert_eq!(user[0].as_str(), "/Users/ada/Documents/Arduino");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationResolver {
    host: HostPlatform,
    home: Option<Utf8PathBuf>,
}

impl LocationResolver {
    /// Creates a resolver for an explicit host and home directory.
    #[must_use]
    pub const fn new(host: HostPlatform, home: Option<Utf8PathBuf>) -> Self {
        Self { host, home }
    }

    /// Creates a resolver for the running host.
    #[must_use]
    pub fn for_host() -> Self {
        Self::new(HostPlatform::detect(), detect_home())
    }

    /// Creates a resolver honoring the host and home overrides in `config`.
    #[must_use]
    pub fn from_config(config: &DiscoveryConfig) -> Self {
        let home = config.home_dir.clone().or_else(detect_home);
        Self::new(config.host_platform(), home)
    }

    /// The host family this resolver targets.
    #[inline]
    #[must_use]
    pub const fn host(&self) -> HostPlatform {
        self.host
    }

    /// Host-specific default locations for `kind`.
    #[must_use]
    pub fn defaults(&self, kind: RootKind) -> Vec<Utf8PathBuf> {
        match kind {
            RootKind::Runtime => match self.host {
                HostPlatform::MacOs => vec![Utf8PathBuf::from("/Applications/Arduino.app")],
                HostPlatform::Windows => vec![
                    Utf8PathBuf::from("C:/Program Files/Arduino"),
                    Utf8PathBuf::from("C:/Program Files (x86)/Arduino"),
                ],
                HostPlatform::Linux => vec![Utf8PathBuf::from("/usr/share/arduino/")],
            },
            RootKind::User => {
                let Some(home) = &self.home else {
                    debug!("No home directory; skipping default sketchbook");
                    return Vec::new();
                };
                vec![home.join(USER_SKETCHBOOK)]
            }
        }
    }

    /// Returns `overrides` followed by the defaults for `kind`, with host
    /// post-processing applied to every entry.
    #[must_use]
    pub fn resolve(
        &self,
        kind: RootKind,
        overrides: &[Utf8PathBuf],
        include_defaults: bool,
    ) -> Vec<Utf8PathBuf> {
        let mut locations = overrides.to_vec();
        if include_defaults {
            locations.extend(self.defaults(kind));
        }

        if kind == RootKind::Runtime && self.host == HostPlatform::MacOs {
            for location in &mut locations {
                if let Some(rewritten) = rewrite_mac_bundle(location.as_str()) {
                    *location = rewritten;
                }
            }
        }

        locations
    }

    /// Resolves runtime roots then user roots into ranked [`ScanRoot`]s.
    ///
    /// Later duplicates of an already listed path are dropped.
    #[must_use]
    pub fn resolve_all(&self, config: &DiscoveryConfig) -> Vec<ScanRoot> {
        let runtime = self.resolve(
            RootKind::Runtime,
            &config.runtime_dirs,
            config.include_defaults,
        );
        let user = self.resolve(RootKind::User, &config.user_dirs, config.include_defaults);

        let mut roots: Vec<ScanRoot> = Vec::with_capacity(runtime.len() + user.len());
        let tagged = runtime
            .into_iter()
            .map(|path| (path, RootKind::Runtime))
            .chain(user.into_iter().map(|path| (path, RootKind::User)));

        for (path, kind) in tagged {
            if roots.iter().any(|root| root.path == path) {
                debug!(path = %path, "Dropping duplicate search root");
                continue;
            }
            let rank = roots.len();
            roots.push(ScanRoot::new(path, kind, rank));
        }

        roots
    }
}

impl Default for LocationResolver {
    fn default() -> Self {
        Self::for_host()
    }
}

fn rewrite_mac_bundle(location: &str) -> Option<Utf8PathBuf> {
    let trimmed = location.strip_suffix('/').unwrap_or(location);
    trimmed
        .ends_with(MAC_BUNDLE)
        .then(|| Utf8PathBuf::from(format!("{trimmed}/{MAC_BUNDLE_CONTENT}")))
}

fn detect_home() -> Option<Utf8PathBuf> {
    let home = dirs::home_dir()?;
    match Utf8PathBuf::from_path_buf(home) {
        Ok(home) => Some(home),
        Err(raw) => {
            warn!(path = %raw.display(), "Home directory is not valid UTF-8");
            None
        }
    }
}
