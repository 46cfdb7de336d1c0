//! Runtime platform capability
//!
//! Resolved once at startup and handed to the delivery broker; nothing below
//! the broker probes the environment on its own.

use std::fmt;
use std::str::FromStr;

use crate::error::ContactbookError;

/// Environment variable that forces a platform
pub const PLATFORM_ENV: &str = "CONTACTBOOK_PLATFORM";

/// What the host can do with a finished backup
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PlatformCapability {
    /// Mobile shell: app directories plus a share sheet
    #[value(name = "native")]
    NativeShell,
    /// Web page or installed web app: downloads via object URLs
    #[value(name = "browser")]
    Browser,
    /// Desktop shell: user directories plus the system file handler
    #[value(name = "desktop")]
    EmbeddedDesktop,
}

impl PlatformCapability {
    /// Resolve the platform: explicit choice, then environment, then build target
    pub fn detect(explicit: Option<PlatformCapability>) -> Result<Self, ContactbookError> {
        if let Some(platform) = explicit {
            return Ok(platform);
        }

        match std::env::var(PLATFORM_ENV) {
            Ok(value) if !value.trim().is_empty() => value.parse(),
            _ => Ok(Self::from_target()),
        }
    }

    fn from_target() -> Self {
        if cfg!(any(target_os = "android", target_os = "ios")) {
            Self::NativeShell
        } else if cfg!(target_arch = "wasm32") {
            Self::Browser
        } else {
            Self::EmbeddedDesktop
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NativeShell => "native",
            Self::Browser => "browser",
            Self::EmbeddedDesktop => "desktop",
        }
    }
}

impl FromStr for PlatformCapability {
    type Err = ContactbookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "native" | "mobile" => Ok(Self::NativeShell),
            "browser" | "web" | "pwa" => Ok(Self::Browser),
            "desktop" => Ok(Self::EmbeddedDesktop),
            other => Err(ContactbookError::Config(format!(
                "Unknown platform '{}'; expected native, browser or desktop",
                other
            ))),
        }
    }
}

impl fmt::Display for PlatformCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(
            "native".parse::<PlatformCapability>().unwrap(),
            PlatformCapability::NativeShell
        );
        assert_eq!(
            "PWA".parse::<PlatformCapability>().unwrap(),
            PlatformCapability::Browser
        );
        assert!("toaster".parse::<PlatformCapability>().is_err());
    }

    #[test]
    fn test_explicit_wins() {
        let platform = PlatformCapability::detect(Some(PlatformCapability::Browser)).unwrap();
        assert_eq!(platform, PlatformCapability::Browser);
    }

    #[test]
    fn test_display_round_trip() {
        for platform in [
            PlatformCapability::NativeShell,
            PlatformCapability::Browser,
            PlatformCapability::EmbeddedDesktop,
        ] {
            assert_eq!(platform.to_string().parse::<PlatformCapability>().unwrap(), platform);
        }
    }
}
