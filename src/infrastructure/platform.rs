//! Platform identifiers reported in the default `User-Agent`.

use std::env::consts;

pub fn operating_system() -> &'static str {
    match consts::OS {
        "macos" => "macOS",
        "ios" => "iOS",
        "linux" => "Linux",
        "windows" => "Windows",
        "freebsd" => "FreeBSD",
        "" => "Unknown OS",
        other => other,
    }
}

/// Kernel release where the platform exposes it cheaply.
#[cfg(target_os = "linux")]
pub fn operating_system_version() -> String {
    std::fs::read_to_string("/proc/sys/kernel/osrelease")
        .map(|release| release.trim().to_string())
        .ok()
        .filter(|release| !release.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(not(target_os = "linux"))]
pub fn operating_system_version() -> String {
    "unknown".to_string()
}

pub fn hardware() -> &'static str {
    match consts::ARCH {
        "" => "Unknown Hardware",
        arch => arch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_never_blank() {
        assert!(!operating_system().is_empty());
        assert!(!operating_system_version().is_empty());
        assert!(!hardware().is_empty());
    }
}
