//! Target CPU architecture tags and alias normalization.

/// Target CPU architecture for release asset selection.
///
/// binstage fetches prebuilt Linux binaries, so only the two architectures
/// with broad static-musl release coverage are supported. Aliases used by
/// container and Go toolchains (`amd64`, `aarch64`) normalize to the
/// canonical names; anything else is rejected up front.
///
/// # Example
///
/// ```
/// use binstage_schema::Arch;
///
/// let arch: Arch = "amd64".parse().unwrap();
/// assert_eq!(arch, Arch::X86_64);
/// assert_eq!(arch.as_str(), "x86_64");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Arch {
    /// Intel/AMD 64-bit (alias: `amd64`)
    #[default]
    X86_64,
    /// ARM 64-bit (alias: `aarch64`)
    Arm64,
}

impl Arch {
    /// Detect the architecture of the running machine.
    ///
    /// Maps `std::env::consts::ARCH` through the same alias table as
    /// [`FromStr`](std::str::FromStr); hosts outside the table (e.g.
    /// `riscv64`) are an error so callers can demand an explicit choice.
    pub fn detect() -> Result<Self, String> {
        std::env::consts::ARCH.parse()
    }

    /// Canonical string form (`x86_64` / `arm64`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Arm64 => "arm64",
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "x86_64" | "amd64" => Ok(Self::X86_64),
            "arm64" | "aarch64" => Ok(Self::Arm64),
            _ => Err(format!("Unsupported architecture: {s}. Use x86_64 or arm64.")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_normalization() {
        for alias in ["x86_64", "amd64", "X86_64", "AMD64"] {
            assert_eq!(alias.parse::<Arch>().unwrap(), Arch::X86_64, "{alias}");
        }
        for alias in ["arm64", "aarch64", "ARM64", "Aarch64"] {
            assert_eq!(alias.parse::<Arch>().unwrap(), Arch::Arm64, "{alias}");
        }
    }

    #[test]
    fn test_unknown_alias_rejected() {
        for bad in ["riscv64", "i686", "universal", ""] {
            let err = bad.parse::<Arch>().unwrap_err();
            assert!(err.contains("Unsupported architecture"), "{bad}: {err}");
        }
    }

    #[test]
    fn test_canonical_round_trip() {
        for arch in [Arch::X86_64, Arch::Arm64] {
            assert_eq!(arch.as_str().parse::<Arch>().unwrap(), arch);
            assert_eq!(arch.to_string(), arch.as_str());
        }
    }
}
