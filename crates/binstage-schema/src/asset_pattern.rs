//! Ordered release-asset filename patterns.
//!
//! Vendors name release archives inconsistently (`x86_64` / `amd64` / `x86`,
//! `aarch64` / `arm64` / `arm`), so each (architecture, libc policy) pair
//! carries an ordered list of regex strings, most specific first. The
//! resolver hands these to `soar dl --regex` one at a time and stops at the
//! first pattern that yields extracted files -- binstage itself never
//! compiles them against asset names.
//!
//! Only `.tar.gz` / `.tar.xz` archives are eligible; zips and bare binaries
//! are left to the index tier.

use crate::Arch;

/// Which libc flavor an asset filename must advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibcPolicy {
    /// Asset name must mention `musl` (fully static binaries).
    MuslOnly,
    /// Any Linux build is acceptable, libc unconstrained.
    AnyLinux,
}

/// Musl-static patterns for `x86_64`, most specific first.
const X86_64_MUSL: &[&str] = &[
    r"(?i).*x86[_-]?64.*musl.*\.tar\.(?:gz|xz)$",
    r"(?i).*amd64.*musl.*\.tar\.(?:gz|xz)$",
    r"(?i).*x86.*musl.*\.tar\.(?:gz|xz)$",
    r"(?i).*64.*musl.*\.tar\.(?:gz|xz)$",
    r"(?i).*musl.*x86.*\.tar\.(?:gz|xz)$",
];

/// Musl-static patterns for `arm64`, most specific first.
const ARM64_MUSL: &[&str] = &[
    r"(?i).*aarch64.*musl.*\.tar\.(?:gz|xz)$",
    r"(?i).*arm64.*musl.*\.tar\.(?:gz|xz)$",
    r"(?i).*arm.*musl.*\.tar\.(?:gz|xz)$",
    r"(?i).*aarch.*musl.*\.tar\.(?:gz|xz)$",
    r"(?i).*musl.*arm.*\.tar\.(?:gz|xz)$",
];

/// Any-Linux patterns for `x86_64`, most specific first.
const X86_64_ANY_LINUX: &[&str] = &[
    r"(?i).*x86[_-]?64.*linux.*\.tar\.(?:gz|xz)$",
    r"(?i).*amd64.*linux.*\.tar\.(?:gz|xz)$",
    r"(?i).*x86.*linux.*\.tar\.(?:gz|xz)$",
    r"(?i).*linux.*x86[_-]?64.*\.tar\.(?:gz|xz)$",
    r"(?i).*linux.*amd64.*\.tar\.(?:gz|xz)$",
    r"(?i).*x86[_-]?64.*\.tar\.(?:gz|xz)$",
    r"(?i).*amd64.*\.tar\.(?:gz|xz)$",
];

/// Any-Linux patterns for `arm64`, most specific first.
const ARM64_ANY_LINUX: &[&str] = &[
    r"(?i).*aarch64.*linux.*\.tar\.(?:gz|xz)$",
    r"(?i).*arm64.*linux.*\.tar\.(?:gz|xz)$",
    r"(?i).*arm.*linux.*\.tar\.(?:gz|xz)$",
    r"(?i).*aarch.*linux.*\.tar\.(?:gz|xz)$",
    r"(?i).*linux.*aarch64.*\.tar\.(?:gz|xz)$",
    r"(?i).*linux.*arm64.*\.tar\.(?:gz|xz)$",
    r"(?i).*aarch64.*\.tar\.(?:gz|xz)$",
    r"(?i).*arm64.*\.tar\.(?:gz|xz)$",
];

/// Ordered pattern list for one (architecture, libc policy) pair.
///
/// The returned slice is tried front to back; earlier entries are more
/// specific and therefore preferred.
pub fn asset_patterns(arch: Arch, policy: LibcPolicy) -> &'static [&'static str] {
    match (arch, policy) {
        (Arch::X86_64, LibcPolicy::MuslOnly) => X86_64_MUSL,
        (Arch::Arm64, LibcPolicy::MuslOnly) => ARM64_MUSL,
        (Arch::X86_64, LibcPolicy::AnyLinux) => X86_64_ANY_LINUX,
        (Arch::Arm64, LibcPolicy::AnyLinux) => ARM64_ANY_LINUX,
    }
}
