// src/resolver/arch.rs

//! Architecture compatibility

/// Architecture-independent packages install anywhere
pub const ARCH_ALL: &str = "all";

/// Whether a package built for `candidate_arch` installs on `system_arch`
pub fn check(candidate_arch: &str, system_arch: &str) -> bool {
    candidate_arch == ARCH_ALL || candidate_arch == system_arch
}

/// Debian name of the architecture this binary was built for
pub fn host_architecture() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "i386",
        "aarch64" => "arm64",
        "arm" => "armhf",
        "powerpc" => "powerpc",
        "powerpc64" if cfg!(target_endian = "little") => "ppc64el",
        "powerpc64" => "ppc64",
        "mips64" if cfg!(target_endian = "little") => "mips64el",
        "loongarch64" => "loong64",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_always_passes() {
        assert!(check("all", "amd64"));
        assert!(check("all", "arm64"));
    }

    #[test]
    fn test_exact_match_required() {
        assert!(check("amd64", "amd64"));
        assert!(!check("i386", "amd64"));
        assert!(!check("any", "amd64"));
    }

    #[test]
    fn test_host_architecture_is_debian_name() {
        let host = host_architecture();
        assert!(!host.is_empty());
        assert_ne!(host, "x86_64");
        assert_ne!(host, "aarch64");
    }
}
