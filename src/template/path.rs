//! Platform roots and separator handling for path templates

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Operating system family a path is rendered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Linux,
    Mac,
    Windows,
}

impl Platform {
    /// Platform this process runs on
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::Mac
        } else {
            Platform::Linux
        }
    }

    pub fn separator(&self) -> char {
        match self {
            Platform::Windows => '\\',
            Platform::Linux | Platform::Mac => '/',
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Mac => "mac",
            Platform::Windows => "windows",
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linux" | "linux2" => Ok(Platform::Linux),
            "mac" | "darwin" | "macos" => Ok(Platform::Mac),
            "windows" | "win32" => Ok(Platform::Windows),
            other => Err(format!(
                "unknown platform '{}', expected one of linux, mac, windows",
                other
            )),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed prefix of a path template
#[derive(Debug, Clone, PartialEq)]
pub struct PathRoot {
    platform: Platform,
    root_path: String,
    per_platform_roots: Option<HashMap<Platform, String>>,
}

impl PathRoot {
    pub fn new(platform: Platform, root_path: &str) -> Self {
        Self {
            platform,
            root_path: normalize_path(root_path, platform),
            per_platform_roots: None,
        }
    }

    pub fn with_platform_roots(mut self, roots: HashMap<Platform, String>) -> Self {
        self.per_platform_roots = Some(
            roots
                .into_iter()
                .map(|(platform, root)| (platform, normalize_path(&root, platform)))
                .collect(),
        );
        self
    }

    /// Platform `root_path` belongs to
    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    pub fn per_platform_roots(&self) -> Option<&HashMap<Platform, String>> {
        self.per_platform_roots.as_ref()
    }

    /// Root to use for `platform`
    pub(crate) fn root_for(&self, platform: Platform) -> Result<&str, String> {
        if platform == self.platform {
            return Ok(&self.root_path);
        }
        match &self.per_platform_roots {
            None => Err("no per-platform roots are configured".to_string()),
            Some(roots) => match roots.get(&platform) {
                Some(root) if !root.is_empty() => Ok(root),
                _ => Err(format!("no root is configured for '{}'", platform)),
            },
        }
    }

    /// Join a root with a relative path written with forward slashes
    pub(crate) fn join(root: &str, relative: &str, platform: Platform) -> String {
        let separator = platform.separator();
        let relative = to_platform_separators(relative, platform);
        if relative.is_empty() {
            return root.to_string();
        }
        if root.is_empty() {
            return relative;
        }
        let mut joined = root.trim_end_matches(separator).to_string();
        joined.push(separator);
        joined.push_str(relative.trim_start_matches(separator));
        joined
    }
}

/// Replace forward slashes of a definition with the platform separator
pub(crate) fn to_platform_separators(relative: &str, platform: Platform) -> String {
    match platform.separator() {
        '/' => relative.to_string(),
        separator => relative.replace('/', &separator.to_string()),
    }
}

/// Unify separators, collapse repeated separators and drop a trailing one
///
/// A leading double separator is kept on Windows for UNC paths.
pub fn normalize_path(path: &str, platform: Platform) -> String {
    let separator = platform.separator();
    let unc = platform == Platform::Windows
        && (path.starts_with("\\\\") || path.starts_with("//"));

    let mut out = String::with_capacity(path.len());
    if unc {
        out.push(separator);
    }
    let mut previous_was_separator = false;
    for c in path.chars() {
        let c = if c == '/' || c == '\\' { separator } else { c };
        if c == separator {
            if previous_was_separator {
                continue;
            }
            previous_was_separator = true;
        } else {
            previous_was_separator = false;
        }
        out.push(c);
    }

    let minimum = if unc { 2 } else { 1 };
    while out.len() > minimum && out.ends_with(separator) {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_from_str() {
        assert_eq!("linux".parse::<Platform>(), Ok(Platform::Linux));
        assert_eq!("darwin".parse::<Platform>(), Ok(Platform::Mac));
        assert_eq!("Win32".parse::<Platform>(), Ok(Platform::Windows));
        assert!("beos".parse::<Platform>().is_err());
    }

    #[test]
    fn test_normalize_posix() {
        assert_eq!(normalize_path("/mnt//proj/", Platform::Linux), "/mnt/proj");
        assert_eq!(normalize_path("/mnt\\proj", Platform::Mac), "/mnt/proj");
        assert_eq!(normalize_path("/", Platform::Linux), "/");
    }

    #[test]
    fn test_normalize_windows() {
        assert_eq!(
            normalize_path("C:/proj//shots/", Platform::Windows),
            "C:\\proj\\shots"
        );
        assert_eq!(
            normalize_path("//server/share/", Platform::Windows),
            "\\\\server\\share"
        );
    }

    #[test]
    fn test_join() {
        assert_eq!(
            PathRoot::join("/mnt/proj", "shots/ABC", Platform::Linux),
            "/mnt/proj/shots/ABC"
        );
        assert_eq!(
            PathRoot::join("P:\\proj", "shots/ABC", Platform::Windows),
            "P:\\proj\\shots\\ABC"
        );
        assert_eq!(PathRoot::join("/mnt/proj", "", Platform::Linux), "/mnt/proj");
        assert_eq!(PathRoot::join("/", "shots", Platform::Linux), "/shots");
    }

    #[test]
    fn test_root_for_other_platform() {
        let root = PathRoot::new(Platform::Linux, "/mnt/proj");
        assert!(root.root_for(Platform::Windows).is_err());

        let mut roots = HashMap::new();
        roots.insert(Platform::Windows, "P:/proj/".to_string());
        let root = root.with_platform_roots(roots);
        assert_eq!(root.root_for(Platform::Windows), Ok("P:\\proj"));
        assert_eq!(root.root_for(Platform::Linux), Ok("/mnt/proj"));
        assert!(root.root_for(Platform::Mac).is_err());
    }
}
