use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOS,
    Linux,
    Windows,
    Unknown,
}

pub fn detect() -> Platform {
    match std::env::consts::OS {
        "macos" => Platform::MacOS,
        "linux" => Platform::Linux,
        "windows" => Platform::Windows,
        _ => Platform::Unknown,
    }
}

pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

/// Where the game keeps its custom level saves.
///
/// Windows builds write under LocalLow; everything else goes through the
/// Unity player's config directory.
pub fn default_live_dir(platform: Platform, home: &std::path::Path) -> PathBuf {
    match platform {
        Platform::Windows => home
            .join("AppData")
            .join("LocalLow")
            .join("Basically Games")
            .join("Baldi's Basics Plus")
            .join("CustomLevels"),
        Platform::MacOS | Platform::Linux | Platform::Unknown => home
            .join(".config")
            .join("unity3d")
            .join("Basically Games")
            .join("Baldi's Basics Plus")
            .join("CustomLevels"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn windows_uses_local_low() {
        let dir = default_live_dir(Platform::Windows, Path::new("C:/Users/kim"));
        assert!(dir.ends_with("AppData/LocalLow/Basically Games/Baldi's Basics Plus/CustomLevels"));
    }

    #[test]
    fn unix_uses_unity_config_dir() {
        let dir = default_live_dir(Platform::Linux, Path::new("/home/kim"));
        assert_eq!(
            dir,
            Path::new("/home/kim/.config/unity3d/Basically Games/Baldi's Basics Plus/CustomLevels")
        );
    }
}
