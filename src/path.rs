//! Destination path derivation.
//!
//! Only the bare file name of an archive entry is kept, so
//! `Data/VehicleImages/ship.png` and `Other/ship.png` resolve to the same
//! destination and the second one is treated as a duplicate by the pipeline.
//! Existing imports rely on this flattening.

/// Strip every directory component (`/` or `\`) from an entry name.
pub fn file_name(entry_name: &str) -> &str {
    match entry_name.rfind(['/', '\\']) {
        Some(pos) => &entry_name[pos + 1..],
        None => entry_name,
    }
}

/// Join the bare file name of `entry_name` onto `destination_folder`.
pub fn resolve(destination_folder: &str, entry_name: &str) -> String {
    let folder = destination_folder.trim_end_matches('/');
    format!("{}/{}", folder, file_name(entry_name))
}

/// Name of the converted file: the last extension replaced by `.webp`.
pub fn webp_file_name(entry_name: &str) -> String {
    let name = file_name(entry_name);
    let stem = match name.rfind('.') {
        Some(pos) if pos > 0 => &name[..pos],
        _ => name,
    };
    format!("{}.webp", stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_directories() {
        assert_eq!(resolve("worlds/img", "sub/dir/cat.png"), "worlds/img/cat.png");
        assert_eq!(resolve("worlds/img", "cat.png"), "worlds/img/cat.png");
        assert_eq!(resolve("worlds/img", "win\\style\\cat.png"), "worlds/img/cat.png");
    }

    #[test]
    fn trailing_slash_on_folder() {
        assert_eq!(
            resolve("modules/webp-converter/", "a/b.gif"),
            "modules/webp-converter/b.gif"
        );
    }

    #[test]
    fn same_basename_collides() {
        assert_eq!(resolve("f", "one/ship.png"), resolve("f", "two/ship.png"));
    }

    #[test]
    fn webp_names() {
        assert_eq!(webp_file_name("Data/ship.png"), "ship.webp");
        assert_eq!(webp_file_name("archive.tar.gz"), "archive.tar.webp");
        assert_eq!(webp_file_name("noext"), "noext.webp");
        assert_eq!(webp_file_name(".hidden"), ".hidden.webp");
        assert_eq!(webp_file_name("done.webp"), "done.webp");
    }
}
