use std::fs::{self, create_dir_all, File};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

pub fn ensure_dir_exists(p: &Path) -> io::Result<()> {
    if p.exists() {
        return Ok(());
    }

    create_dir_all(p)
}

/// Check to see if the given pathlike type has the given extension
pub fn path_has_ext<P: AsRef<Path> + ?Sized>(p: &P, ext: &str) -> bool {
    let path = p.as_ref();
    path.extension().map_or(false, |it| it == ext)
}

/// Calls `to_str` on the path and returns the string, panicking if that fails
pub fn path_must_str(path: &Path) -> &str {
    path.to_str().expect("valid paths")
}

/// Returns the filename of the path and panics if that fails
pub fn path_must_name(path: &Path) -> &str {
    path.file_name()
        .expect("valid paths")
        .to_str()
        .expect("valid paths")
}

/// Path of the rewritten copy of an archive: `dir/app.apk` becomes
/// `dir/app_modified.apk`.
pub fn modified_archive_path(archive: &Path) -> crate::Result<PathBuf> {
    let stem = archive
        .file_stem()
        .and_then(|it| it.to_str())
        .ok_or_else(|| crate::Error::BadPath(archive.to_path_buf()))?;
    let name = match archive.extension().and_then(|it| it.to_str()) {
        Some(ext) => format!("{}_modified.{}", stem, ext),
        None => format!("{}_modified", stem),
    };
    Ok(archive.with_file_name(name))
}

pub fn open_file(path: &Path) -> crate::Result<File> {
    match File::open(path) {
        Ok(v) => Ok(v),
        Err(e) => match e.kind() {
            ErrorKind::NotFound => Err(crate::Error::MissingFile(path_must_str(path).into())),
            _ => Err(e.into()),
        },
    }
}

pub fn read_file(path: &Path) -> crate::Result<String> {
    match fs::read_to_string(path) {
        Ok(v) => Ok(v),
        Err(e) => match e.kind() {
            ErrorKind::NotFound => Err(crate::Error::MissingFile(path_must_str(path).into())),
            _ => Err(e.into()),
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{tmp_dir, TmpDir};
    use rstest::*;

    #[rstest]
    fn test_path_has_ext() {
        let path = PathBuf::from("path").join("to").join("test.apk");
        assert!(path_has_ext(&path, "apk"));
        let path = "/path/to/test.apk";
        assert!(path_has_ext(path, "apk"));
        assert!(!path_has_ext("/path/to/test.jimple.bak", "jimple"));
    }

    #[test]
    fn test_modified_archive_path() {
        let path = PathBuf::from("/tmp/out/app.apk");
        assert_eq!(
            modified_archive_path(&path).unwrap(),
            PathBuf::from("/tmp/out/app_modified.apk")
        );
        let path = PathBuf::from("bundle");
        assert_eq!(
            modified_archive_path(&path).unwrap(),
            PathBuf::from("bundle_modified")
        );
    }

    #[rstest]
    fn test_read_file_missing(tmp_dir: TmpDir) {
        let missing = tmp_dir.get_path().join("nope.xml");
        match read_file(&missing) {
            Err(crate::Error::MissingFile(_)) => {}
            other => panic!("expected MissingFile, got {:?}", other),
        }
        let present = tmp_dir.create_file_name("yes.xml", Some("<a/>"));
        assert_eq!(read_file(&present).unwrap(), "<a/>");
    }
}
