//! Filesystem helpers.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Recursively copy the contents of `src` into `dst`, creating `dst` as
/// needed. File permissions are preserved, so copied executables stay
/// executable.
///
/// Symlinks are not followed. A relative link that stays inside the tree is
/// recreated as a link; any other link fails the copy with
/// `ErrorKind::InvalidInput`.
pub async fn copy_dir_all(src: &Path, dst: &Path) -> io::Result<()> {
    let mut pending: Vec<(PathBuf, PathBuf, usize)> =
        vec![(src.to_path_buf(), dst.to_path_buf(), 0)];

    while let Some((from, to, depth)) = pending.pop() {
        tokio::fs::create_dir_all(&to).await?;
        let mut entries = tokio::fs::read_dir(&from).await?;
        while let Some(entry) = entries.next_entry().await? {
            let src_path = entry.path();
            let dst_path = to.join(entry.file_name());
            let file_type = tokio::fs::symlink_metadata(&src_path).await?.file_type();
            if file_type.is_symlink() {
                copy_symlink(&src_path, &dst_path, depth).await?;
            } else if file_type.is_dir() {
                pending.push((src_path, dst_path, depth + 1));
            } else {
                tokio::fs::copy(&src_path, &dst_path).await.map_err(|e| {
                    io::Error::new(e.kind(), format!("{}: {}", src_path.display(), e))
                })?;
            }
        }
    }

    Ok(())
}

/// Recreate the link at `src_path` if its target resolves within the tree.
/// `depth` is the number of directories between the tree root and the link.
async fn copy_symlink(src_path: &Path, dst_path: &Path, depth: usize) -> io::Result<()> {
    let target = tokio::fs::read_link(src_path).await?;
    if !stays_inside(&target, depth) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "{}: symlink to {} points outside the copied tree",
                src_path.display(),
                target.display()
            ),
        ));
    }
    link(&target, dst_path)
        .await
        .map_err(|e| io::Error::new(e.kind(), format!("{}: {}", src_path.display(), e)))
}

fn stays_inside(target: &Path, depth: usize) -> bool {
    let mut level = depth;
    for component in target.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(_) => level += 1,
            Component::ParentDir => match level.checked_sub(1) {
                Some(up) => level = up,
                None => return false,
            },
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}

#[cfg(unix)]
async fn link(target: &Path, dst_path: &Path) -> io::Result<()> {
    tokio::fs::symlink(target, dst_path).await
}

#[cfg(not(unix))]
async fn link(target: &Path, dst_path: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("cannot recreate symlink {} -> {}", dst_path.display(), target.display()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_copy_dir_all_nested() {
        let src = TempDir::new().unwrap();
        std::fs::create_dir_all(src.path().join("bin/nested")).unwrap();
        std::fs::write(src.path().join("plugin.yaml"), "name: x").unwrap();
        std::fs::write(src.path().join("bin/nested/tool"), "#!/bin/sh").unwrap();

        let dst = TempDir::new().unwrap();
        let target = dst.path().join("out");
        copy_dir_all(src.path(), &target).await.unwrap();

        assert_eq!(std::fs::read_to_string(target.join("plugin.yaml")).unwrap(), "name: x");
        assert!(target.join("bin/nested/tool").is_file());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_copy_dir_all_keeps_mode() {
        use std::os::unix::fs::PermissionsExt;

        let src = TempDir::new().unwrap();
        let script = src.path().join("run.sh");
        std::fs::write(&script, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let dst = TempDir::new().unwrap();
        copy_dir_all(src.path(), dst.path()).await.unwrap();

        let mode = std::fs::metadata(dst.path().join("run.sh")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_stays_inside() {
        assert!(stays_inside(Path::new("tool"), 0));
        assert!(stays_inside(Path::new("./bin/tool"), 0));
        assert!(stays_inside(Path::new("../tool"), 1));
        assert!(!stays_inside(Path::new("../tool"), 0));
        assert!(!stays_inside(Path::new("bin/../../tool"), 0));
        assert!(!stays_inside(Path::new("/etc/passwd"), 3));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_copy_recreates_internal_symlink() {
        let src = TempDir::new().unwrap();
        std::fs::create_dir(src.path().join("bin")).unwrap();
        std::fs::write(src.path().join("tool"), "#!/bin/sh").unwrap();
        std::os::unix::fs::symlink("../tool", src.path().join("bin/tool")).unwrap();
        std::os::unix::fs::symlink("missing-target", src.path().join("dangling")).unwrap();

        let dst = TempDir::new().unwrap();
        copy_dir_all(src.path(), dst.path()).await.unwrap();

        let link = dst.path().join("bin/tool");
        assert!(std::fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read_link(&link).unwrap(), PathBuf::from("../tool"));
        assert_eq!(std::fs::read_to_string(&link).unwrap(), "#!/bin/sh");
        assert_eq!(
            std::fs::read_link(dst.path().join("dangling")).unwrap(),
            PathBuf::from("missing-target")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_copy_rejects_escaping_symlink() {
        let src = TempDir::new().unwrap();
        std::os::unix::fs::symlink("/etc", src.path().join("etc")).unwrap();

        let dst = TempDir::new().unwrap();
        let err = copy_dir_all(src.path(), dst.path()).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(err.to_string().contains("points outside the copied tree"));
        assert!(!dst.path().join("etc").exists());
    }

    #[tokio::test]
    async fn test_copy_missing_source() {
        let dst = TempDir::new().unwrap();
        let err = copy_dir_all(Path::new("/nonexistent/source/dir"), dst.path())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
