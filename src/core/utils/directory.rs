//! 路径处理

use std::path::{Component, Path, PathBuf};

/// 按字面规范化路径, 处理 `.` 和 `..`, 不访问文件系统
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                // 根目录之上的 `..` 被忽略
                normalized.pop();
            }
            Component::Normal(name) => normalized.push(name),
        }
    }
    normalized
}

/// 转为绝对路径后规范化
pub fn absolute_path(path: &Path) -> PathBuf {
    let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    normalize_path(&path)
}

/// 将相对路径解析到 root 之下
///
/// 解析结果不在 root 内部时返回 None
pub fn resolve_within(root: &Path, relative: &str) -> Option<PathBuf> {
    let root = absolute_path(root);
    let candidate = normalize_path(&root.join(relative));

    if candidate == root || !candidate.starts_with(&root) {
        return None;
    }
    Some(candidate)
}

/// 文件扩展名, 小写
pub fn extension_lowercase(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/a/b/../c/./d.png")),
            PathBuf::from("/a/c/d.png")
        );
        assert_eq!(normalize_path(Path::new("/../../x")), PathBuf::from("/x"));
    }

    #[test]
    fn test_resolve_within() {
        let root = Path::new("/comfy/input");
        assert_eq!(
            resolve_within(root, "sub/cat.png"),
            Some(PathBuf::from("/comfy/input/sub/cat.png"))
        );
        assert_eq!(
            resolve_within(root, "sub/../cat.png"),
            Some(PathBuf::from("/comfy/input/cat.png"))
        );
        assert_eq!(resolve_within(root, "../../etc/passwd"), None);
        assert_eq!(resolve_within(root, "../input2/cat.png"), None);
        assert_eq!(resolve_within(root, "/etc/passwd.png"), None);
        assert_eq!(resolve_within(root, "."), None);
    }

    #[test]
    fn test_extension_lowercase() {
        assert_eq!(extension_lowercase("a/B.PNG"), Some("png".to_string()));
        assert_eq!(extension_lowercase("noext"), None);
    }
}
