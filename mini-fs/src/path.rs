//! 绝对路径的拆分。路径只被解析，从不存储。

use alloc::vec::Vec;

use crate::layout::NAME_MAX_LEN;
use crate::{Error, Result};

/// 拆分绝对路径为各级名字，根目录得到空列表。
///
/// 末尾的`/`被忽略；空项、`.`、`..`以及含有`\0`的名字均不合法。
pub fn components(path: &str) -> Result<Vec<&str>> {
    if !path.starts_with('/') {
        return Err(Error::InvalidPath);
    }

    path.trim_end_matches('/')
        .split('/')
        .skip(1)
        .map(|cmp| match cmp {
            "" | "." | ".." => Err(Error::InvalidPath),
            // 目录项中的名字以 \0 结尾
            cmp if cmp.contains('\0') => Err(Error::InvalidPath),
            cmp => Ok(cmp),
        })
        .collect()
}

#[inline]
pub fn is_root(path: &str) -> Result<bool> {
    components(path).map(|cmps| cmps.is_empty())
}

/// 返回路径的`(父目录, 文件名)`，根目录没有父目录
pub fn parent_file(path: &str) -> Result<(&str, &str)> {
    if is_root(path)? {
        return Err(Error::InvalidPath);
    }

    let (parent, name) = path
        .trim_end_matches('/')
        .rsplit_once('/')
        .ok_or(Error::InvalidPath)?;
    let parent = if parent.is_empty() { "/" } else { parent };

    Ok((parent, name))
}

/// 名字须能放进目录项
pub fn check_name(name: &str) -> Result<()> {
    if name.len() > NAME_MAX_LEN {
        log::warn!("name {name:?} is longer than {NAME_MAX_LEN} bytes");
        return Err(Error::NameTooLong);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_components() {
        assert_eq!(components("/"), Ok(Vec::new()));
        assert_eq!(components("/usr"), Ok(alloc::vec!["usr"]));
        assert_eq!(components("/usr/bin/"), Ok(alloc::vec!["usr", "bin"]));
        assert_eq!(components("usr/bin"), Err(Error::InvalidPath));
        assert_eq!(components(""), Err(Error::InvalidPath));
        assert_eq!(components("/usr//bin"), Err(Error::InvalidPath));
        assert_eq!(components("/usr/../bin"), Err(Error::InvalidPath));
        assert_eq!(components("/usr/a\0"), Err(Error::InvalidPath));
        assert_eq!(components("/\0x/bin"), Err(Error::InvalidPath));
    }

    #[test]
    fn split_parent() {
        assert_eq!(parent_file("/a"), Ok(("/", "a")));
        assert_eq!(parent_file("/a/b/c"), Ok(("/a/b", "c")));
        assert_eq!(parent_file("/a/b/"), Ok(("/a", "b")));
        assert_eq!(parent_file("/"), Err(Error::InvalidPath));
        assert_eq!(parent_file("a/b"), Err(Error::InvalidPath));
    }

    #[test]
    fn name_length() {
        assert_eq!(check_name("fifteen_bytes__"), Ok(()));
        assert_eq!(check_name("sixteen_bytes___"), Err(Error::NameTooLong));
    }
}
