mod spriterow;
mod video;

pub use spriterow::Spriterow;
pub use video::Video;

use crate::error::Error;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

/// 识别为图像的文件扩展名
const EXTENSION: &[&str] = &["png", "jpg", "jpeg"];

/// 列出文件夹下的图像文件，不进入子目录
fn list_images(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut paths = vec![];
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && has_extension(&path) {
            paths.push(path);
        }
    }
    Ok(paths)
}

/// 检查文件扩展名
fn has_extension(path: &Path) -> bool {
    if let Some(ref extension) = path.extension().and_then(OsStr::to_str) {
        return EXTENSION.iter().any(|x| x.eq_ignore_ascii_case(extension));
    }

    false
}
