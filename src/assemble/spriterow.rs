use super::list_images;
use crate::error::Error;
use image::imageops;
use image::RgbaImage;
use std::fs;
use std::path::{Path, PathBuf};

/// 精灵图拼接结构体，把处理好的帧横向拼成一行
#[derive(Debug)]
pub struct Spriterow<'a> {
    /// 帧所在的文件夹
    path: &'a Path,
    /// 采样的帧数量
    count: usize,
    /// 输出文件名后缀
    suffix: String,
    /// 输出文件夹
    output: PathBuf,
}

impl<'a> Spriterow<'a> {
    pub fn new(
        path: &'a Path,
        count: Option<usize>,
        suffix: Option<String>,
        output: Option<PathBuf>,
    ) -> Spriterow<'a> {
        Spriterow {
            path,
            count: count.unwrap_or(16).max(1),
            suffix: suffix.unwrap_or_else(|| String::from("0")),
            output: output.unwrap_or_else(|| PathBuf::from("spritesheets")),
        }
    }

    /// 按名称排序后均匀采样，拼接成一行保存
    pub fn generate(&self) -> Result<PathBuf, Error> {
        let mut files = list_images(self.path)?;
        if files.is_empty() {
            return Err(Error::EmptyFolder);
        }
        files.sort();

        let mut frames: Vec<RgbaImage> = vec![];
        for index in sample_indices(files.len(), self.count) {
            println!("Adding image: {}", files[index].display());
            frames.push(image::open(&files[index])?.to_rgba8());
        }

        // 所有帧的尺寸必须一致
        let (width, height) = frames[0].dimensions();
        for frame in frames.iter() {
            if frame.dimensions() != (width, height) {
                return Err(Error::FrameSizeMismatch);
            }
        }

        let mut sprite_sheet = RgbaImage::new(width * frames.len() as u32, height);
        for (index, frame) in frames.iter().enumerate() {
            imageops::replace(&mut sprite_sheet, frame, index as i64 * width as i64, 0);
        }

        fs::create_dir_all(&self.output)?;
        let filename = self.output.join(format!("row_{}.png", self.suffix));
        sprite_sheet.save(&filename)?;
        println!(
            "Sprite sheet created successfully and saved to '{}'",
            filename.display()
        );

        Ok(filename)
    }
}

/// 从 `len` 个帧里均匀取 `count` 个下标，首尾都会取到
fn sample_indices(len: usize, count: usize) -> Vec<usize> {
    if len == 0 || count == 0 {
        return vec![];
    }
    if count >= len {
        return (0..len).collect();
    }
    if count == 1 {
        return vec![0];
    }
    (0..count).map(|i| i * (len - 1) / (count - 1)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::tempdir;

    fn save_frame(dir: &Path, name: &str, color: Rgba<u8>) {
        let image = RgbaImage::from_pixel(8, 8, color);
        image.save(dir.join(name)).unwrap();
    }

    #[test]
    fn sample_indices_are_evenly_spread() {
        assert_eq!(sample_indices(16, 16), (0..16).collect::<Vec<usize>>());
        assert_eq!(sample_indices(4, 16), vec![0, 1, 2, 3]);
        assert_eq!(sample_indices(90, 2), vec![0, 89]);
        assert_eq!(sample_indices(90, 1), vec![0]);
        assert_eq!(sample_indices(0, 16), Vec::<usize>::new());

        let indices = sample_indices(90, 16);
        assert_eq!(indices.len(), 16);
        assert_eq!(indices[0], 0);
        assert_eq!(indices[15], 89);
    }

    #[test]
    fn generates_one_row_in_sorted_order() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        let red = Rgba([255, 0, 0, 255]);
        let blue = Rgba([0, 0, 255, 255]);
        let green = Rgba([0, 255, 0, 255]);
        let white = Rgba([255, 255, 255, 255]);
        // 乱序写入，拼接时按名称排序
        save_frame(input.path(), "0004.png", white);
        save_frame(input.path(), "0001.png", red);
        save_frame(input.path(), "0003.png", green);
        save_frame(input.path(), "0002.png", blue);

        let spriterow = Spriterow::new(
            input.path(),
            Some(2),
            Some(String::from("test")),
            Some(output.path().to_path_buf()),
        );
        let filename = spriterow.generate().unwrap();

        assert_eq!(filename, output.path().join("row_test.png"));
        let sheet = image::open(&filename).unwrap().to_rgba8();
        // 采样首尾两帧，拼成 16×8
        assert_eq!(sheet.dimensions(), (16, 8));
        assert_eq!(sheet.get_pixel(0, 0), &red);
        assert_eq!(sheet.get_pixel(8, 0), &white);
    }

    #[test]
    fn mismatched_frame_sizes_are_rejected() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        save_frame(input.path(), "0001.png", Rgba([255, 0, 0, 255]));
        let big = RgbaImage::from_pixel(16, 16, Rgba([0, 0, 255, 255]));
        big.save(input.path().join("0002.png")).unwrap();

        let spriterow = Spriterow::new(input.path(), None, None, Some(output.path().to_path_buf()));
        assert!(matches!(
            spriterow.generate(),
            Err(Error::FrameSizeMismatch)
        ));
    }

    #[test]
    fn empty_folder_is_an_error() {
        let input = tempdir().unwrap();
        let spriterow = Spriterow::new(input.path(), None, None, None);
        assert!(matches!(spriterow.generate(), Err(Error::EmptyFolder)));
    }
}
