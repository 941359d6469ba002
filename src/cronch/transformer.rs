use image::buffer::ConvertBuffer;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{GrayImage, ImageFormat, Luma, RgbImage, Rgba, RgbaImage};
use imageproc::geometric_transformations::{rotate_about_center, warp, Interpolation, Projection};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::SyncSender;

use super::{Progress, Quality, TransformOptions};
use crate::error::Error;

/// 旋转扩出与平移露出的区域统一填充全透明
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// 单帧处理结构体。
///
/// 按固定顺序对一帧执行几何变换，再拆分颜色平面与透明通道分别做一次
/// 有损压缩，最后合并写入输出文件夹。
pub struct Transformer<'a> {
    /// 源图像路径
    pub path: &'a Path,
    /// 工作任务id
    id: usize,
    /// 几何变换参数
    options: &'a TransformOptions,
    /// 两个通道的压缩质量
    quality: Quality,
    progress_sender: SyncSender<Progress>,
}

impl<'a> Transformer<'a> {
    pub fn new(
        id: usize,
        path: &'a Path,
        options: &'a TransformOptions,
        quality: Quality,
        progress_sender: SyncSender<Progress>,
    ) -> Transformer<'a> {
        Transformer {
            path,
            id,
            options,
            quality,
            progress_sender,
        }
    }

    /// 处理一帧，返回输出文件路径。任何失败只影响这一帧
    pub fn process(&self, output_folder: &Path) -> Result<PathBuf, Error> {
        let image = image::open(self.path)?;
        // 没有透明通道的图像无法拆分压缩，跳过
        if !image.color().has_alpha() {
            return Err(Error::MissingAlphaChannel);
        }
        self.progress(10.0);

        let transformed = self.transform(&image.to_rgba8());
        self.progress(40.0);

        let (rgb, alpha) = self.cronch(&transformed)?;
        self.progress(80.0);

        let combined = recombine(&rgb, &alpha);
        let output_path = self.save(&combined, output_folder)?;
        self.progress(100.0);

        Ok(output_path)
    }

    /// 按固定顺序执行旋转、缩放、平移，顺序不可调换
    fn transform(&self, image: &RgbaImage) -> RgbaImage {
        let rotated = self.rotate(image);
        let resized = imageops::resize(
            &rotated,
            self.options.width,
            self.options.height,
            FilterType::Nearest,
        );
        self.translate(&resized)
    }

    /// 旋转时扩展画布，保证内容不被裁掉
    fn rotate(&self, image: &RgbaImage) -> RgbaImage {
        let (width, height) = image.dimensions();
        let radians = self.options.angle.to_radians();
        let (sin, cos) = (radians.sin().abs(), radians.cos().abs());
        // 旋转后内容的包围盒
        let new_width = (width as f32 * cos + height as f32 * sin).ceil() as u32;
        let new_height = (width as f32 * sin + height as f32 * cos).ceil() as u32;

        let mut canvas = RgbaImage::from_pixel(new_width, new_height, TRANSPARENT);
        imageops::replace(
            &mut canvas,
            image,
            (new_width as i64 - width as i64) / 2,
            (new_height as i64 - height as i64) / 2,
        );

        // rotate_about_center 正角度是顺时针，取负得到逆时针
        rotate_about_center(&canvas, -radians, Interpolation::Bicubic, TRANSPARENT)
    }

    /// 平移画布内容，画布尺寸不变，移出的内容丢弃
    fn translate(&self, image: &RgbaImage) -> RgbaImage {
        let projection = Projection::translate(self.options.offset_x, self.options.offset_y);
        warp(image, &projection, Interpolation::Nearest, TRANSPARENT)
    }

    /// 拆分颜色平面与透明通道，各自在内存里做一次有损往返
    fn cronch(&self, image: &RgbaImage) -> Result<(RgbImage, GrayImage), Error> {
        let rgb: RgbImage = image.convert();
        let alpha = alpha_channel(image);

        let rgb = jpeg_roundtrip_rgb(&rgb, self.quality.chroma)?;
        let alpha = jpeg_roundtrip_luma(&alpha, self.quality.alpha)?;

        Ok((rgb, alpha))
    }

    /// 先写临时文件再改名，输出文件不会出现半写状态
    fn save(&self, image: &RgbaImage, output_folder: &Path) -> Result<PathBuf, Error> {
        let file_name = self.path.file_name().unwrap();
        let format = ImageFormat::from_path(self.path)?;
        let output_path = output_folder.join(file_name);

        let mut tmp_name = OsString::from(".");
        tmp_name.push(file_name);
        tmp_name.push(".tmp");
        let tmp_path = output_folder.join(&tmp_name);

        if let Err(err) = image.save_with_format(&tmp_path, format) {
            // 写失败时不留下残缺文件
            let _ = fs::remove_file(&tmp_path);
            return Err(Error::Image(err));
        }
        fs::rename(&tmp_path, &output_path)?;

        Ok(output_path)
    }

    /// 上报当前工作进度
    fn progress(&self, value: f32) {
        let _ = self.progress_sender.send(Progress {
            id: self.id,
            value,
        });
    }
}

/// 提取透明通道为单通道灰度图
fn alpha_channel(image: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([image.get_pixel(x, y)[3]])
    })
}

/// 颜色平面在内存里编码再解码一次 JPEG
fn jpeg_roundtrip_rgb(image: &RgbImage, quality: u8) -> Result<RgbImage, Error> {
    let mut buf = Vec::new();
    // JPEG 编码器的质量下限是 1
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.max(1));
    image.write_with_encoder(encoder)?;
    let decoded = image::load_from_memory_with_format(&buf, ImageFormat::Jpeg)?;
    Ok(decoded.to_rgb8())
}

/// 透明通道按灰度图在内存里编码再解码一次 JPEG
fn jpeg_roundtrip_luma(image: &GrayImage, quality: u8) -> Result<GrayImage, Error> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.max(1));
    image.write_with_encoder(encoder)?;
    let decoded = image::load_from_memory_with_format(&buf, ImageFormat::Jpeg)?;
    Ok(decoded.to_luma8())
}

/// 用透明通道的压缩结果逐像素覆盖颜色图的透明通道。
///
/// 两张图都来自同一张变换后的帧，尺寸不一致说明流程本身出了逻辑错误。
fn recombine(rgb: &RgbImage, alpha: &GrayImage) -> RgbaImage {
    assert_eq!(rgb.dimensions(), alpha.dimensions());

    let mut combined: RgbaImage = rgb.convert();
    for (pixel, alpha) in combined.pixels_mut().zip(alpha.pixels()) {
        pixel[3] = alpha[0];
    }
    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use std::sync::mpsc::{self, Receiver};
    use tempfile::tempdir;

    /// 带纹理的全不透明测试图
    fn opaque_image(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([
                (x * 7 % 256) as u8,
                (y * 5 % 256) as u8,
                ((x + y) % 256) as u8,
                255,
            ])
        })
    }

    fn progress_channel() -> (SyncSender<Progress>, Receiver<Progress>) {
        mpsc::sync_channel(64)
    }

    #[test]
    fn output_is_target_resolution() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        let options = TransformOptions::default();

        for (name, width, height) in [("a.png", 256u32, 256u32), ("b.png", 64, 32)] {
            let path = input.path().join(name);
            opaque_image(width, height).save(&path).unwrap();

            let (sender, _receiver) = progress_channel();
            let transformer =
                Transformer::new(0, &path, &options, Quality::new(Some(90), Some(90)), sender);
            let output_path = transformer.process(output.path()).unwrap();

            let image = image::open(output_path).unwrap();
            assert_eq!((image.width(), image.height()), (128, 128));
            assert!(image.color().has_alpha());
        }
    }

    #[test]
    fn geometric_pipeline_is_deterministic() {
        let options = TransformOptions::default();
        let (sender, _receiver) = progress_channel();
        let path = Path::new("unused.png");
        let transformer = Transformer::new(0, path, &options, Quality::new(None, None), sender);

        let image = opaque_image(96, 64);
        let first = transformer.transform(&image);
        let second = transformer.transform(&image);
        assert_eq!(first.as_raw(), second.as_raw());
    }

    #[test]
    fn jpeg_size_does_not_shrink_as_quality_rises() {
        let image: RgbImage = opaque_image(128, 128).convert();
        let mut sizes = vec![];
        for quality in [10u8, 50, 95] {
            let mut buf = Vec::new();
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
            image.write_with_encoder(encoder).unwrap();
            sizes.push(buf.len());
        }
        assert!(sizes[0] <= sizes[1]);
        assert!(sizes[1] <= sizes[2]);
    }

    #[test]
    fn missing_alpha_channel_skips_file() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        let path = input.path().join("rgb.png");
        let rgb: RgbImage = opaque_image(64, 64).convert();
        rgb.save(&path).unwrap();

        let options = TransformOptions::default();
        let (sender, _receiver) = progress_channel();
        let transformer = Transformer::new(0, &path, &options, Quality::new(None, None), sender);
        let result = transformer.process(output.path());

        assert!(matches!(result, Err(Error::MissingAlphaChannel)));
        assert_eq!(fs::read_dir(output.path()).unwrap().count(), 0);
    }

    #[test]
    fn corrupt_file_reports_error_and_leaves_no_output() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        let path = input.path().join("broken.png");
        fs::write(&path, b"not an image").unwrap();

        let options = TransformOptions::default();
        let (sender, _receiver) = progress_channel();
        let transformer = Transformer::new(0, &path, &options, Quality::new(None, None), sender);
        let result = transformer.process(output.path());

        assert!(matches!(result, Err(Error::Image(_))));
        assert_eq!(fs::read_dir(output.path()).unwrap().count(), 0);
    }

    #[test]
    fn recombine_copies_channels_exactly() {
        let rgb = RgbImage::from_fn(16, 16, |x, y| Rgb([x as u8, y as u8, 7]));
        let alpha = GrayImage::from_fn(16, 16, |x, y| Luma([(x * 16 + y) as u8]));

        let combined = recombine(&rgb, &alpha);
        for (x, y, pixel) in combined.enumerate_pixels() {
            let Rgb([r, g, b]) = *rgb.get_pixel(x, y);
            assert_eq!(pixel, &Rgba([r, g, b, alpha.get_pixel(x, y)[0]]));
        }
    }

    #[test]
    fn opaque_input_keeps_opaque_interior() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        let path = input.path().join("frame.png");
        opaque_image(256, 256).save(&path).unwrap();

        let options = TransformOptions::default();
        let (sender, _receiver) = progress_channel();
        let transformer =
            Transformer::new(0, &path, &options, Quality::new(Some(90), Some(90)), sender);
        let output_path = transformer.process(output.path()).unwrap();

        let image = image::open(&output_path).unwrap().to_rgba8();
        assert_eq!(image.dimensions(), (128, 128));
        // 平移后内容中心在 (52, 38) 附近，旋转补出的透明角都在边缘，
        // 中心区域应接近全不透明（质量 90 允许少量波动）
        for y in 33..43 {
            for x in 47..57 {
                assert!(image.get_pixel(x, y)[3] > 200);
            }
        }
        assert_eq!(fs::read_dir(output.path()).unwrap().count(), 1);
    }
}
