use super::list_images;
use crate::error::Error;
use colored::Colorize;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

/// 视频合成结构体，把文件夹里的图像按名称顺序合成 MP4。
///
/// 调用系统的 ffmpeg，把解码后的帧按 rawvideo 流入其标准输入。
#[derive(Debug)]
pub struct Video<'a> {
    /// 图像所在的文件夹
    path: &'a Path,
    /// 视频帧率
    fps: u32,
    /// 输出视频文件
    output: PathBuf,
}

impl<'a> Video<'a> {
    pub fn new(path: &'a Path, fps: Option<u32>, output: Option<PathBuf>) -> Video<'a> {
        Video {
            path,
            fps: fps.unwrap_or(30).max(1),
            output: output.unwrap_or_else(|| PathBuf::from("output_video.mp4")),
        }
    }

    /// 合成视频，返回输出文件路径
    pub fn render(&self) -> Result<PathBuf, Error> {
        let mut files = list_images(self.path)?;
        if files.is_empty() {
            return Err(Error::EmptyFolder);
        }
        files.sort();

        // 首帧决定视频尺寸
        let first = image::open(&files[0])?.to_rgb8();
        let (width, height) = first.dimensions();
        // yuv420p 输出要求宽高都是偶数
        if width % 2 != 0 || height % 2 != 0 {
            return Err(Error::Ffmpeg(format!(
                "video dimensions must be even, got {}x{}",
                width, height
            )));
        }

        let mut command = Command::new("ffmpeg");
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .args(ffmpeg_args(width, height, self.fps))
            .arg(&self.output);

        let mut child = command.spawn().map_err(|err| {
            Error::Ffmpeg(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {}",
                err
            ))
        })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Ffmpeg(String::from("failed to open ffmpeg stdin")))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Ffmpeg(String::from("failed to open ffmpeg stderr")))?;
        // 单独的线程排空 stderr
        let stderr_drain = thread::spawn(move || {
            let mut bytes = Vec::new();
            let _ = stderr.read_to_end(&mut bytes);
            bytes
        });

        for file in files.iter() {
            let frame = match image::open(file) {
                Ok(image) => image.to_rgb8(),
                Err(err) => {
                    println!(
                        "{} Could not read image {}. Error: {}",
                        "Warning:".yellow(),
                        file.display(),
                        err
                    );
                    continue;
                }
            };
            // 尺寸和首帧不一致的帧跳过
            if frame.dimensions() != (width, height) {
                println!(
                    "{} Skipping {}: frame size {}x{} does not match {}x{}",
                    "Warning:".yellow(),
                    file.display(),
                    frame.width(),
                    frame.height(),
                    width,
                    height
                );
                continue;
            }
            stdin.write_all(frame.as_raw()).map_err(|err| {
                Error::Ffmpeg(format!("failed to write frame to ffmpeg: {}", err))
            })?;
        }

        // 关闭标准输入让 ffmpeg 收尾
        drop(stdin);
        let status = child.wait()?;
        let stderr_bytes = stderr_drain.join().unwrap_or_default();
        if !status.success() {
            return Err(Error::Ffmpeg(
                String::from_utf8_lossy(&stderr_bytes).trim().to_string(),
            ));
        }

        println!("Video saved as {}", self.output.display());
        Ok(self.output.clone())
    }
}

/// rawvideo rgb24 输入，libx264 yuv420p 输出
fn ffmpeg_args(width: u32, height: u32, fps: u32) -> Vec<String> {
    let size = format!("{}x{}", width, height);
    let rate = fps.to_string();
    let args = [
        "-y",
        "-loglevel",
        "error",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgb24",
        "-s",
        size.as_str(),
        "-r",
        rate.as_str(),
        "-i",
        "pipe:0",
        "-an",
        "-c:v",
        "libx264",
        "-pix_fmt",
        "yuv420p",
        "-movflags",
        "+faststart",
    ];
    args.iter().map(|arg| arg.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::tempdir;

    #[test]
    fn ffmpeg_args_describe_raw_rgb_input() {
        let args = ffmpeg_args(128, 128, 30);
        assert!(args.contains(&String::from("rawvideo")));
        assert!(args.contains(&String::from("rgb24")));
        assert!(args.contains(&String::from("128x128")));
        assert!(args.contains(&String::from("30")));
        assert!(args.contains(&String::from("libx264")));
        assert!(args.contains(&String::from("yuv420p")));
    }

    #[test]
    fn odd_dimensions_are_rejected_before_spawning() {
        let input = tempdir().unwrap();
        let image = RgbaImage::from_pixel(9, 9, Rgba([0, 0, 0, 255]));
        image.save(input.path().join("a.png")).unwrap();

        let video = Video::new(input.path(), None, Some(input.path().join("out.mp4")));
        assert!(matches!(video.render(), Err(Error::Ffmpeg(_))));
        assert!(!input.path().join("out.mp4").exists());
    }

    #[test]
    fn empty_folder_is_an_error() {
        let input = tempdir().unwrap();
        let video = Video::new(input.path(), None, None);
        assert!(matches!(video.render(), Err(Error::EmptyFolder)));
    }
}
