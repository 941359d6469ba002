use std::{fmt, io};
pub use Error::*;

#[derive(Debug)]
pub enum Error {
    /// 文件无法解码为图像或编码失败
    Image(image::ImageError),
    /// 文件读写错误
    Io(io::Error),
    /// 源图像没有透明通道，无法拆分压缩
    MissingAlphaChannel,
    /// 文件夹里没有可处理的图像文件
    EmptyFolder,
    /// 帧尺寸与首帧不一致
    FrameSizeMismatch,
    /// ffmpeg 启动或编码失败
    Ffmpeg(String),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    #[cold]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image(err) => write!(f, "{}", err),
            Self::Io(err) => write!(f, "{}", err),
            Self::MissingAlphaChannel => f.write_str("Missing_Alpha_Channel"),
            Self::EmptyFolder => f.write_str("Empty_Folder"),
            Self::FrameSizeMismatch => f.write_str("Frame_Size_Mismatch"),
            Self::Ffmpeg(message) => write!(f, "{}", message),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Error {
        Image(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Io(err)
    }
}
