use crate::assemble::{Spriterow, Video};
use crate::cronch::Cronch;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::{env, path::PathBuf, process};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 旋转、缩放、平移序列帧，并按独立质量分别压缩颜色平面与透明通道
    Cronch {
        #[arg(
            short = 'p',
            long,
            help = "序列帧所在的文件夹路径，传入当前工作路径的相对路径。默认当前工作路径"
        )]
        path: Option<PathBuf>,

        #[arg(short = 'c', long, help = "0-100，颜色平面的压缩质量，默认 90")]
        chroma_quality: Option<u8>,

        #[arg(short = 'a', long, help = "0-100，透明通道的压缩质量，默认 90")]
        alpha_quality: Option<u8>,

        #[arg(short = 'o', long, help = "输出文件夹，默认工作路径上级的 .mesne")]
        output: Option<PathBuf>,
    },

    /// 从处理好的帧里均匀采样，横向拼接成一行精灵图
    Spriterow {
        #[arg(short = 'p', long, help = "帧所在的文件夹路径，默认 .mesne")]
        path: Option<PathBuf>,

        #[arg(short = 'n', long, help = "采样的帧数量，默认 16")]
        count: Option<usize>,

        #[arg(
            short = 's',
            long,
            help = "输出文件名后缀，生成 row_<suffix>.png，默认 0"
        )]
        suffix: Option<String>,

        #[arg(short = 'o', long, help = "输出文件夹，默认 spritesheets")]
        output: Option<PathBuf>,
    },

    /// 把文件夹里的图像按名称顺序合成 MP4 视频
    Video {
        #[arg(short = 'p', long, help = "图像所在的文件夹路径，默认 .rendered")]
        path: Option<PathBuf>,

        #[arg(short = 'f', long, help = "视频帧率，默认 30")]
        fps: Option<u32>,

        #[arg(short = 'o', long, help = "输出视频文件，默认 output_video.mp4")]
        output: Option<PathBuf>,
    },
}

/// 处理命令行参数
pub fn args_handle() {
    // 获取命令行参数
    let args = Args::parse();

    match args.command {
        Commands::Cronch {
            path,
            chroma_quality,
            alpha_quality,
            output,
        } => {
            // 获取工作路径
            let path = if let Some(path) = path {
                path
            } else {
                env::current_dir().unwrap()
            };

            // 实例化批处理结构体
            let mut cronch = Cronch::new(&path, output, chroma_quality, alpha_quality);
            // 处理序列帧
            cronch.process();
        }
        Commands::Spriterow {
            path,
            count,
            suffix,
            output,
        } => {
            let path = path.unwrap_or_else(|| PathBuf::from(".mesne"));
            let spriterow = Spriterow::new(&path, count, suffix, output);
            if let Err(err) = spriterow.generate() {
                eprintln!("{} {}", "Error:".red(), err);
                process::exit(1);
            }
        }
        Commands::Video { path, fps, output } => {
            let path = path.unwrap_or_else(|| PathBuf::from(".rendered"));
            let video = Video::new(&path, fps, output);
            if let Err(err) = video.render() {
                eprintln!("{} {}", "Error:".red(), err);
                process::exit(1);
            }
        }
    }
}
