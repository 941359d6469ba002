use super::{Quality, TransformOptions, Transformer};
use crate::error::Error;
use crate::thread::{ThreadPool, WorkStatus};
use colored::Colorize;
use std::ffi::OsStr;
use std::fs::{self, DirEntry};
use std::io::{self, Write};
use std::ops::Div;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::mpsc;
use std::thread::available_parallelism;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug)]
pub struct Cronch<'a> {
    /// 序列帧所在的文件夹
    path: &'a Path,
    /// 输出文件夹，默认工作路径上级的 .mesne
    output: PathBuf,
    /// 颜色平面与透明通道的压缩质量
    quality: Quality,
    /// 固定的几何变换参数
    options: TransformOptions,
    /// 文件扩展名，用于检测图像文件
    extension: &'a [&'a str],
    /// 扫描到的图像文件路径都保存到这里
    worklist: Vec<Work>,
    /// 线程池
    thread_pool: ThreadPool,
    /// 记录完成的工作任务
    end_num: usize,
    /// 工作开始时间
    start_time: u128,
}

impl<'a> Cronch<'a> {
    pub fn new(
        path: &'a Path,
        output: Option<PathBuf>,
        chroma_quality: Option<u8>,
        alpha_quality: Option<u8>,
    ) -> Cronch<'a> {
        // 系统并行资源
        let available_parallelism = available_parallelism().unwrap().get();
        // 根据并行资源数量创建线程池
        let thread_pool = ThreadPool::new(available_parallelism);

        let start_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis();

        // 默认输出到工作路径上级的 .mesne 文件夹
        let output = output.unwrap_or_else(|| path.parent().unwrap_or(path).join(".mesne"));

        Cronch {
            path,
            output,
            quality: Quality::new(chroma_quality, alpha_quality),
            options: TransformOptions::default(),
            extension: &["png", "jpg", "jpeg"],
            worklist: vec![],
            thread_pool,
            end_num: 0,
            start_time,
        }
    }

    /// 遍历工作路径下的所有目录文件
    fn visit_dirs(&self, dir: &Path, cb: &mut dyn FnMut(DirEntry)) -> io::Result<()> {
        match dir.metadata() {
            Ok(_) => {
                for entry in fs::read_dir(dir)? {
                    let entry = entry?;
                    let path = entry.path();
                    if path.is_dir() {
                        // 输出文件夹不参与扫描
                        if path != self.output {
                            self.visit_dirs(&path, cb)?;
                        }
                    } else {
                        cb(entry);
                    }
                }
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// 遍历目录查找图像文件
    fn iterate_images(&self, entry: DirEntry, paths: &mut Vec<DirEntry>) {
        // 文件扩展名是否是图像文件
        if self.has_extension(&entry.path()) {
            // 是图像文件存入数组
            paths.push(entry)
        }
    }

    /// 检查文件扩展名
    fn has_extension(&self, path: &Path) -> bool {
        if let Some(ref extension) = path.extension().and_then(OsStr::to_str) {
            return self
                .extension
                .iter()
                .any(|x| x.eq_ignore_ascii_case(extension));
        }

        false
    }

    /// 生成工作列表
    fn generate_worklist(&mut self) {
        let mut entries: Vec<DirEntry> = vec![];
        let result = self.visit_dirs(self.path, &mut |entry| {
            self.iterate_images(entry, &mut entries)
        });
        if let Err(err) = result {
            // 输入文件夹不存在时直接中止
            eprintln!("{} {}: {}", "Error:".red(), self.path.display(), err);
            process::exit(1);
        }

        // 按文件名排序
        entries.sort_by_key(|entry| entry.path());
        self.worklist = entries
            .into_iter()
            .enumerate()
            .map(|(id, path)| Work {
                id,
                path,
                status: WorkStatus::INIT,
                progress: 0,
            })
            .collect();
    }

    /// 执行数组中的工作任务
    fn run_worklist(&mut self) {
        if self.worklist.is_empty() {
            println!("No files found in {}.", self.path.display());
            return;
        }
        if let Err(err) = fs::create_dir_all(&self.output) {
            eprintln!("{} {}: {}", "Error:".red(), self.output.display(), err);
            process::exit(1);
        }

        let (progress_sender, progress_receiver) = mpsc::sync_channel(self.worklist.len());
        let (outcome_sender, outcome_receiver) = mpsc::sync_channel(self.worklist.len());
        let progress_total = self.worklist.len() as f64 * crate::PROGRESS_CONSTANT;
        let pbstr = "\u{25A0}".repeat(20).to_string();
        let pbwid = "-".repeat(20).to_string();
        let mut outcomes: Vec<Outcome> = vec![];

        // 主线程循环不断检查工作任务状态
        loop {
            for work in self.worklist.iter_mut() {
                // 只执行初始化的工作任务
                if let WorkStatus::INIT = work.status {
                    // 开始执行，工作任务状态改为等待
                    work.status = WorkStatus::WAIT;
                    let path = work.path.path();
                    let output = self.output.clone();
                    let options = self.options;
                    let quality = self.quality;
                    let progress_sender = progress_sender.clone();
                    let outcome_sender = outcome_sender.clone();
                    let id = work.id;
                    // 多线程执行工作任务
                    self.thread_pool.execute(
                        move || {
                            let transformer = Transformer::new(
                                id,
                                &path,
                                &options,
                                quality,
                                progress_sender.clone(),
                            );
                            let result = transformer.process(&output);
                            match &result {
                                Ok(output_path) => {
                                    println!(
                                        "Saving processed image to: {}",
                                        output_path.display()
                                    )
                                }
                                Err(err) => {
                                    println!(
                                        "{} Could not process image {}. Error: {}",
                                        "Warning:".yellow(),
                                        path.display(),
                                        err
                                    );
                                    // 跳过的任务也计入总进度
                                    let _ = progress_sender.send(Progress { id, value: 100.0 });
                                }
                            }
                            outcome_sender.send(Outcome { id, result }).unwrap();
                        },
                        work.id,
                    )
                }
            }

            // 检查通道消息，执行工作的线程任务结束后将发消息到此通道
            if let Ok(status) = self.thread_pool.status_receiver.try_recv() {
                // 确定是哪个工作任务发出的消息
                let work = self.worklist.iter_mut().find(|work| work.id == status.id);
                if let Some(work) = work {
                    // 将工作任务状态改为已结束
                    work.status = WorkStatus::End;
                    self.end_num += 1;
                }
            };

            if let Ok(progress) = progress_receiver.try_recv() {
                let work = self.worklist.iter_mut().find(|work| work.id == progress.id);
                if let Some(work) = work {
                    // 改变工作进度
                    work.progress = progress.value.round() as usize;
                    self.update_progress_bar(progress_total, &pbstr, &pbwid);
                }
            }

            if let Ok(outcome) = outcome_receiver.try_recv() {
                outcomes.push(outcome);
            }

            // 判断是否所有任务已完成
            if self.worklist.len() == self.end_num {
                // 把通道里剩余的结果取完
                while let Ok(outcome) = outcome_receiver.try_recv() {
                    outcomes.push(outcome);
                }
                self.update_progress_bar(progress_total, &pbstr, &pbwid);

                let current_time = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap()
                    .as_millis();

                let second: f64 = ((current_time - self.start_time) as f64).div(crate::SECOND_CONSTANT);
                print!("\n");
                println!("Total time: {}s", second);
                self.report_skipped(&outcomes);
                println!("Complete all work");
                // 退出循环
                break;
            }
        }
    }

    /// 汇总被跳过的文件
    fn report_skipped(&self, outcomes: &[Outcome]) {
        let skipped: Vec<&Outcome> = outcomes
            .iter()
            .filter(|outcome| outcome.result.is_err())
            .collect();
        if skipped.is_empty() {
            return;
        }

        println!("{} {} file(s) skipped:", "Warning:".yellow(), skipped.len());
        for outcome in skipped {
            let work = self.worklist.iter().find(|work| work.id == outcome.id);
            if let (Some(work), Err(err)) = (work, &outcome.result) {
                println!("  {}: {}", work.path.path().display(), err);
            }
        }
    }

    /// 更新进度条
    fn update_progress_bar(&self, progress_total: f64, pbstr: &String, pbwid: &String) {
        let current_value = self
            .worklist
            .iter()
            .map(move |f| f.progress)
            .fold(0, |acc, x| acc + x) as f64;
        let perc = current_value / progress_total;
        let lpad = (perc * 20.00).floor();

        print!(
            "\rProcessing data: {}{} {}%",
            &pbstr[0..'\u{25A0}'.len_utf8() * (lpad.trunc() as usize)],
            &pbwid[0..((20.0 - lpad).trunc() as usize)],
            (perc * 100.0).trunc()
        );
        io::stdout().flush().unwrap();
    }

    /// 处理序列帧
    pub fn process(&mut self) {
        self.generate_worklist();
        self.run_worklist();
    }
}

#[derive(Debug)]
struct Work {
    // 工作id
    id: usize,
    // 工作路径
    path: DirEntry,
    // 工作状态
    status: WorkStatus,
    // 工作进度
    pub progress: usize,
}

/// 工作进度消息
#[derive(Debug)]
pub struct Progress {
    /// 工作id
    pub id: usize,
    /// 当前进度 0-100
    pub value: f32,
}

/// 单个帧的处理结果，成功时带输出文件路径，失败时带跳过原因
#[derive(Debug)]
struct Outcome {
    /// 工作id
    id: usize,
    result: Result<PathBuf, Error>,
}
