mod assemble;
mod command;
mod cronch;
mod error;
mod thread;

/// 单个工作任务的进度总量
const PROGRESS_CONSTANT: f64 = 100.00;
/// 转换毫秒为秒
const SECOND_CONSTANT: f64 = 1000.00;

fn main() {
    command::args_handle();
}
