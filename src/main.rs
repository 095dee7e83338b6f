use ReactorODE::ReactorsIVP::BatchReactorODE::ReactorError;
use ReactorODE::ReactorsIVP::reactor_task::BatchReactorTask;
use log::{LevelFilter, error, info};
use simplelog::{ColorChoice, Config, SimpleLogger, TermLogger, TerminalMode};
use std::env;
use std::process;

const USAGE: &str = "usage: ReactorODE <task.json> [solution.json]";

fn init_logger() {
    if TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .is_err()
    {
        let _ = SimpleLogger::init(LevelFilter::Info, Config::default());
    }
}

fn run(task_path: &str, output: Option<&String>) -> Result<(), ReactorError> {
    let task = BatchReactorTask::from_file(task_path)?;
    task.pretty_print_task();
    let solution = task.solve()?;
    solution.pretty_print(20);
    if let Some(path) = output {
        solution.save_json(path)?;
    }
    Ok(())
}

pub fn main() {
    init_logger();
    let args: Vec<String> = env::args().collect();
    let Some(task_path) = args.get(1) else {
        eprintln!("{}", USAGE);
        process::exit(2);
    };
    info!("running task {}", task_path);
    if let Err(e) = run(task_path, args.get(2)) {
        error!("{}", e);
        process::exit(1);
    }
}
