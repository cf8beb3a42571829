use std::io::{self, BufRead, Write};

use anyhow::Context;
use clap::Parser;
use log::info;
use treefs::{
    cli_interface::{ShellArgs, TreeFsCli},
    device::ImageFile,
    shell, FileSystem, FsOptions,
};

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// a CLI interface to users to create our filesystem in an image file,
/// or open one and run commands on it.
fn main() -> anyhow::Result<()> {
    let args = TreeFsCli::parse();
    let verbose = matches!(&args, TreeFsCli::Shell(shell_args) if shell_args.verbose);
    let mut logger = env_logger::builder();
    logger.format_timestamp_nanos();
    if verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    // `RUST_LOG` still wins over `--verbose`
    logger.parse_default_env().init();

    match args {
        TreeFsCli::Mkfs(args) => {
            treefs::mkfs::mkfs(&args.image_file_path)?;
            println!("{GREEN}created {}{RESET}", args.image_file_path);
        }
        TreeFsCli::Shell(args) => run_shell(args)?,
    }
    Ok(())
}

fn run_shell(args: ShellArgs) -> anyhow::Result<()> {
    let image = if args.format && !std::path::Path::new(&args.image_file_path).exists() {
        ImageFile::create(&args.image_file_path)
    } else {
        ImageFile::open(&args.image_file_path)
    }
    .with_context(|| format!("opening image file {}", args.image_file_path))?;

    let options = FsOptions {
        auto_save: !args.no_auto_save,
        node_limit: args.node_limit,
    };
    let mut fs = FileSystem::with_options(image, options)?;
    if args.format {
        fs.format(0)?;
    } else {
        fs.mount(0)?;
        fs.load_from_disk()?;
    }
    info!("shell started on {}", args.image_file_path);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();
    loop {
        write!(stdout, "{}> ", fs.pwd())?;
        stdout.flush()?;
        // EOF ends the session like `exit`
        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line = line?;
        if matches!(line.trim(), "exit" | "quit") {
            break;
        }
        let reply = shell::execute(&mut fs, &line);
        let color = if reply.is_error { RED } else { GREEN };
        for line in reply.lines {
            println!("{color}{line}{RESET}");
        }
    }
    Ok(())
}
