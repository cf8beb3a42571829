//! a line interpreter over a [FileSystem] session, one command per line
use std::fmt::Display;

use log::debug;

use crate::{device::SectorDevice, FileKind, FileSystem, FsError};

const HELP: &[&str] = &[
    "mkdir <name>            make a folder",
    "touch <name> [content]  make a file, the rest of the line is its content",
    "cat <name>              print a file",
    "ls                      list the current folder",
    "cd <name|..>            enter a folder",
    "rm <name>               remove a file",
    "rmdir <name>            remove an empty folder",
    "edit <name> [content]   replace the content of a file",
    "save                    write the whole tree to the drive",
    "load                    rebuild the tree from the drive",
    "diskinfo                show drive usage",
    "memstats                show memory usage",
    "pwd                     print the current folder",
    "help                    show this help",
];

/// output of one command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub lines: Vec<String>,
    pub is_error: bool,
}

impl Reply {
    fn ok(lines: Vec<String>) -> Self {
        Reply {
            lines,
            is_error: false,
        }
    }

    fn line(line: impl Display) -> Self {
        Self::ok(vec![line.to_string()])
    }

    fn error(line: impl Display) -> Self {
        Reply {
            lines: vec![line.to_string()],
            is_error: true,
        }
    }
}

impl From<FsError> for Reply {
    fn from(err: FsError) -> Self {
        Reply::error(format!("error {}: {err}", err.code()))
    }
}

// `name` then the untouched rest of the line
fn split_word(args: &str) -> (&str, &str) {
    match args.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (args, ""),
    }
}

fn need_name<'a>(command: &str, args: &'a str) -> Result<(&'a str, &'a str), Reply> {
    let (name, rest) = split_word(args);
    if name.is_empty() {
        Err(Reply::error(format!("usage: {command} <name>")))
    } else {
        Ok((name, rest))
    }
}

/// run one command line against `fs`
pub fn execute<D: SectorDevice>(fs: &mut FileSystem<D>, line: &str) -> Reply {
    let (command, args) = split_word(line.trim());
    debug!("shell command {command:?} with arguments {args:?}");
    match run(fs, command, args) {
        Ok(reply) | Err(reply) => reply,
    }
}

fn run<D: SectorDevice>(
    fs: &mut FileSystem<D>,
    command: &str,
    args: &str,
) -> Result<Reply, Reply> {
    let reply = match command {
        "" => Reply::default(),
        "mkdir" => {
            let (name, _) = need_name(command, args)?;
            fs.make_dir(name)?;
            Reply::line(format!("folder {name} made"))
        }
        "touch" => {
            let (name, content) = need_name(command, args)?;
            fs.make_file(name, content.as_bytes())?;
            Reply::line(format!("file {name} made"))
        }
        "cat" => {
            let (name, _) = need_name(command, args)?;
            let content = fs.read_file(name)?;
            Reply::line(String::from_utf8_lossy(&content))
        }
        "ls" => {
            let lines = fs
                .list()
                .into_iter()
                .map(|entry| match entry.kind {
                    FileKind::Folder => format!("{}/  ({} entries)", entry.name, entry.size),
                    FileKind::File => format!("{}  ({} bytes)", entry.name, entry.size),
                })
                .collect();
            Reply::ok(lines)
        }
        "cd" => {
            let (name, _) = need_name(command, args)?;
            fs.change_dir(name)?;
            Reply::line(fs.pwd())
        }
        "rm" => {
            let (name, _) = need_name(command, args)?;
            fs.remove(name)?;
            Reply::line(format!("file {name} removed"))
        }
        "rmdir" => {
            let (name, _) = need_name(command, args)?;
            fs.remove_dir(name)?;
            Reply::line(format!("folder {name} removed"))
        }
        "edit" => {
            let (name, content) = need_name(command, args)?;
            fs.edit_file(name, content.as_bytes())?;
            Reply::line(format!("file {name} written"))
        }
        "save" => {
            fs.save_to_disk()?;
            Reply::line("saved")
        }
        "load" => {
            fs.load_from_disk()?;
            Reply::line("loaded")
        }
        "diskinfo" => {
            let info = fs.disk_info()?;
            Reply::ok(info.to_string().lines().map(str::to_owned).collect())
        }
        "memstats" => Reply::line(fs.mem_stats()),
        "pwd" => Reply::line(fs.pwd()),
        "help" => Reply::ok(HELP.iter().map(|line| line.to_string()).collect()),
        _ => Reply::error(format!("unknown command {command:?}, try help")),
    };
    Ok(reply)
}
