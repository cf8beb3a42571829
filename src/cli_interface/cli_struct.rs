use clap::Parser;

#[derive(Parser, Debug, PartialEq)]
#[command(author, version, about, long_about)]
pub enum TreeFsCli {
    /// create a disk image holding an empty file system
    Mkfs(MkfsArgs),
    /// open a disk image and run commands on it
    Shell(ShellArgs),
}

///make a new fs subcommand
#[derive(clap::Args, Debug, PartialEq)]
#[command(author, version, about = "make a new file system")]
pub struct MkfsArgs {
    /// the path of the file system image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
}

/// interactive shell subcommand
#[derive(clap::Args, Debug, PartialEq)]
#[command(author, version, about = "run commands on a file system")]
pub struct ShellArgs {
    /// the path of the file system image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
    /// format the image before mounting it
    #[clap(long)]
    pub format: bool,
    /// only write to the image on `save`
    #[clap(long)]
    pub no_auto_save: bool,
    /// maximum number of in-memory nodes
    #[clap(long)]
    pub node_limit: Option<usize>,
    /// log at debug level unless `RUST_LOG` says otherwise
    #[clap(short, long)]
    pub verbose: bool,
}


/// test `shell` subcommand
#[cfg(test)]
mod shell_parse_args_tests {
    use super::*;
    #[test]
    fn test_defaults() {
        let args = TreeFsCli::parse_from(["treefs", "shell", "-p", "disk.img"]);
        assert_eq!(
            args,
            TreeFsCli::Shell(ShellArgs {
                image_file_path: "disk.img".to_string(),
                format: false,
                no_auto_save: false,
                node_limit: None,
                verbose: false,
            })
        );
    }
    #[test]
    fn test_all_flags() {
        let args = TreeFsCli::parse_from([
            "treefs",
            "shell",
            "--image-file-path",
            "disk.img",
            "--format",
            "--no-auto-save",
            "--node-limit",
            "64",
            "-v",
        ]);
        assert_eq!(
            args,
            TreeFsCli::Shell(ShellArgs {
                image_file_path: "disk.img".to_string(),
                format: true,
                no_auto_save: true,
                node_limit: Some(64),
                verbose: true,
            })
        );
    }
    #[test]
    fn test_image_path_is_required() {
        assert!(TreeFsCli::try_parse_from(["treefs", "shell", "--format"]).is_err());
    }
}
