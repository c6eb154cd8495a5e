use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
pub struct Cli {
    /// Disk image, created and formatted when missing
    #[arg(long, short, default_value = "disk.img")]
    pub image: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Wipe the volume
    Format,
    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },
    Mkdir { path: String },
    Rmdir { path: String },
    /// Create an empty file
    Touch { path: String },
    /// Remove a file
    Rm { path: String },
    /// Copy a host file into the volume
    Put { host: PathBuf, path: String },
    /// Print a file to stdout
    Cat { path: String },
    Stat { path: String },
    /// Show inode and data block usage
    Df,
    /// Copy every regular file of a host directory into a volume directory
    Pack {
        /// Host source directory
        #[arg(long, short)]
        source: PathBuf,

        /// Target directory inside the volume
        #[arg(long, short, default_value = "/")]
        target: String,
    },
}

impl Command {
    /// 只读的子命令结束时无需同步
    pub fn mutates(&self) -> bool {
        !matches!(
            self,
            Self::Ls { .. } | Self::Cat { .. } | Self::Stat { .. } | Self::Df
        )
    }
}
