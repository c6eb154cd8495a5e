mod cli;

use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use mini_fs::{MAX_FILE_SIZE, MiniFileSystem, StatKind};
use mini_fs_fuse::ImageFile;

use self::cli::{Cli, Command};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let cli = Cli::parse();
    let mut mfs = MiniFileSystem::boot(Arc::new(ImageFile::new()), &cli.image)?;
    let mutates = cli.command.mutates();

    match cli.command {
        Command::Format => mfs.format()?,
        Command::Ls { path } => {
            for dir_entry in mfs.read_dir(&path)? {
                println!("{:>6} {}", dir_entry.inode_id(), dir_entry.name());
            }
        }
        Command::Mkdir { path } => {
            mfs.mkdir(&path)?;
        }
        Command::Rmdir { path } => mfs.rmdir(&path)?,
        Command::Touch { path } => {
            mfs.create_file(&path)?;
        }
        Command::Rm { path } => mfs.unlink(&path)?,
        Command::Put { host, path } => put(&mut mfs, &host, &path)?,
        Command::Cat { path } => {
            let fd = mfs.open(&path)?;
            let mut buf = vec![0; MAX_FILE_SIZE];
            let len = mfs.read(fd, &mut buf)?;
            mfs.close(fd)?;
            io::stdout().write_all(&buf[..len])?;
        }
        Command::Stat { path } => {
            let stat = mfs.stat(&path)?;
            let kind = if stat.kind == StatKind::DIR {
                "directory"
            } else {
                "file"
            };
            println!(
                "inode={} kind={kind} size={} blocks={}",
                stat.inode, stat.size, stat.blocks
            );
        }
        Command::Df => {
            let usage = mfs.usage();
            println!("inodes: {}/{}", usage.inodes_used, usage.inodes_total);
            println!("blocks: {}/{}", usage.blocks_used, usage.blocks_total);
        }
        Command::Pack { source, target } => {
            println!("source={source:?}\ntarget={target:?}");
            for entry in fs::read_dir(&source)? {
                let entry = entry?;
                if !entry.file_type()?.is_file() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().into_owned();
                let path = format!("{}/{name}", target.trim_end_matches('/'));
                log::info!("packing {name:?} into {path:?}");
                put(&mut mfs, &entry.path(), &path)?;
            }
        }
    }

    if mutates {
        mfs.sync()?;
    }
    Ok(())
}

/// 已存在的同名文件先被删除
fn put(mfs: &mut MiniFileSystem, host: &Path, path: &str) -> Result<(), Box<dyn Error>> {
    let data = fs::read(host)?;
    match mfs.create_file(path) {
        Err(mini_fs::Error::AlreadyExists) => {
            mfs.unlink(path)?;
            mfs.create_file(path)?;
        }
        res => {
            res?;
        }
    }

    let fd = mfs.open(path)?;
    let written = mfs.write(fd, &data);
    mfs.close(fd)?;
    log::debug!("wrote {} bytes to {path:?}", written?);
    Ok(())
}
