//! # 磁盘数据结构层
//!
//! mini-fs 的磁盘布局(以扇区计)：
//!
//! | 0 | 1..=2 | 3..=4 | 5..=2052 | 2053.. |
//! |---|---|---|---|---|
//! | 超级块 | 索引节点位图 | 数据块位图 | 索引节点区域 | 数据块区域 |

mod super_block;
pub use super_block::SuperBlock;

mod bitmap;
pub use bitmap::Bitmap;

mod inode;
pub use inode::{DiskInode, DiskInodeKind, INODE_SIZE, INODES_PER_SECTOR};

/// 目录项，也属于磁盘文件系统数据结构
mod dir_entry;
pub use dir_entry::{DirEntry, NAME_MAX_LEN};
