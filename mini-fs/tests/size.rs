use std::mem;

use mini_fs::layout::{DirEntry, DiskInode, SuperBlock};

#[test]
fn layout() {
    assert_eq!(512, mem::size_of::<SuperBlock>());
    assert_eq!(128, mem::size_of::<DiskInode>());
    assert_eq!(20, mem::size_of::<DirEntry>());
}
