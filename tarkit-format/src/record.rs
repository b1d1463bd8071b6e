use std::fmt;

pub const TYPE_FILE: u8 = b'0';
pub const TYPE_FILE_OLD: u8 = 0;
pub const TYPE_HARD_LINK: u8 = b'1';
pub const TYPE_SYMLINK: u8 = b'2';
pub const TYPE_DIRECTORY: u8 = b'5';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
    /// Any other type flag (links, devices, FIFOs, vendor extensions). Read
    /// and skipped, never restored.
    Other(u8),
}

impl EntryKind {
    #[inline(always)]
    pub fn type_flag(self) -> u8 {
        match self {
            EntryKind::File => TYPE_FILE,
            EntryKind::Directory => TYPE_DIRECTORY,
            EntryKind::Other(flag) => flag,
        }
    }

    #[inline(always)]
    pub fn from_type_flag(flag: u8) -> EntryKind {
        match flag {
            TYPE_FILE | TYPE_FILE_OLD => EntryKind::File,
            TYPE_DIRECTORY => EntryKind::Directory,
            flag => EntryKind::Other(flag),
        }
    }

    #[inline(always)]
    pub fn default_mode(self) -> u32 {
        match self {
            EntryKind::Directory => 0o755,
            _ => 0o644,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::File => f.write_str("file"),
            EntryKind::Directory => f.write_str("directory"),
            EntryKind::Other(TYPE_SYMLINK) => f.write_str("symlink"),
            EntryKind::Other(TYPE_HARD_LINK) => f.write_str("hardlink"),
            EntryKind::Other(flag) if flag.is_ascii_graphic() => {
                write!(f, "type '{}'", *flag as char)
            }
            EntryKind::Other(flag) => write!(f, "type {:#04x}", flag),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    /// The in-archive path. Always `/`-separated and relative; directory
    /// names carry no trailing separator once read.
    pub name: String,

    pub kind: EntryKind,

    /// The exact length of the entry data, ignoring block padding.
    pub size: u64,

    pub mode: u32,

    /// Seconds since the Unix epoch.
    pub mtime: u64,

    /// Target of a link entry. Empty for files and directories.
    pub link_name: String,
}

impl EntryHeader {
    pub fn new<S: Into<String>>(name: S, kind: EntryKind, size: u64) -> EntryHeader {
        EntryHeader {
            name: name.into(),
            kind,
            size,
            mode: kind.default_mode(),
            mtime: 0,
            link_name: String::new(),
        }
    }

    #[inline(always)]
    pub fn directory<S: Into<String>>(name: S) -> EntryHeader {
        EntryHeader::new(name, EntryKind::Directory, 0)
    }

    #[inline(always)]
    pub fn file<S: Into<String>>(name: S, size: u64) -> EntryHeader {
        EntryHeader::new(name, EntryKind::File, size)
    }

    #[inline(always)]
    pub fn with_mtime(mut self, mtime: u64) -> EntryHeader {
        self.mtime = mtime;
        self
    }

    #[inline(always)]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    #[inline(always)]
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}
