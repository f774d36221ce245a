//! One record of the index file, and the stat data used to detect changes.
//!
//! An entry encodes as a 62-byte big-endian header followed by the path:
//!
//! ```text
//! ctime.s ctime.ns mtime.s mtime.ns dev ino mode uid gid size   (10 x u32)
//! object id                                                     (20 bytes)
//! flags                                                         (u16)
//! path, NUL padded to a multiple of 8                           (>= 1 NUL)
//! ```

use std::fs::Metadata;
use std::time::{SystemTime, UNIX_EPOCH};

use arbor_types::{FileMode, ObjectId, OBJECT_ID_LENGTH};

use crate::error::{IndexError, IndexResult};

/// Bytes before the path in every record.
pub const ENTRY_HEADER_LEN: usize = 62;

const ASSUME_VALID: u16 = 0x8000;
const EXTENDED: u16 = 0x4000;
const STAGE_MASK: u16 = 0x3000;
const STAGE_SHIFT: u16 = 12;
const NAME_MASK: u16 = 0x0fff;

/// Length of the record holding a path of `path_len` bytes.
pub fn record_len(path_len: usize) -> usize {
    (ENTRY_HEADER_LEN + path_len + 8) & !7
}

/// Merge slot of an entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Normal, fully merged entry.
    #[default]
    Merged = 0,
    /// Common ancestor version of a conflicted path.
    Base = 1,
    /// Our side of a conflicted path.
    Ours = 2,
    /// Their side of a conflicted path.
    Theirs = 3,
}

impl Stage {
    /// Decode the two stage bits.
    pub fn from_bits(bits: u16) -> Self {
        match bits & 0x3 {
            0 => Stage::Merged,
            1 => Stage::Base,
            2 => Stage::Ours,
            _ => Stage::Theirs,
        }
    }

    pub fn number(self) -> u8 {
        self as u8
    }
}

/// A timestamp as stored in the index: whole seconds and nanoseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryTime {
    pub seconds: u32,
    pub nanos: u32,
}

impl EntryTime {
    pub fn new(seconds: u32, nanos: u32) -> Self {
        Self { seconds, nanos }
    }

    /// Convert a system time. Times before the epoch become zero and
    /// seconds wrap at 32 bits, as git does.
    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(d) => Self::new(d.as_secs() as u32, d.subsec_nanos()),
            Err(_) => Self::default(),
        }
    }

    /// Compare two times, ignoring nanoseconds if either side lacks them.
    pub fn matches(&self, other: &EntryTime) -> bool {
        if self.nanos == 0 || other.nanos == 0 {
            self.seconds == other.seconds
        } else {
            self == other
        }
    }
}

/// File system data of a working tree file, compared against an entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FileStat {
    pub ctime: EntryTime,
    pub mtime: EntryTime,
    pub dev: u32,
    pub ino: u32,
    pub mode: FileMode,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
}

impl FileStat {
    /// Capture the stat data of a file. `meta` should come from
    /// `symlink_metadata` so links are seen as links.
    pub fn from_metadata(meta: &Metadata) -> Self {
        let mtime = meta
            .modified()
            .map(EntryTime::from_system_time)
            .unwrap_or_default();
        let mut stat = Self {
            mtime,
            ctime: mtime,
            size: meta.len(),
            mode: FileMode::REGULAR_FILE,
            ..Self::default()
        };
        if meta.file_type().is_symlink() {
            stat.mode = FileMode::SYMLINK;
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            stat.ctime = EntryTime::new(meta.ctime() as u32, meta.ctime_nsec() as u32);
            stat.dev = meta.dev() as u32;
            stat.ino = meta.ino() as u32;
            stat.uid = meta.uid();
            stat.gid = meta.gid();
            if stat.mode == FileMode::REGULAR_FILE && meta.mode() & 0o111 != 0 {
                stat.mode = FileMode::EXECUTABLE_FILE;
            }
        }
        stat
    }
}

/// One staged path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirCacheEntry {
    pub ctime: EntryTime,
    pub mtime: EntryTime,
    pub dev: u32,
    pub ino: u32,
    pub mode: FileMode,
    pub uid: u32,
    pub gid: u32,
    /// File size, truncated to 32 bits.
    pub size: u32,
    pub id: ObjectId,
    /// Skip stat checks for this path.
    pub assume_valid: bool,
    stage: Stage,
    path: Vec<u8>,
}

impl DirCacheEntry {
    /// Create an entry for a `/`-separated repository path.
    pub fn new(path: impl Into<Vec<u8>>, stage: Stage) -> IndexResult<Self> {
        let path = path.into();
        check_path(&path)?;
        Ok(Self::unchecked(path, stage))
    }

    /// Create a merged entry with a mode and blob id.
    pub fn with_object(path: impl Into<Vec<u8>>, mode: FileMode, id: ObjectId) -> IndexResult<Self> {
        let mut entry = Self::new(path, Stage::Merged)?;
        entry.mode = mode;
        entry.id = id;
        Ok(entry)
    }

    fn unchecked(path: Vec<u8>, stage: Stage) -> Self {
        Self {
            ctime: EntryTime::default(),
            mtime: EntryTime::default(),
            dev: 0,
            ino: 0,
            mode: FileMode::MISSING,
            uid: 0,
            gid: 0,
            size: 0,
            id: ObjectId::zero(),
            assume_valid: false,
            stage,
            path,
        }
    }

    pub fn path(&self) -> &[u8] {
        &self.path
    }

    /// The path, lossily decoded as UTF-8.
    pub fn path_string(&self) -> String {
        String::from_utf8_lossy(&self.path).into_owned()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Returns `true` for entries of an unresolved merge.
    pub fn is_unmerged(&self) -> bool {
        self.stage != Stage::Merged
    }

    /// Store a file length; only the low 32 bits are kept.
    pub fn set_length(&mut self, len: u64) {
        self.size = len as u32;
    }

    pub fn set_last_modified(&mut self, time: SystemTime) {
        self.mtime = EntryTime::from_system_time(time);
    }

    /// Copy cached stat fields from the working tree file.
    pub fn update_from_stat(&mut self, stat: &FileStat) {
        self.ctime = stat.ctime;
        self.mtime = stat.mtime;
        self.dev = stat.dev;
        self.ino = stat.ino;
        self.uid = stat.uid;
        self.gid = stat.gid;
        self.set_length(stat.size);
        if !self.mode.is_gitlink() {
            self.mode = stat.mode;
        }
    }

    /// Stat-based dirty check against a working tree file.
    ///
    /// Only mode, size, and modification time are compared. Entries marked
    /// assume-valid are never reported as modified.
    pub fn is_modified(&self, stat: &FileStat) -> bool {
        if self.assume_valid {
            return false;
        }
        if !self.mode.is_gitlink() && self.mode != stat.mode {
            return true;
        }
        self.size != stat.size as u32 || !self.mtime.matches(&stat.mtime)
    }

    // ---------------------------------------------------------------
    // Codec
    // ---------------------------------------------------------------

    /// Length of this entry's encoded record.
    pub fn encoded_len(&self) -> usize {
        record_len(self.path.len())
    }

    /// Append the encoded record to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        let start = out.len();
        for word in [
            self.ctime.seconds,
            self.ctime.nanos,
            self.mtime.seconds,
            self.mtime.nanos,
            self.dev,
            self.ino,
            self.mode.bits(),
            self.uid,
            self.gid,
            self.size,
        ] {
            out.extend_from_slice(&word.to_be_bytes());
        }
        out.extend_from_slice(self.id.as_bytes());

        let mut flags = self.path.len().min(NAME_MASK as usize) as u16;
        flags |= (self.stage.number() as u16) << STAGE_SHIFT;
        if self.assume_valid {
            flags |= ASSUME_VALID;
        }
        out.extend_from_slice(&flags.to_be_bytes());
        out.extend_from_slice(&self.path);
        out.resize(start + self.encoded_len(), 0);
    }

    /// Decode one record from the front of `buf`.
    ///
    /// Returns the entry and the number of bytes it occupied.
    pub fn decode(buf: &[u8]) -> IndexResult<(Self, usize)> {
        if buf.len() < ENTRY_HEADER_LEN {
            return Err(IndexError::Corrupt("truncated entry header".into()));
        }
        let flags = u16::from_be_bytes([buf[60], buf[61]]);
        let name_len = (flags & NAME_MASK) as usize;
        let tail = &buf[ENTRY_HEADER_LEN..];
        let path = if name_len < NAME_MASK as usize {
            tail.get(..name_len)
                .ok_or_else(|| IndexError::Corrupt("truncated entry path".into()))?
        } else {
            // Long paths store 0xFFF and end at the first NUL.
            let end = tail
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| IndexError::Corrupt("unterminated long entry path".into()))?;
            &tail[..end]
        };
        if flags & EXTENDED != 0 {
            return Err(IndexError::ExtendedFlags {
                path: String::from_utf8_lossy(path).into_owned(),
            });
        }
        let len = record_len(path.len());
        if buf.len() < len {
            return Err(IndexError::Corrupt("truncated entry padding".into()));
        }

        let word = |i: usize| u32::from_be_bytes([buf[i * 4], buf[i * 4 + 1], buf[i * 4 + 2], buf[i * 4 + 3]]);
        let id = ObjectId::from_raw_bytes(&buf[40..40 + OBJECT_ID_LENGTH])
            .map_err(|e| IndexError::Corrupt(e.to_string()))?;
        let stage = Stage::from_bits((flags & STAGE_MASK) >> STAGE_SHIFT);
        let mut entry = Self::unchecked(path.to_vec(), stage);
        entry.ctime = EntryTime::new(word(0), word(1));
        entry.mtime = EntryTime::new(word(2), word(3));
        entry.dev = word(4);
        entry.ino = word(5);
        entry.mode = FileMode::from_bits(word(6));
        entry.uid = word(7);
        entry.gid = word(8);
        entry.size = word(9);
        entry.id = id;
        entry.assume_valid = flags & ASSUME_VALID != 0;
        Ok((entry, len))
    }
}

/// Reject paths git would refuse to stage.
pub(crate) fn check_path(path: &[u8]) -> IndexResult<()> {
    let invalid = || IndexError::InvalidPath(String::from_utf8_lossy(path).into_owned());
    if path.is_empty() || path.contains(&0) {
        return Err(invalid());
    }
    for component in path.split(|&b| b == b'/') {
        if matches!(component, b"" | b"." | b"..") || component.eq_ignore_ascii_case(b".git") {
            return Err(invalid());
        }
    }
    Ok(())
}
