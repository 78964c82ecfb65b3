use std::fs::File;
use std::io;

/// Positional write at an explicit absolute offset.
///
/// Workers share one output handle and write to disjoint byte ranges; writing
/// at explicit offsets instead of a shared cursor is what makes that safe
/// without a lock. No buffering, no retry; errors pass through from the OS
/// unchanged.
pub trait WriteAt {
    fn write_all_at(&self, buf: &[u8], offset: u64) -> io::Result<()>;
}

#[cfg(unix)]
impl WriteAt for File {
    fn write_all_at(&self, buf: &[u8], offset: u64) -> io::Result<()> {
        std::os::unix::fs::FileExt::write_all_at(self, buf, offset)
    }
}

#[cfg(windows)]
impl WriteAt for File {
    fn write_all_at(&self, mut buf: &[u8], mut offset: u64) -> io::Result<()> {
        use std::os::windows::fs::FileExt;

        while !buf.is_empty() {
            match self.seek_write(buf, offset) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "failed to write whole buffer",
                    ))
                }
                Ok(n) => {
                    buf = &buf[n..];
                    offset += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_land_at_requested_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let file = File::create(&path).unwrap();

        // written out of order, read back in order
        file.write_all_at(b"world", 5).unwrap();
        file.write_all_at(b"hello", 0).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"helloworld");
    }

    #[test]
    fn writing_past_the_end_leaves_a_gap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let file = File::create(&path).unwrap();

        file.write_all_at(b"x", 3).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"\0\0\0x");
    }
}
