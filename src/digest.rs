// File digests for the image checksum properties.
//
// The file is streamed through the hasher with io::copy so images of
// any size hash in constant memory.
use crypto::digest::Digest;
use crypto::md5::Md5;
use crypto::sha2::Sha256;
use std::fs::File;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Algorithm {
    Sha256,
    Md5,
}

/// Lowercase hex digest plus the number of bytes that went into it.
#[derive(Debug, Clone, PartialEq)]
pub struct FileDigest {
    pub hex: String,
    pub size: u64,
}

struct HashingWriter<D: Digest> {
    // implement Write but only feed the hasher, nothing is stored.
    digest: D,
    size: u64,
}

impl<D: Digest> HashingWriter<D> {
    fn new(digest: D) -> HashingWriter<D> {
        HashingWriter { digest, size: 0 }
    }

    fn finish(mut self) -> FileDigest {
        FileDigest {
            hex: self.digest.result_str(),
            size: self.size,
        }
    }
}

impl<D: Digest> std::io::Write for HashingWriter<D> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.digest.input(buf);
        self.size += buf.len() as u64;
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn hash_reader<D: Digest, R: std::io::Read>(digest: D, reader: &mut R) -> std::io::Result<FileDigest> {
    let mut writer = HashingWriter::new(digest);
    std::io::copy(reader, &mut writer)?;
    Ok(writer.finish())
}

/// Reads the whole file at `path` and digests it with `algorithm`.
/// The handle is closed before returning.
pub fn file_digest(path: &Path, algorithm: Algorithm) -> std::io::Result<FileDigest> {
    let mut file = File::open(path)?;
    match algorithm {
        Algorithm::Sha256 => hash_reader(Sha256::new(), &mut file),
        Algorithm::Md5 => hash_reader(Md5::new(), &mut file),
    }
}
