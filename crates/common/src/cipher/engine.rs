use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::codec;
use crate::crypto::pre::{self, Capsule, PreError, VerifiedCapsuleFrag, CIPHERTEXT_OVERHEAD};
use crate::crypto::{PublicKey, SecretKey};

use super::{CipherError, DecryptionKeys};

/// Plaintext bytes per chunk (and so per capsule) unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 100_000_000;
/// Chunks processed concurrently per batch.
pub const DEFAULT_WORKERS: usize = 4;
/// Largest accepted chunk size. Chunk sizes also arrive inside uploaded key
/// bundles, so they are bounded before any buffer is sized from them.
pub const MAX_CHUNK_SIZE: usize = 1 << 30;

/// Streams files through PRE encryption one batch of chunks at a time.
///
/// At most `workers` chunks are held in memory and processed concurrently.
/// Results of a batch are reassembled in chunk order before anything is
/// written, so the output never depends on which worker finishes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkedCipher {
    chunk_size: usize,
    workers: usize,
}

impl Default for ChunkedCipher {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: DEFAULT_WORKERS,
        }
    }
}

impl ChunkedCipher {
    /// `chunk_size` must be positive and split evenly across `workers`.
    pub fn new(chunk_size: usize, workers: usize) -> Result<Self, CipherError> {
        if workers == 0 {
            return Err(CipherError::InvalidConfig(
                "worker count must be positive".into(),
            ));
        }
        check_chunk_size(chunk_size)?;
        if chunk_size % workers != 0 {
            return Err(CipherError::InvalidConfig(format!(
                "chunk size {} is not divisible by {} workers",
                chunk_size, workers
            )));
        }
        Ok(Self {
            chunk_size,
            workers,
        })
    }

    /// A cipher for ciphertext produced with `chunk_size`, running on the
    /// largest worker count up to `max_workers` that divides it.
    pub fn fitted(chunk_size: usize, max_workers: usize) -> Result<Self, CipherError> {
        check_chunk_size(chunk_size)?;
        let workers = (1..=max_workers.max(1))
            .rev()
            .find(|workers| chunk_size % workers == 0)
            .unwrap_or(1);
        Self::new(chunk_size, workers)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Encrypt `input` to `owner`, writing ciphertext to `output`.
    ///
    /// Returns one capsule per chunk, in chunk order. Empty input yields no
    /// chunks and no capsules.
    pub fn encrypt<R: Read, W: Write>(
        &self,
        owner: &PublicKey,
        mut input: R,
        mut output: W,
    ) -> Result<Vec<Capsule>, CipherError> {
        let mut capsules = Vec::new();

        loop {
            let (batch, exhausted) = read_batch(&mut input, self.chunk_size, self.workers)?;
            let first = capsules.len();

            for_each_ordered(
                first,
                batch,
                |index, chunk| {
                    pre::encrypt(owner, &chunk).map_err(|source| CipherError::Crypto { index, source })
                },
                |(capsule, ciphertext)| {
                    output.write_all(&ciphertext)?;
                    capsules.push(capsule);
                    Ok(())
                },
            )?;

            if exhausted {
                break;
            }
        }

        output.flush()?;
        tracing::debug!(chunks = capsules.len(), "encrypted file");
        Ok(capsules)
    }

    /// Decrypt ciphertext produced for the owner of `keys`, using translated
    /// keys issued to `receiver`.
    ///
    /// Every translated key is verified before any ciphertext is read, so a
    /// bad key anywhere in the list fails the call with nothing written.
    /// Ciphertext is still authenticated chunk by chunk; use
    /// [`decrypt_file`](Self::decrypt_file) when a corrupt later chunk must
    /// not leave earlier plaintext behind.
    pub fn decrypt<R: Read, W: Write>(
        &self,
        keys: &DecryptionKeys,
        receiver: &SecretKey,
        input: R,
        output: W,
    ) -> Result<(), CipherError> {
        keys.validate()?;
        let owner = keys.owner_pubkey()?;
        let verifying_key = keys.verifying_key()?;
        let capsules = codec::decode_capsules(&keys.capsules)?;
        let cfrags = codec::decode_capsule_frags(&keys.translated_keys)?;

        let receiving = receiver.public();
        let verified = capsules
            .into_iter()
            .zip(cfrags)
            .enumerate()
            .map(|(index, (capsule, cfrag))| {
                pre::verify_fragment(&receiving, &owner, &verifying_key, &capsule, cfrag)
                    .map(|verified| (capsule, verified))
                    .map_err(|source| CipherError::Crypto { index, source })
            })
            .collect::<Result<Vec<(Capsule, VerifiedCapsuleFrag)>, _>>()?;

        self.decrypt_chunks(
            input,
            output,
            keys.chunk_size,
            verified,
            |(capsule, verified), ciphertext| {
                pre::decrypt_verified(receiver, &owner, &capsule, verified, &ciphertext)
            },
        )
    }

    /// Decrypt with the owner's own key, no translated keys needed.
    pub fn decrypt_original<R: Read, W: Write>(
        &self,
        owner: &SecretKey,
        capsules: Vec<Capsule>,
        chunk_size: usize,
        input: R,
        output: W,
    ) -> Result<(), CipherError> {
        check_chunk_size(chunk_size)?;
        self.decrypt_chunks(input, output, chunk_size, capsules, |capsule, ciphertext| {
            pre::decrypt_original(owner, &capsule, &ciphertext)
        })
    }

    fn decrypt_chunks<R, W, K, F>(
        &self,
        mut input: R,
        mut output: W,
        chunk_size: usize,
        keys: Vec<K>,
        open: F,
    ) -> Result<(), CipherError>
    where
        R: Read,
        W: Write,
        K: Send,
        F: Fn(K, Vec<u8>) -> Result<Vec<u8>, PreError> + Sync,
    {
        let expected = keys.len();
        let ciphertext_chunk = ciphertext_chunk_size(chunk_size)?;
        let mut keys = keys.into_iter();
        let mut seen = 0;

        loop {
            let (chunks, exhausted) = read_batch(&mut input, ciphertext_chunk, self.workers)?;

            let mut batch = Vec::with_capacity(chunks.len());
            for chunk in chunks {
                if chunk.len() <= CIPHERTEXT_OVERHEAD {
                    return Err(CipherError::TruncatedChunk(chunk.len()));
                }
                let key = keys.next().ok_or(CipherError::ChunkCountMismatch {
                    expected,
                    found: seen + batch.len() + 1,
                })?;
                batch.push((key, chunk));
            }

            let first = seen;
            seen += batch.len();
            for_each_ordered(
                first,
                batch,
                |index, (key, chunk)| {
                    open(key, chunk).map_err(|source| CipherError::Crypto { index, source })
                },
                |plaintext| {
                    output.write_all(&plaintext)?;
                    Ok(())
                },
            )?;

            if exhausted {
                break;
            }
        }

        if seen != expected {
            return Err(CipherError::ChunkCountMismatch {
                expected,
                found: seen,
            });
        }

        output.flush()?;
        tracing::debug!(chunks = seen, "decrypted file");
        Ok(())
    }

    /// Encrypt a file on disk. The output appears only once complete.
    pub fn encrypt_file(
        &self,
        owner: &PublicKey,
        input: &Path,
        output: &Path,
    ) -> Result<Vec<Capsule>, CipherError> {
        let reader = BufReader::new(File::open(input)?);
        write_atomically(output, |writer| self.encrypt(owner, reader, writer))
    }

    /// Decrypt a file on disk with translated keys. On any failure no output
    /// file is left behind.
    pub fn decrypt_file(
        &self,
        keys: &DecryptionKeys,
        receiver: &SecretKey,
        input: &Path,
        output: &Path,
    ) -> Result<(), CipherError> {
        keys.validate()?;
        check_chunk_count(input, keys.chunk_size, keys.capsules.len())?;
        let reader = BufReader::new(File::open(input)?);
        write_atomically(output, |writer| self.decrypt(keys, receiver, reader, writer))
    }

    /// Decrypt a file on disk with the owner's key.
    pub fn decrypt_original_file(
        &self,
        owner: &SecretKey,
        capsules: Vec<Capsule>,
        chunk_size: usize,
        input: &Path,
        output: &Path,
    ) -> Result<(), CipherError> {
        check_chunk_count(input, chunk_size, capsules.len())?;
        let reader = BufReader::new(File::open(input)?);
        write_atomically(output, |writer| {
            self.decrypt_original(owner, capsules, chunk_size, reader, writer)
        })
    }
}

/// Number of chunks a ciphertext of `len` bytes holds for `chunk_size`.
pub(crate) fn chunk_count(len: u64, chunk_size: usize) -> Result<usize, CipherError> {
    let ciphertext_chunk = ciphertext_chunk_size(chunk_size)? as u64;
    let full = len / ciphertext_chunk;
    let rest = len % ciphertext_chunk;
    if rest == 0 {
        return Ok(full as usize);
    }
    if rest <= CIPHERTEXT_OVERHEAD as u64 {
        return Err(CipherError::TruncatedChunk(rest as usize));
    }
    Ok(full as usize + 1)
}

/// Rejects chunk sizes outside `1..=MAX_CHUNK_SIZE`.
pub(crate) fn check_chunk_size(chunk_size: usize) -> Result<(), CipherError> {
    if chunk_size == 0 {
        return Err(CipherError::InvalidConfig(
            "chunk size must be positive".into(),
        ));
    }
    if chunk_size > MAX_CHUNK_SIZE {
        return Err(CipherError::InvalidConfig(format!(
            "chunk size {} exceeds the maximum of {}",
            chunk_size, MAX_CHUNK_SIZE
        )));
    }
    Ok(())
}

fn ciphertext_chunk_size(chunk_size: usize) -> Result<usize, CipherError> {
    check_chunk_size(chunk_size)?;
    chunk_size
        .checked_add(CIPHERTEXT_OVERHEAD)
        .ok_or_else(|| CipherError::InvalidConfig(format!("chunk size {} overflows", chunk_size)))
}

fn check_chunk_count(input: &Path, chunk_size: usize, expected: usize) -> Result<(), CipherError> {
    let found = chunk_count(fs::metadata(input)?.len(), chunk_size)?;
    if found != expected {
        return Err(CipherError::ChunkCountMismatch { expected, found });
    }
    Ok(())
}

/// Read up to `count` chunks of `chunk_size` bytes. The flag is set once the
/// reader is exhausted.
fn read_batch<R: Read>(
    input: &mut R,
    chunk_size: usize,
    count: usize,
) -> Result<(Vec<Vec<u8>>, bool), CipherError> {
    let mut batch = Vec::with_capacity(count);
    for _ in 0..count {
        let mut chunk = Vec::new();
        input
            .by_ref()
            .take(chunk_size as u64)
            .read_to_end(&mut chunk)?;
        let short = chunk.len() < chunk_size;
        if !chunk.is_empty() {
            batch.push(chunk);
        }
        if short {
            return Ok((batch, true));
        }
    }
    Ok((batch, false))
}

/// Run `work` over a batch on scoped threads and hand results to `sink`
/// strictly in index order, buffering any that arrive early.
fn for_each_ordered<T, O, F, S>(
    first: usize,
    items: Vec<T>,
    work: F,
    mut sink: S,
) -> Result<(), CipherError>
where
    T: Send,
    O: Send,
    F: Fn(usize, T) -> Result<O, CipherError> + Sync,
    S: FnMut(O) -> Result<(), CipherError>,
{
    let count = items.len();
    if count == 0 {
        return Ok(());
    }

    let (tx, rx) = flume::bounded(count);
    std::thread::scope(|scope| {
        for (offset, item) in items.into_iter().enumerate() {
            let tx = tx.clone();
            let work = &work;
            let index = first + offset;
            scope.spawn(move || {
                let _ = tx.send((index, work(index, item)));
            });
        }
        drop(tx);

        let mut pending = BTreeMap::new();
        let mut next = first;
        for (index, result) in rx.iter() {
            pending.insert(index, result?);
            while let Some(out) = pending.remove(&next) {
                sink(out)?;
                next += 1;
            }
        }

        if next != first + count {
            return Err(CipherError::Io(std::io::Error::other(
                "chunk worker exited without a result",
            )));
        }
        Ok(())
    })
}

fn partial_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    output.with_file_name(name)
}

/// Write through a sibling `.partial` file and rename into place on
/// success; on failure the partial file is removed.
fn write_atomically<T, F>(output: &Path, write: F) -> Result<T, CipherError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<T, CipherError>,
{
    let partial = partial_path(output);
    let result = (|| {
        let mut writer = BufWriter::new(File::create(&partial)?);
        let value = write(&mut writer)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(value)
    })();

    match result {
        Ok(value) => {
            fs::rename(&partial, output)?;
            Ok(value)
        }
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(&partial) {
                tracing::warn!(path = %partial.display(), "failed to remove partial output: {}", cleanup);
            }
            Err(e)
        }
    }
}
