//! The transform run: fan out one task per entry, collect failures, and
//! optionally serialize the survivors into a new jar.

use std::any::Any;
use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io::{self, BufWriter, Cursor, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::{Compression, EntryTransformer, TransformOptions, TransformResult};
use crate::archive::WalkOptions;
use crate::entry::Entry;
use crate::error::TransformFailedError;
use crate::{Archive, EntryPath, Error, Result, Timestamp};

impl Archive {
    /// Transforms every entry with `transformers` and writes the survivors to
    /// a new jar at `output`, replacing any file already there.
    ///
    /// Uses [`TransformOptions::default`]. See [`transform_with`](Self::transform_with).
    pub fn transform<T: EntryTransformer>(
        &self,
        output: impl AsRef<Path>,
        transformers: &[T],
    ) -> Result<TransformResult> {
        self.transform_with(output, transformers, &TransformOptions::default())
    }

    /// Transforms every entry with `transformers` and writes the survivors to
    /// a new jar at `output`.
    ///
    /// Every entry is attempted even when others fail. If any entry failed,
    /// the output is still finalized with the entries that succeeded and the
    /// run returns [`Error::TransformFailed`] listing every failing path.
    /// Otherwise, when [`TransformOptions::repack_manifest`] is set, the output
    /// is checked and if necessary rewritten so that the manifest is its first
    /// record.
    pub fn transform_with<T: EntryTransformer>(
        &self,
        output: impl AsRef<Path>,
        transformers: &[T],
        options: &TransformOptions,
    ) -> Result<TransformResult> {
        let output = output.as_ref();
        if same_file(output, self.name()) {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("refusing to overwrite the input archive {}", output.display()),
            )));
        }

        log::debug!(
            "transforming {} into {} with {} transformer(s)",
            self.name().display(),
            output.display(),
            transformers.len()
        );

        let sink = OutputSink::create(output, options.compression)?;
        let outcome = execute(self, transformers, Some(&sink), options);
        let finished = sink.finish();
        let mut result = outcome?;
        finished?;

        if options.repack_manifest {
            result.manifest_repacked = crate::repack::verify_manifest(output)?;
        }
        Ok(result)
    }

    /// Runs `transformers` over every entry without writing any output.
    ///
    /// Useful when the transformers' value is what they observe (collecting
    /// metadata, building indexes) rather than what they return.
    pub fn process<T: EntryTransformer>(&self, transformers: &[T]) -> Result<TransformResult> {
        self.process_with(transformers, &TransformOptions::default())
    }

    /// Runs `transformers` over every entry without writing any output,
    /// using explicit options.
    pub fn process_with<T: EntryTransformer>(
        &self,
        transformers: &[T],
        options: &TransformOptions,
    ) -> Result<TransformResult> {
        log::debug!(
            "processing {} with {} transformer(s)",
            self.name().display(),
            transformers.len()
        );
        execute(self, transformers, None, options)
    }
}

#[derive(Debug, Default)]
struct Counters {
    visited: AtomicUsize,
    written: AtomicUsize,
    deleted: AtomicUsize,
}

type Failure = (EntryPath, Error);

fn execute<T: EntryTransformer>(
    archive: &Archive,
    transformers: &[T],
    sink: Option<&OutputSink>,
    options: &TransformOptions,
) -> Result<TransformResult> {
    let paths: Vec<EntryPath> = archive.walk(WalkOptions::new())?.collect();
    let threads = if cfg!(feature = "parallel") {
        options.threads.count().min(paths.len()).max(1)
    } else {
        1
    };
    let counters = Counters::default();

    log::debug!(
        "dispatching {} entries on {} thread(s)",
        paths.len(),
        threads
    );

    let task = |path: &EntryPath| -> Option<Failure> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            run_entry(archive, path, transformers, sink, &counters)
        }))
        .unwrap_or_else(|payload| {
            Err(Error::TransformPanicked {
                message: panic_message(payload.as_ref()),
            })
        });

        match outcome {
            Ok(()) => None,
            Err(e) => {
                log::debug!("failed to transform {}: {}", path, e);
                Some((path.clone(), e))
            }
        }
    };

    let failures = dispatch(&paths, threads, task)?;

    if !failures.is_empty() {
        let failures: BTreeMap<EntryPath, Error> = failures.into_iter().collect();
        log::debug!("{} of {} entries failed", failures.len(), paths.len());
        return Err(TransformFailedError::new(failures).into());
    }

    Ok(TransformResult {
        entries_visited: counters.visited.load(Ordering::Relaxed),
        entries_written: counters.written.load(Ordering::Relaxed),
        entries_deleted: counters.deleted.load(Ordering::Relaxed),
        manifest_repacked: false,
        threads_used: threads,
    })
}

/// Runs `task` for every path and gathers the failures it reports.
#[cfg(feature = "parallel")]
fn dispatch<F>(paths: &[EntryPath], threads: usize, task: F) -> Result<Vec<Failure>>
where
    F: Fn(&EntryPath) -> Option<Failure> + Send + Sync,
{
    if threads <= 1 {
        return Ok(paths.iter().filter_map(&task).collect());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("atlas-worker-{}", i))
        .build()
        .map_err(|e| Error::Io(io::Error::other(e)))?;

    Ok(pool.install(|| paths.par_iter().filter_map(&task).collect()))
}

/// Runs `task` for every path and gathers the failures it reports.
#[cfg(not(feature = "parallel"))]
fn dispatch<F>(paths: &[EntryPath], _threads: usize, task: F) -> Result<Vec<Failure>>
where
    F: Fn(&EntryPath) -> Option<Failure> + Send + Sync,
{
    Ok(paths.iter().filter_map(&task).collect())
}

fn run_entry<T: EntryTransformer>(
    archive: &Archive,
    path: &EntryPath,
    transformers: &[T],
    sink: Option<&OutputSink>,
    counters: &Counters,
) -> Result<()> {
    let Some(mut entry) = archive.get(path)? else {
        return Err(Error::EntryNotFound {
            path: path.stored_name().to_string(),
        });
    };
    counters.visited.fetch_add(1, Ordering::Relaxed);

    for transformer in transformers {
        entry = match entry.accept(transformer)? {
            Some(next) => next,
            None => {
                log::trace!("{} deleted", path);
                counters.deleted.fetch_add(1, Ordering::Relaxed);
                return Ok(());
            }
        };
    }

    if let Some(sink) = sink {
        sink.write(&entry)?;
        counters.written.fetch_add(1, Ordering::Relaxed);
    }
    log::trace!("{} done", path);
    Ok(())
}

/// Returns `true` if `a` and `b` name the same file, comparing resolved
/// paths when both exist.
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

struct SinkState {
    writer: ZipWriter<BufWriter<File>>,
    directories: HashSet<String>,
    files: HashSet<EntryPath>,
}

/// The output jar of a run, shared by all workers.
///
/// Each worker compresses its record into a private staging buffer; only the
/// copy of the finished record into the jar happens under the lock. Records
/// therefore land in task completion order rather than input order.
struct OutputSink {
    state: Mutex<SinkState>,
    compression: Compression,
}

impl OutputSink {
    fn create(path: &Path, compression: Compression) -> Result<Self> {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        let file = File::create(path)?;

        Ok(Self {
            state: Mutex::new(SinkState {
                writer: ZipWriter::new(BufWriter::new(file)),
                directories: HashSet::new(),
                files: HashSet::new(),
            }),
            compression,
        })
    }

    fn file_options(&self, time: Timestamp, size: usize) -> SimpleFileOptions {
        let options = SimpleFileOptions::default()
            .last_modified_time(time.to_zip())
            .large_file(size as u64 >= u64::from(u32::MAX));
        match self.compression {
            Compression::Stored => options.compression_method(CompressionMethod::Stored),
            Compression::Deflated { level } => options
                .compression_method(CompressionMethod::Deflated)
                .compression_level(level),
        }
    }

    fn directory_options(time: Timestamp) -> SimpleFileOptions {
        SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .last_modified_time(time.to_zip())
    }

    /// Compresses `entry` into a one-record archive held in memory.
    fn stage(&self, name: &str, entry: &Entry) -> Result<ZipArchive<Cursor<Vec<u8>>>> {
        let data = entry.to_bytes();
        let mut staging = ZipWriter::new(Cursor::new(Vec::with_capacity(data.len() / 2 + 256)));
        staging.start_file(name, self.file_options(entry.time(), data.len()))?;
        staging.write_all(&data)?;
        Ok(ZipArchive::new(staging.finish()?)?)
    }

    /// Writes `entry`, creating any parent directory records first.
    ///
    /// The entry is written under its stored name. Parent directories are
    /// only derived for entries whose stored name is already normalized.
    fn write(&self, entry: &Entry) -> Result<()> {
        let path = entry.path();
        let time = entry.time();
        let mut staged = self.stage(path.stored_name(), entry)?;
        let record = staged.by_index_raw(0)?;

        let mut guard = lock(&self.state);
        let state = &mut *guard;

        if !state.files.insert(path.clone().into_owned()) {
            return Err(Error::DuplicateEntry {
                path: path.to_string(),
            });
        }

        if !path.is_verbatim() {
            for dir in path.parent_dirs() {
                if state.directories.insert(dir.to_string()) {
                    state
                        .writer
                        .add_directory(dir, Self::directory_options(time))?;
                }
            }
        }

        state.writer.raw_copy_file(record)?;
        Ok(())
    }

    /// Writes the central directory and flushes the file.
    fn finish(self) -> Result<()> {
        let state = self
            .state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        let mut out = state.writer.finish()?;
        out.flush()?;
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        log::warn!("output lock was poisoned, recovering");
        PoisonError::into_inner(poisoned)
    })
}
