//! # Media Selector
//!
//! Picks one playable file from a library by random descent:
//!
//! 1. List the entries of the current directory (sorted, so a seeded RNG
//!    reproduces the same walk).
//! 2. Keep subdirectories and files whose sniffed kind is allowed.
//! 3. Pick uniformly among everything kept. A file ends the search; a
//!    directory is descended into.
//! 4. If a directory turns out to hold nothing playable, drop it from this
//!    level's pool and pick again, up to `max_retries` failed picks per level.
//!
//! Symlinks are followed. A directory that resolves to one already on the
//! current descent path is a dead end, so link cycles cannot multiply the walk.
//!
//! The search does not visit the whole tree. A library made of deep, sparse
//! directories can fail a selection even though media exists somewhere in it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use path_absolutize::Absolutize;
use rand::Rng;

use crate::error::AutoplayError;
use crate::sniff::{MagicSniffer, MediaKind, MediaTypeOracle};

pub const DEFAULT_MAX_RETRIES: usize = 10;
pub const DEFAULT_MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Candidate {
    Directory(PathBuf),
    File(PathBuf),
}

/// Result of searching one directory.
#[derive(Debug)]
enum Descent {
    Found(PathBuf),
    Exhausted(String),
}

#[derive(Debug, Clone)]
pub struct MediaSelector<O = MagicSniffer> {
    oracle: O,
    kinds: Vec<MediaKind>,
    max_retries: usize,
    max_depth: usize,
}

impl MediaSelector<MagicSniffer> {
    pub fn with_kinds(kinds: &[MediaKind]) -> Self {
        Self::new(MagicSniffer, kinds)
    }
}

impl<O: MediaTypeOracle> MediaSelector<O> {
    pub fn new(oracle: O, kinds: &[MediaKind]) -> Self {
        Self {
            oracle,
            kinds: kinds.to_vec(),
            max_retries: DEFAULT_MAX_RETRIES,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Failed picks tolerated at each directory level before giving up on it.
    pub fn max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    /// Deepest directory level searched below the root.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Selects a random playable file under `root` and returns its absolute
    /// path.
    ///
    /// # Errors
    ///
    /// - [`AutoplayError::Library`] if `root` itself cannot be listed
    /// - [`AutoplayError::MediaExhausted`] if no file was found within the
    ///   retry bound
    pub fn select<R: Rng + ?Sized>(&self, root: &Path, rng: &mut R) -> Result<PathBuf, AutoplayError> {
        info!("Finding a random media file in \"{}\"", root.display());

        let library_error = |source: io::Error| AutoplayError::Library {
            path: root.to_path_buf(),
            source,
        };

        let pool = self.candidates(root).map_err(library_error)?;
        let mut ancestors = vec![fs::canonicalize(root).map_err(library_error)?];
        match self.pick_from(root, pool, rng, 0, &mut ancestors) {
            Descent::Found(path) => {
                let absolute = path.absolutize().map_err(library_error)?.into_owned();
                info!("Selected \"{}\"", absolute.display());
                Ok(absolute)
            }
            Descent::Exhausted(reason) => Err(AutoplayError::media_exhausted(root, reason)),
        }
    }

    /// `ancestors` holds the canonical directories from the root down to the
    /// parent of `dir`.
    fn descend<R: Rng + ?Sized>(
        &self,
        dir: &Path,
        rng: &mut R,
        depth: usize,
        ancestors: &mut Vec<PathBuf>,
    ) -> Descent {
        if depth > self.max_depth {
            return Descent::Exhausted(format!("{} is deeper than {} levels", dir.display(), self.max_depth));
        }

        let canonical = match fs::canonicalize(dir) {
            Ok(canonical) => canonical,
            Err(err) => {
                warn!("Skipping unresolvable directory \"{}\": {err}", dir.display());
                return Descent::Exhausted(format!("cannot resolve {}: {err}", dir.display()));
            }
        };
        if ancestors.contains(&canonical) {
            debug!("\"{}\" loops back to \"{}\"", dir.display(), canonical.display());
            return Descent::Exhausted(format!("{} loops back to {}", dir.display(), canonical.display()));
        }

        match self.candidates(dir) {
            Ok(pool) => {
                ancestors.push(canonical);
                let outcome = self.pick_from(dir, pool, rng, depth, ancestors);
                ancestors.pop();
                outcome
            }
            Err(err) => {
                warn!("Skipping unreadable directory \"{}\": {err}", dir.display());
                Descent::Exhausted(format!("cannot read {}: {err}", dir.display()))
            }
        }
    }

    fn pick_from<R: Rng + ?Sized>(
        &self,
        dir: &Path,
        mut pool: Vec<Candidate>,
        rng: &mut R,
        depth: usize,
        ancestors: &mut Vec<PathBuf>,
    ) -> Descent {
        let mut failures = 0;

        while !pool.is_empty() {
            let index = rng.gen_range(0..pool.len());
            let subdir = match &pool[index] {
                Candidate::File(path) => return Descent::Found(path.clone()),
                Candidate::Directory(path) => path.clone(),
            };

            debug!("Descending into \"{}\"", subdir.display());
            match self.descend(&subdir, rng, depth + 1, ancestors) {
                Descent::Found(path) => return Descent::Found(path),
                Descent::Exhausted(reason) => {
                    debug!("Nothing playable under \"{}\": {reason}", subdir.display());
                    pool.remove(index);
                    failures += 1;
                    if failures > self.max_retries {
                        return Descent::Exhausted(format!(
                            "gave up on {} after {failures} empty branches",
                            dir.display()
                        ));
                    }
                }
            }
        }

        Descent::Exhausted(format!("no subdirectories or matching files in {}", dir.display()))
    }

    /// Lists the subdirectories and allowed media files of `dir`, sorted.
    fn candidates(&self, dir: &Path) -> io::Result<Vec<Candidate>> {
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.path()),
                Err(err) => {
                    warn!("Skipping unreadable entry in \"{}\": {err}", dir.display());
                    None
                }
            })
            .collect();
        paths.sort();

        let mut pool = Vec::with_capacity(paths.len());
        for path in paths {
            // fs::metadata follows symlinks
            let metadata = match fs::metadata(&path) {
                Ok(metadata) => metadata,
                Err(err) => {
                    warn!("Skipping \"{}\": {err}", path.display());
                    continue;
                }
            };

            if metadata.is_dir() {
                pool.push(Candidate::Directory(path));
            } else if metadata.is_file() {
                match self.oracle.media_kind(&path) {
                    Ok(Some(kind)) if self.kinds.contains(&kind) => pool.push(Candidate::File(path)),
                    Ok(kind) => debug!("Ignoring \"{}\" ({kind:?})", path.display()),
                    Err(err) => warn!("Cannot sniff \"{}\": {err}", path.display()),
                }
            }
        }
        Ok(pool)
    }
}
