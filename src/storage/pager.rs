//! # Pager
//!
//! The page cache and file I/O layer. Pages are read through lazily: a slot
//! is filled from disk the first time it is requested and written back only
//! when flushed at close. There is no eviction; the slot table caps the
//! database at [`TABLE_MAX_PAGES`] pages, which is plenty for a tree whose
//! internal nodes never split.

use super::node::{Page, PAGE_SIZE};
use crate::errors::Error;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, trace};

/// Upper bound on pages per database file.
pub const TABLE_MAX_PAGES: usize = 100;

/// Locks a cached page handle.
///
/// The process is single-threaded, so a held lock means the caller is
/// aliasing a page it already borrowed; that is a bug, not contention.
pub fn lock_page(page: &Arc<Mutex<Page>>) -> Result<MutexGuard<'_, Page>, Error> {
    page.try_lock()
        .map_err(|_| err!(Storage, "Page is already borrowed"))
}

#[derive(Debug)]
pub struct Pager {
    file: File,
    /// Length of the backing file at open time, in bytes.
    file_length: u64,
    /// Number of pages currently known (on disk plus newly allocated).
    num_pages: u32,
    /// Fixed-capacity slot table; `None` means the page is not cached.
    pages: heapless::Vec<Option<Arc<Mutex<Page>>>, TABLE_MAX_PAGES>,
}

impl Pager {
    /// Opens or creates the database file and learns its length by seeking
    /// to the end. A length that is not a whole number of pages means the
    /// file is corrupt.
    pub fn open(path: &Path) -> Result<Self, Error> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        let file_length = file.seek(SeekFrom::End(0))?;

        if file_length % PAGE_SIZE as u64 != 0 {
            return Err(err!(
                Storage,
                "DB file is not a whole number of pages. Corrupt file."
            ));
        }

        let num_pages = (file_length / PAGE_SIZE as u64) as u32;
        debug!(path = %path.display(), file_length, num_pages, "Opened database file");

        Ok(Pager {
            file,
            file_length,
            num_pages,
            pages: heapless::Vec::new(),
        })
    }

    /// Returns a handle to page `page_num`, reading it from disk on a cache
    /// miss. A page beyond the end of the file comes back zeroed; the
    /// caller initializes it as a node before first use.
    pub fn get_page(&mut self, page_num: u32) -> Result<Arc<Mutex<Page>>, Error> {
        if page_num as usize >= TABLE_MAX_PAGES {
            return Err(err!(
                Storage,
                "Tried to fetch page number out of bounds. {} >= {}",
                page_num,
                TABLE_MAX_PAGES
            ));
        }

        while self.pages.len() <= page_num as usize {
            if self.pages.push(None).is_err() {
                return Err(err!(Storage, "Page cache capacity exhausted"));
            }
        }

        if self.pages[page_num as usize].is_none() {
            // Cache miss. Allocate a zeroed buffer and fill it from disk if
            // the page exists there.
            let mut page = Page::new();
            let pages_on_disk = (self.file_length / PAGE_SIZE as u64) as u32;
            if page_num < pages_on_disk {
                trace!(page_num, "Page cache miss, reading from file");
                self.file
                    .seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))?;
                self.file.read_exact(&mut page.data)?;
            } else {
                trace!(page_num, "Page cache miss, allocating blank page");
            }
            self.pages[page_num as usize] = Some(Arc::new(Mutex::new(page)));

            if page_num >= self.num_pages {
                self.num_pages = page_num + 1;
            }
        }

        match &self.pages[page_num as usize] {
            Some(page) => Ok(Arc::clone(page)),
            None => Err(err!(Storage, "Memory page {} not found", page_num)),
        }
    }

    /// Writes the cached page back to its slot in the file.
    pub fn flush(&mut self, page_num: u32) -> Result<(), Error> {
        let page = match self.pages.get(page_num as usize) {
            Some(Some(page)) => Arc::clone(page),
            _ => return Err(err!(Storage, "Tried to flush null page")),
        };
        let page = lock_page(&page)?;

        self.file
            .seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))?;
        self.file.write_all(&page.data)?;
        Ok(())
    }

    /// Flushes every cached page and empties the cache. Slots that were
    /// never loaded are already on disk, unchanged.
    pub fn close(&mut self) -> Result<(), Error> {
        let mut flushed = 0;
        for page_num in 0..self.num_pages {
            if matches!(self.pages.get(page_num as usize), Some(Some(_))) {
                self.flush(page_num)?;
                self.pages[page_num as usize] = None;
                flushed += 1;
            }
        }
        self.file.flush()?;
        debug!(flushed, "Flushed page cache");
        Ok(())
    }

    /// Next page number to be allocated. Until deletion exists, pages 0
    /// through N-1 are always in use, so page N is always free.
    pub fn unused_page_num(&self) -> u32 {
        self.num_pages
    }

    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }
}
