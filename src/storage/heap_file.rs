use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::tuple::{HeapPage, Tuple, TupleDesc};

use super::error::{StorageError, StorageResult};
use super::page_cache::PageCache;
use super::{PageId, Permissions, StoreLookup, TableId, TransactionId, page_size};

/// Heap file backing one table: a flat array of fixed-size pages with no
/// file-level header, so page k occupies bytes [k*page_size, (k+1)*page_size)
/// and the page count is derived purely from the file length.
///
/// Never interprets tuple bytes itself; decoding belongs to [`HeapPage`].
/// Pages handed out by the mutation operations live in the cache, which owns
/// them exclusively from then on.
#[derive(Debug)]
pub struct HeapFile {
    table_id: TableId,
    path: PathBuf,
    file: Mutex<File>,
    desc: TupleDesc,
}

impl HeapFile {
    /// Open the backing file for a table, creating it when absent
    pub fn open<P: AsRef<Path>>(path: P, table_id: TableId, desc: TupleDesc) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        Ok(Self {
            table_id,
            path,
            file: Mutex::new(file),
            desc,
        })
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }

    /// Number of complete pages in the file. A partially written trailing
    /// page does not count as a page.
    pub fn page_count(&self) -> StorageResult<usize> {
        let file = self.file.lock().unwrap();
        let len = file.metadata()?.len();
        Ok((len / page_size() as u64) as usize)
    }

    /// Read and decode one page. The read must produce one full page;
    /// anything shorter fails with `ShortRead`, never a padded buffer.
    pub fn read_page(&self, pid: PageId) -> StorageResult<HeapPage> {
        let ps = page_size();
        let offset = pid.page_no as u64 * ps as u64;
        let mut buf = vec![0u8; ps];

        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(offset))?;
        let mut filled = 0;
        while filled < ps {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        drop(file);

        if filled != ps {
            return Err(StorageError::ShortRead {
                table_id: pid.table_id,
                page_no: pid.page_no,
                expected: ps,
                actual: filled,
            });
        }

        Ok(HeapPage::from_bytes(pid, &buf, self.desc.clone())?)
    }

    /// Write one page at its offset, extending the file when the page is
    /// the first one past the current end
    pub fn write_page(&self, page: &HeapPage) -> StorageResult<()> {
        let bytes = page.to_bytes()?;
        let offset = page.id().page_no as u64 * bytes.len() as u64;

        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&bytes)?;
        Ok(())
    }

    /// Flush OS buffers for the backing file
    pub fn sync(&self) -> StorageResult<()> {
        self.file.lock().unwrap().sync_data()?;
        Ok(())
    }

    /// Insert a tuple into the first page with a free slot, scanning pages in
    /// increasing page-number order through the cache so resident dirty
    /// copies are observed. When every page is full, allocates exactly one
    /// page at `page_count()`, persisting the empty page before the insert so
    /// the count already reflects it.
    ///
    /// Returned pages are not yet marked dirty; the cache's mutation entry
    /// points do that.
    pub fn insert_tuple(
        &self,
        tid: TransactionId,
        tuple: &mut Tuple,
        cache: &mut PageCache,
        lookup: &dyn StoreLookup,
    ) -> StorageResult<Vec<PageId>> {
        for page_no in 0..self.page_count()? {
            let pid = PageId::new(self.table_id, page_no);
            let page = cache.fetch_mut(tid, pid, Permissions::ReadWrite, lookup)?;
            if !page.is_full() {
                page.insert_tuple(tuple)?;
                return Ok(vec![pid]);
            }
        }

        let pid = PageId::new(self.table_id, self.page_count()?);
        let mut page = HeapPage::empty(pid, self.desc.clone())?;
        self.write_page(&page)?;
        page.insert_tuple(tuple)?;
        cache.install(page, lookup)?;
        Ok(vec![pid])
    }

    /// Remove the tuple named by its record id from the page holding it.
    /// Fails when the slot is not currently occupied.
    pub fn delete_tuple(
        &self,
        tid: TransactionId,
        tuple: &Tuple,
        cache: &mut PageCache,
        lookup: &dyn StoreLookup,
    ) -> StorageResult<Vec<PageId>> {
        let rid = tuple.record_id().ok_or(StorageError::MissingRecordId)?;
        let page = cache.fetch_mut(tid, rid.page_id, Permissions::ReadWrite, lookup)?;
        page.delete_slot(rid.slot)?;
        Ok(vec![rid.page_id])
    }

    /// Every live tuple, in page order then slot order
    pub fn scan(
        &self,
        tid: TransactionId,
        cache: &mut PageCache,
        lookup: &dyn StoreLookup,
    ) -> StorageResult<Vec<Tuple>> {
        let mut tuples = Vec::new();
        for page_no in 0..self.page_count()? {
            let pid = PageId::new(self.table_id, page_no);
            let page = cache.fetch(tid, pid, Permissions::ReadOnly, lookup)?;
            for (_, tuple) in page.iter() {
                tuples.push(tuple.clone());
            }
        }
        Ok(tuples)
    }
}
