use crate::storage::{PageId, TransactionId, page_size};

use super::error::{TupleError, TupleResult};
use super::schema::TupleDesc;
use super::tuple::{RecordId, SlotId, Tuple};

/// Decoded in-memory form of one fixed-size disk page: a slot-occupancy
/// bitmap followed by a fixed-length tuple array. Owned exclusively by the
/// page cache once resident; stores only ever see the serialized bytes.
///
/// On-disk layout: `ceil(slots/8)` header bytes of bitmap, then `slots`
/// tuple-sized entries, then zero padding up to the page size.
#[derive(Debug, Clone)]
pub struct HeapPage {
    id: PageId,
    desc: TupleDesc,
    slots: Vec<Option<Tuple>>,
    dirty: Option<TransactionId>,
    page_size: usize,
}

impl HeapPage {
    /// Number of tuple slots a page can hold for the given schema.
    /// Each slot costs one bitmap bit plus the tuple bytes:
    /// slots = floor(page_size * 8 / (tuple_size * 8 + 1)).
    pub fn slot_capacity(desc: &TupleDesc, page_size: usize) -> usize {
        let tuple_size = desc.tuple_size();
        if tuple_size == 0 {
            return 0;
        }
        (page_size * 8) / (tuple_size * 8 + 1)
    }

    fn header_size(slot_count: usize) -> usize {
        slot_count.div_ceil(8)
    }

    /// A fresh page with every slot empty
    pub fn empty(id: PageId, desc: TupleDesc) -> TupleResult<Self> {
        let page_size = page_size();
        let slot_count = Self::slot_capacity(&desc, page_size);
        if slot_count == 0 {
            return Err(TupleError::SchemaMismatch(format!(
                "tuple size {} does not fit a {} byte page",
                desc.tuple_size(),
                page_size
            )));
        }

        Ok(Self {
            id,
            desc,
            slots: vec![None; slot_count],
            dirty: None,
            page_size,
        })
    }

    /// Decode a page from its serialized form. `bytes` must hold one full page.
    pub fn from_bytes(id: PageId, bytes: &[u8], desc: TupleDesc) -> TupleResult<Self> {
        let page_size = bytes.len();
        let slot_count = Self::slot_capacity(&desc, page_size);
        if slot_count == 0 {
            return Err(TupleError::SchemaMismatch(format!(
                "tuple size {} does not fit a {} byte page",
                desc.tuple_size(),
                page_size
            )));
        }

        let header_size = Self::header_size(slot_count);
        let tuple_size = desc.tuple_size();
        let mut slots = Vec::with_capacity(slot_count);

        for slot in 0..slot_count {
            let used = (bytes[slot / 8] & (1 << (slot % 8))) != 0;
            if used {
                let start = header_size + slot * tuple_size;
                let mut tuple = Tuple::from_bytes(&bytes[start..start + tuple_size], desc.clone())?;
                tuple.set_record_id(Some(RecordId::new(id, slot)));
                slots.push(Some(tuple));
            } else {
                slots.push(None);
            }
        }

        Ok(Self {
            id,
            desc,
            slots,
            dirty: None,
            page_size,
        })
    }

    /// Serialize to exactly one page worth of bytes; empty slots are zeroed
    pub fn to_bytes(&self) -> TupleResult<Vec<u8>> {
        let header_size = Self::header_size(self.slots.len());
        let tuple_size = self.desc.tuple_size();
        let mut bytes = vec![0u8; self.page_size];

        for (slot, entry) in self.slots.iter().enumerate() {
            if let Some(tuple) = entry {
                bytes[slot / 8] |= 1 << (slot % 8);
                let start = header_size + slot * tuple_size;
                bytes[start..start + tuple_size].copy_from_slice(&tuple.to_bytes()?);
            }
        }

        Ok(bytes)
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn desc(&self) -> &TupleDesc {
        &self.desc
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_some()
    }

    /// Transaction that dirtied this page, if any
    pub fn dirtied_by(&self) -> Option<TransactionId> {
        self.dirty
    }

    /// Set or clear the dirty marker, attributing the change to `tid`
    pub fn mark_dirty(&mut self, tid: Option<TransactionId>) {
        self.dirty = tid;
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn free_slot_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(|s| s.is_some())
    }

    /// Place the tuple in the first free slot and assign its record id.
    /// The caller's tuple gets the record id too.
    pub fn insert_tuple(&mut self, tuple: &mut Tuple) -> TupleResult<SlotId> {
        if tuple.desc() != &self.desc {
            return Err(TupleError::SchemaMismatch(
                "tuple schema does not match page schema".to_string(),
            ));
        }

        let slot = self
            .slots
            .iter()
            .position(|s| s.is_none())
            .ok_or(TupleError::PageFull(self.id.page_no))?;

        tuple.set_record_id(Some(RecordId::new(self.id, slot)));
        self.slots[slot] = Some(tuple.clone());
        Ok(slot)
    }

    /// Clear an occupied slot
    pub fn delete_slot(&mut self, slot: SlotId) -> TupleResult<()> {
        if slot >= self.slots.len() {
            return Err(TupleError::InvalidSlot(slot));
        }
        if self.slots[slot].is_none() {
            return Err(TupleError::SlotEmpty(slot));
        }
        self.slots[slot] = None;
        Ok(())
    }

    /// The tuple in an occupied slot
    pub fn tuple(&self, slot: SlotId) -> TupleResult<&Tuple> {
        if slot >= self.slots.len() {
            return Err(TupleError::InvalidSlot(slot));
        }
        self.slots[slot]
            .as_ref()
            .ok_or(TupleError::SlotEmpty(slot))
    }

    /// Occupied slots in slot order
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &Tuple)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, entry)| entry.as_ref().map(|t| (slot, t)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DEFAULT_PAGE_SIZE;
    use crate::tuple::{Field, FieldType};

    fn test_desc() -> TupleDesc {
        TupleDesc::from_types(&[FieldType::Int, FieldType::Str])
    }

    fn test_tuple(id: i32) -> Tuple {
        Tuple::with_fields(
            test_desc(),
            vec![Field::Int(id), Field::Str(format!("tuple{}", id))],
        )
        .unwrap()
    }

    fn pid(page_no: usize) -> PageId {
        PageId::new(1, page_no)
    }

    #[test]
    fn test_slot_capacity() {
        // 136-byte tuples: floor(4096*8 / (136*8 + 1)) = 30
        assert_eq!(
            HeapPage::slot_capacity(&test_desc(), DEFAULT_PAGE_SIZE),
            30
        );
        assert_eq!(HeapPage::slot_capacity(&TupleDesc::default(), 4096), 0);
    }

    #[test]
    fn test_empty_page() {
        let page = HeapPage::empty(pid(0), test_desc()).unwrap();
        assert_eq!(page.free_slot_count(), page.slot_count());
        assert!(!page.is_full());
        assert!(!page.is_dirty());
    }

    #[test]
    fn test_oversized_tuple_rejected() {
        // 32 string fields exceed one default page
        let desc = TupleDesc::from_types(&[FieldType::Str; 32]);
        assert!(HeapPage::empty(pid(0), desc).is_err());
    }

    #[test]
    fn test_insert_assigns_record_id() {
        let mut page = HeapPage::empty(pid(3), test_desc()).unwrap();
        let mut tuple = test_tuple(1);
        let slot = page.insert_tuple(&mut tuple).unwrap();

        assert_eq!(slot, 0);
        assert_eq!(tuple.record_id(), Some(RecordId::new(pid(3), 0)));
        assert_eq!(page.tuple(0).unwrap().fields(), tuple.fields());
        assert_eq!(page.free_slot_count(), page.slot_count() - 1);
    }

    #[test]
    fn test_insert_until_full() {
        let mut page = HeapPage::empty(pid(0), test_desc()).unwrap();
        for i in 0..page.slot_count() {
            page.insert_tuple(&mut test_tuple(i as i32)).unwrap();
        }
        assert!(page.is_full());
        assert!(matches!(
            page.insert_tuple(&mut test_tuple(99)),
            Err(TupleError::PageFull(0))
        ));
    }

    #[test]
    fn test_delete_slot() {
        let mut page = HeapPage::empty(pid(0), test_desc()).unwrap();
        page.insert_tuple(&mut test_tuple(1)).unwrap();

        page.delete_slot(0).unwrap();
        assert!(matches!(page.tuple(0), Err(TupleError::SlotEmpty(0))));
        assert!(matches!(
            page.delete_slot(0),
            Err(TupleError::SlotEmpty(0))
        ));
        assert!(matches!(
            page.delete_slot(page.slot_count()),
            Err(TupleError::InvalidSlot(_))
        ));

        // the freed slot is the next insertion target
        let mut tuple = test_tuple(2);
        assert_eq!(page.insert_tuple(&mut tuple).unwrap(), 0);
    }

    #[test]
    fn test_schema_mismatch_rejected() {
        let mut page = HeapPage::empty(pid(0), test_desc()).unwrap();
        let other = TupleDesc::from_types(&[FieldType::Float]);
        let mut tuple = Tuple::with_fields(other, vec![Field::Float(1.0)]).unwrap();
        assert!(matches!(
            page.insert_tuple(&mut tuple),
            Err(TupleError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_round_trip() {
        let mut page = HeapPage::empty(pid(7), test_desc()).unwrap();
        page.insert_tuple(&mut test_tuple(1)).unwrap();
        page.insert_tuple(&mut test_tuple(2)).unwrap();
        page.insert_tuple(&mut test_tuple(3)).unwrap();
        page.delete_slot(1).unwrap();

        let bytes = page.to_bytes().unwrap();
        assert_eq!(bytes.len(), DEFAULT_PAGE_SIZE);

        let restored = HeapPage::from_bytes(pid(7), &bytes, test_desc()).unwrap();
        assert_eq!(restored.slot_count(), page.slot_count());
        assert_eq!(restored.free_slot_count(), page.free_slot_count());
        assert!(restored.tuple(0).is_ok());
        assert!(restored.tuple(1).is_err());
        assert_eq!(
            restored.tuple(2).unwrap().record_id(),
            Some(RecordId::new(pid(7), 2))
        );
        assert_eq!(restored.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_iter_skips_empty_slots() {
        let mut page = HeapPage::empty(pid(0), test_desc()).unwrap();
        page.insert_tuple(&mut test_tuple(1)).unwrap();
        page.insert_tuple(&mut test_tuple(2)).unwrap();
        page.delete_slot(0).unwrap();

        let slots: Vec<SlotId> = page.iter().map(|(slot, _)| slot).collect();
        assert_eq!(slots, vec![1]);
    }
}
