use super::PageId;

/// A record identifier: the page holding a tuple's slot array plus the
/// tuple's slot index within that page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rid {
    page_id: PageId,
    slot_num: u32,
}

impl Rid {
    pub fn new(page_id: PageId, slot_num: u32) -> Self {
        Self { page_id, slot_num }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn slot_num(&self) -> u32 {
        self.slot_num
    }
}

impl std::fmt::Display for Rid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.page_id, self.slot_num)
    }
}
