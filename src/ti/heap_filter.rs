use crate::util::tag_table::Tag;

/// Filter out tagged objects.
pub const HEAP_FILTER_TAGGED: i32 = 0x4;
/// Filter out untagged objects.
pub const HEAP_FILTER_UNTAGGED: i32 = 0x8;
/// Filter out objects with tagged classes.
pub const HEAP_FILTER_CLASS_TAGGED: i32 = 0x10;
/// Filter out objects with untagged classes.
pub const HEAP_FILTER_CLASS_UNTAGGED: i32 = 0x20;

/// Decides from an object's tag and its class's tag whether the object is reported.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HeapFilter {
    filter_tagged: bool,
    filter_untagged: bool,
    filter_class_tagged: bool,
    filter_class_untagged: bool,
    any_filter: bool,
}

impl HeapFilter {
    /// Build a filter from a combination of the `HEAP_FILTER_*` bits. Other bits are ignored.
    pub fn new(heap_filter: i32) -> Self {
        let filter_tagged = heap_filter & HEAP_FILTER_TAGGED != 0;
        let filter_untagged = heap_filter & HEAP_FILTER_UNTAGGED != 0;
        let filter_class_tagged = heap_filter & HEAP_FILTER_CLASS_TAGGED != 0;
        let filter_class_untagged = heap_filter & HEAP_FILTER_CLASS_UNTAGGED != 0;
        HeapFilter {
            filter_tagged,
            filter_untagged,
            filter_class_tagged,
            filter_class_untagged,
            any_filter: filter_tagged
                || filter_untagged
                || filter_class_tagged
                || filter_class_untagged,
        }
    }

    pub fn should_report_by_heap_filter(&self, tag: Tag, class_tag: Tag) -> bool {
        if !self.any_filter {
            return true;
        }

        if (tag == 0 && self.filter_untagged) || (tag != 0 && self.filter_tagged) {
            return false;
        }

        if (class_tag == 0 && self.filter_class_untagged)
            || (class_tag != 0 && self.filter_class_tagged)
        {
            return false;
        }

        true
    }
}
