use crate::ti::error::{TiError, TiResult};
use crate::util::ObjectReference;
use crate::vm::{ObjectModel, SpaceKind, VMBinding};
use strum_macros::{Display, EnumIter, FromRepr, IntoStaticStr};

/// The heaps objects are reported in.
#[repr(i32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, EnumIter, FromRepr, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum HeapId {
    Default = 0,
    Image = 1,
    Zygote = 2,
    App = 3,
}

impl HeapId {
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Classify an object into a heap.
pub fn get_heap_id<VM: VMBinding>(object: ObjectReference) -> HeapId {
    match VM::VMObjectModel::get_space_kind(object) {
        SpaceKind::Zygote => HeapId::Zygote,
        SpaceKind::BootImage => HeapId::Image,
        SpaceKind::LargeObject { zygote: true } => HeapId::Zygote,
        SpaceKind::LargeObject { zygote: false } | SpaceKind::AppImage | SpaceKind::Default => {
            HeapId::App
        }
    }
}

/// Get the name of a heap from its numeric id.
pub fn get_heap_name(heap_id: i32) -> TiResult<&'static str> {
    HeapId::from_repr(heap_id)
        .map(HeapId::name)
        .ok_or(TiError::IllegalArgument)
}
