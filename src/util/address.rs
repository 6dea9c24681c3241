use std::fmt;
use std::num::NonZeroUsize;

/// Address represents an arbitrary address. heapti never dereferences an
/// address; it is only carried around so that a runtime can map it back to its
/// own pointers.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, Hash, PartialOrd, Ord, PartialEq, Default)]
pub struct Address(usize);

impl Address {
    /// The lowest possible address.
    pub const ZERO: Self = Address(0);

    /// creates an arbitrary Address
    pub const fn from_usize(raw: usize) -> Address {
        Address(raw)
    }

    /// converts the Address to a pointer-sized integer
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// is this address zero?
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

/// allows Display format the Address (as upper-case hex value with 0x prefix)
impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// ObjectReference represents the identity of a heap object.
///
/// An object reference is never null. A slot that may hold no object is
/// represented as `Option<ObjectReference>`, which has the same size as a
/// pointer. Identity comparison is plain equality: two references are the
/// same object iff they are equal.
///
/// A runtime creates object references from its own object pointers with
/// [`ObjectReference::from_raw_address`]. heapti keys its weak tables with
/// object references, so whenever the runtime moves an object it must tell the
/// tables about the new reference through a system weak sweep
/// (see [`crate::vm::ReferenceGlue`]).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, Hash, PartialOrd, Ord, PartialEq)]
pub struct ObjectReference(NonZeroUsize);

impl ObjectReference {
    /// Cast the object reference to its raw address.
    pub fn to_raw_address(self) -> Address {
        Address(self.0.get())
    }

    /// Cast a raw address to an object reference. This is how a binding
    /// creates `ObjectReference` instances. Returns `None` for the zero address.
    pub fn from_raw_address(addr: Address) -> Option<ObjectReference> {
        NonZeroUsize::new(addr.0).map(ObjectReference)
    }

    /// returns the raw value of the ObjectReference
    pub fn value(self) -> usize {
        self.0.get()
    }
}

/// allows print ObjectReference as lower-case hex value
impl fmt::LowerHex for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::Debug for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

static_assertions::assert_eq_size!(ObjectReference, Option<ObjectReference>);
static_assertions::assert_eq_size!(Option<ObjectReference>, usize);
