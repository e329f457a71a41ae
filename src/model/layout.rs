//! Derived native layout.
//!
//! Members are laid out sequentially with natural alignment. An aggregate's alignment is its
//! largest member alignment and its size is rounded up to that alignment.

use crate::model::PropertyDefinition;

/// Size and alignment of an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NativeLayout {
    /// Size in bytes
    pub size: usize,
    /// Alignment in bytes
    pub alignment: usize,
}

/// Round `value` up to a multiple of `alignment`.
#[must_use]
pub fn align_up(value: usize, alignment: usize) -> usize {
    if alignment <= 1 {
        value
    } else {
        value.next_multiple_of(alignment)
    }
}

/// Assign offsets to `properties` in order and return the aggregate layout.
pub fn layout_properties<'a, I>(properties: I) -> NativeLayout
where
    I: IntoIterator<Item = &'a mut PropertyDefinition>,
{
    let mut offset = 0;
    let mut alignment = 1;
    for property in properties {
        let property_alignment = property.alignment.max(1);
        offset = align_up(offset, property_alignment);
        property.offset = offset;
        offset += property.size;
        alignment = alignment.max(property_alignment);
    }

    NativeLayout {
        size: align_up(offset, alignment),
        alignment,
    }
}
