//! Reference marshaller.
//!
//! The executable counterpart of the emitted from-native / to-native text: every processor
//! reads and writes a [`Value`] against a [`NativeMemory`] at the offsets the model builder
//! derived, and [`StructMarshaller`] drives them across a struct. [`NativeHeap`] is an
//! in-process arena standing in for engine memory, which makes the offset metadata testable
//! without the native runtime.
//!
//! # Usage Examples
//!
//! ```rust,no_run
//! use bindweaver::marshal::{NativeHeap, NativeMemory, StructMarshaller};
//! use bindweaver::processors::ProcessorRegistry;
//! # fn demo(document: &bindweaver::model::TypeDefinitionDocument) -> bindweaver::Result<()> {
//! let registry = ProcessorRegistry::with_builtins();
//! let marshaller = StructMarshaller::new(&registry, document);
//! let counter = document.find_struct("Game", "FCounter").unwrap();
//!
//! let mut heap = NativeHeap::new();
//! let address = heap.allocate(counter.size, counter.alignment)?;
//! let value = marshaller.from_native(counter, &heap, address)?;
//! println!("{value:?}");
//! # Ok(())
//! # }
//! ```

mod heap;
mod value;

pub use heap::{NativeHeap, HEAP_BASE};
pub use value::Value;

use crate::{
    file::io::{read_le, ImageIO},
    model::{PropertyDefinition, StructDefinition, TypeDefinitionDocument, TypeReferenceInfo},
    processors::ProcessorRegistry,
    Error, Result,
};

/// Byte-addressed memory the marshaller reads from and writes to.
pub trait NativeMemory {
    /// Fill `buffer` with the bytes at `address`.
    ///
    /// # Errors
    /// Returns [`Error::OutOfBounds`] if the range is not backed by memory.
    fn read(&self, address: u64, buffer: &mut [u8]) -> Result<()>;

    /// Store `data` at `address`.
    ///
    /// # Errors
    /// Returns [`Error::OutOfBounds`] if the range is not backed by memory.
    fn write(&mut self, address: u64, data: &[u8]) -> Result<()>;

    /// Reserve `size` zeroed bytes aligned to `alignment` and return their address.
    ///
    /// # Errors
    /// Returns an error if the memory cannot grow.
    fn allocate(&mut self, size: usize, alignment: usize) -> Result<u64>;
}

impl dyn NativeMemory + '_ {
    /// Read a little-endian value at `address`.
    ///
    /// # Errors
    /// Returns [`Error::OutOfBounds`] if the range is not backed by memory.
    pub fn read_le<T: ImageIO>(&self, address: u64) -> Result<T> {
        let mut bytes = vec![0_u8; std::mem::size_of::<T>()];
        self.read(address, &mut bytes)?;
        read_le(&bytes)
    }

    /// Write a little-endian value at `address`.
    ///
    /// # Errors
    /// Returns [`Error::OutOfBounds`] if the range is not backed by memory.
    pub fn write_le<T: ImageIO>(&mut self, address: u64, value: T) -> Result<()> {
        self.write(address, value.to_le_bytes().as_ref())
    }
}

/// Converts structs between native memory and [`Value`] trees.
pub struct StructMarshaller<'a> {
    registry: &'a ProcessorRegistry,
    document: &'a TypeDefinitionDocument,
}

impl<'a> StructMarshaller<'a> {
    /// Marshal with the processors of `registry`, resolving nested structs in `document`.
    #[must_use]
    pub fn new(registry: &'a ProcessorRegistry, document: &'a TypeDefinitionDocument) -> Self {
        StructMarshaller { registry, document }
    }

    /// Read every property of `definition` from the struct at `address`.
    ///
    /// # Errors
    /// Returns [`Error::NoProcessor`] for unregistered tags, [`Error::NotSupported`] for kinds
    /// that need the engine runtime, or a memory error.
    pub fn from_native(
        &self,
        definition: &StructDefinition,
        memory: &dyn NativeMemory,
        address: u64,
    ) -> Result<Value> {
        let mut fields = Vec::with_capacity(definition.properties.len());
        for property in &definition.properties {
            let value = self.read_property(property, memory, address + property.offset as u64)?;
            fields.push((property.name().to_string(), value));
        }
        Ok(Value::Struct(fields))
    }

    /// Write `value`, a [`Value::Struct`] holding every property of `definition`, to `address`.
    ///
    /// # Errors
    /// Returns an error if `value` does not match `definition`, or for the same reasons as
    /// [`StructMarshaller::from_native`].
    pub fn to_native(
        &self,
        definition: &StructDefinition,
        memory: &mut dyn NativeMemory,
        address: u64,
        value: &Value,
    ) -> Result<()> {
        if !matches!(value, Value::Struct(_)) {
            return Err(Error::Error(format!(
                "Expected a struct value for '{}', got {value:?}",
                definition.base.full_name()
            )));
        }
        for property in &definition.properties {
            let Some(field) = value.field(property.name()) else {
                return Err(Error::Error(format!(
                    "Value for '{}' has no field '{}'",
                    definition.base.full_name(),
                    property.name()
                )));
            };
            self.write_property(property, memory, address + property.offset as u64, field)?;
        }
        Ok(())
    }

    /// Read one property stored at `address`.
    ///
    /// # Errors
    /// See [`StructMarshaller::from_native`].
    pub fn read_property(
        &self,
        property: &PropertyDefinition,
        memory: &dyn NativeMemory,
        address: u64,
    ) -> Result<Value> {
        self.registry
            .for_property(property)?
            .read_value(property, memory, address, self)
    }

    /// Write one property to `address`.
    ///
    /// # Errors
    /// See [`StructMarshaller::to_native`].
    pub fn write_property(
        &self,
        property: &PropertyDefinition,
        memory: &mut dyn NativeMemory,
        address: u64,
        value: &Value,
    ) -> Result<()> {
        self.registry
            .for_property(property)?
            .write_value(property, memory, address, value, self)
    }

    /// The struct definition a struct-kind property refers to.
    ///
    /// # Errors
    /// Returns an internal error if the struct is not part of the document.
    pub fn resolve_struct(&self, reference: &TypeReferenceInfo) -> Result<&'a StructDefinition> {
        self.document
            .find_struct(&reference.namespace, &reference.native_name)
            .ok_or_else(|| internal_error!("Struct '{}' is not in the document", reference.full_name()))
    }
}
