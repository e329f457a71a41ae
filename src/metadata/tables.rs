//! Metadata tables (`#~` stream).
//!
//! The tables stream starts with a `u64` mask of present tables, followed by one `u32` row count
//! per present table (in ascending table order), followed by the rows of every present table.
//! Every heap index and row reference is 4 bytes wide, so row sizes are fixed per table.
//!
//! Row structures are the raw on-disk representation; heap indices and tokens are left
//! unresolved and turned into owned declarations by [`crate::metadata::module::LoadedModule`].

use strum::{Display, EnumIter, FromRepr, IntoEnumIterator};

use crate::{
    file::{io::write_le, parser::Parser},
    Error::OutOfBounds,
    Result,
};

macro_rules! define_tables {
    ($(
        $(#[$meta:meta])*
        $table:ident = $id:literal => $field:ident : $row:ident { $( $col:ident : $ty:ty ),* $(,)? }
    ),* $(,)?) => {
        /// Identifier of a metadata table, equal to the table byte of its tokens.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter, FromRepr)]
        #[repr(u8)]
        pub enum TableId {
            $(
                #[allow(missing_docs)]
                $table = $id,
            )*
        }

        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
            #[allow(missing_docs)]
            pub struct $row {
                $( pub $col: $ty, )*
            }

            impl $row {
                /// The table this row belongs to.
                pub const TABLE: TableId = TableId::$table;
                /// Size of one row in bytes.
                pub const ROW_SIZE: usize = 0 $( + std::mem::size_of::<$ty>() )*;

                /// Read one row at the current position of `parser`.
                ///
                /// # Errors
                /// Returns an error if the row is truncated.
                pub fn read(parser: &mut Parser) -> Result<Self> {
                    Ok($row {
                        $( $col: parser.read_le::<$ty>()?, )*
                    })
                }

                /// Append the encoded row to `buffer`.
                pub fn write(&self, buffer: &mut Vec<u8>) {
                    $( write_le(buffer, self.$col); )*
                }
            }
        )*

        /// All metadata tables of a module image.
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        #[allow(missing_docs)]
        pub struct Tables {
            $( pub $field: Vec<$row>, )*
        }

        impl Tables {
            /// Number of rows in `table`.
            #[must_use]
            #[allow(clippy::cast_possible_truncation)]
            pub fn row_count(&self, table: TableId) -> u32 {
                match table {
                    $( TableId::$table => self.$field.len() as u32, )*
                }
            }

            fn read_rows(&mut self, table: TableId, count: u32, parser: &mut Parser) -> Result<()> {
                match table {
                    $(
                        TableId::$table => {
                            let Some(total) = (count as usize).checked_mul($row::ROW_SIZE) else {
                                return Err(OutOfBounds);
                            };
                            if total > parser.remaining() {
                                return Err(OutOfBounds);
                            }

                            self.$field = Vec::with_capacity(count as usize);
                            for _ in 0..count {
                                self.$field.push($row::read(parser)?);
                            }
                        }
                    )*
                }
                Ok(())
            }

            fn write_rows(&self, table: TableId, buffer: &mut Vec<u8>) {
                match table {
                    $(
                        TableId::$table => {
                            for row in &self.$field {
                                row.write(buffer);
                            }
                        }
                    )*
                }
            }
        }
    };
}

define_tables! {
    /// Module identity.
    Module = 0x00 => module: ModuleRaw { name: u32, mvid: u32 },
    /// Reference to a type declared in another module.
    TypeRef = 0x01 => type_ref: TypeRefRaw { scope: u32, name: u32, namespace: u32 },
    /// Type declaration.
    TypeDef = 0x02 => type_def: TypeDefRaw {
        flags: u32,
        name: u32,
        namespace: u32,
        extends: u32,
        field_list: u32,
        method_list: u32,
        property_list: u32,
    },
    /// Field declaration.
    Field = 0x04 => field: FieldRaw { flags: u16, name: u32, signature: u32 },
    /// Method declaration.
    MethodDef = 0x06 => method_def: MethodDefRaw {
        body: u32,
        impl_flags: u16,
        flags: u16,
        name: u32,
        signature: u32,
        param_list: u32,
    },
    /// Parameter names and flags.
    Param = 0x08 => param: ParamRaw { flags: u16, sequence: u16, name: u32 },
    /// Interface implemented by a type.
    InterfaceImpl = 0x09 => interface_impl: InterfaceImplRaw { class: u32, interface: u32 },
    /// Reference to a member of another type, used for attribute constructors.
    MemberRef = 0x0A => member_ref: MemberRefRaw { class: u32, name: u32, signature: u32 },
    /// Compile-time constant of a field, parameter or property.
    Constant = 0x0B => constant: ConstantRaw { base_type: u8, padding: u8, parent: u32, value: u32 },
    /// Custom attribute applied to a declaration.
    CustomAttribute = 0x0C => custom_attribute: CustomAttributeRaw { parent: u32, constructor: u32, value: u32 },
    /// Property declaration.
    Property = 0x17 => property: PropertyRaw { flags: u16, name: u32, signature: u32, getter: u32, setter: u32 },
    /// Constructed type (generic instantiation, array, ...).
    TypeSpec = 0x1B => type_spec: TypeSpecRaw { signature: u32 },
    /// Assembly identity of the module.
    Assembly = 0x20 => assembly: AssemblyRaw { major: u16, minor: u16, build: u16, revision: u16, name: u32 },
    /// Reference to another assembly.
    AssemblyRef = 0x23 => assembly_ref: AssemblyRefRaw { major: u16, minor: u16, build: u16, revision: u16, name: u32 },
    /// Nesting relation between two type declarations.
    NestedClass = 0x29 => nested_class: NestedClassRaw { nested: u32, enclosing: u32 },
    /// Generic parameter of a type or method.
    GenericParam = 0x2A => generic_param: GenericParamRaw { number: u16, flags: u16, owner: u32, name: u32 },
}

impl Tables {
    /// Parse the `#~` stream.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] if the mask names an unknown table, or an error if
    /// the stream is truncated.
    pub fn read(data: &[u8]) -> Result<Tables> {
        let mut parser = Parser::new(data);
        let mask = parser.read_le::<u64>()?;

        let mut present = Vec::new();
        for bit in 0..64u8 {
            if mask & (1u64 << bit) == 0 {
                continue;
            }

            let Some(table) = TableId::from_repr(bit) else {
                return Err(crate::Error::NotSupported);
            };
            present.push((table, parser.read_le::<u32>()?));
        }

        let mut tables = Tables::default();
        for (table, count) in present {
            tables.read_rows(table, count, &mut parser)?;
        }

        Ok(tables)
    }

    /// Encode all tables into a `#~` stream.
    #[must_use]
    pub fn write(&self) -> Vec<u8> {
        let present: Vec<TableId> = TableId::iter()
            .filter(|table| self.row_count(*table) > 0)
            .collect();

        let mask = present
            .iter()
            .fold(0u64, |mask, table| mask | (1u64 << (*table as u8)));

        let mut buffer = Vec::new();
        write_le(&mut buffer, mask);
        for table in &present {
            write_le(&mut buffer, self.row_count(*table));
        }
        for table in &present {
            self.write_rows(*table, &mut buffer);
        }

        buffer
    }
}
