//! Structured binding diagnostics.
//!
//! Every rule violation found while classifying declarations or building the model is recorded
//! as a [`BindingError`]: an [`ErrorKind`], a message, the [`SymbolId`] of the offending
//! declaration and, when known, its [`SourceLocation`]. Errors are collected in a
//! [`Diagnostics`] container during a phase and handed out as one [`BindingErrors`] batch, so a
//! single run reports every problem it found.
//!
//! # Usage Examples
//!
//! ```rust
//! use bindweaver::bindings::{
//!     BindingError, Diagnostics, ErrorKind, SymbolCategory, SymbolId,
//! };
//!
//! let diagnostics = Diagnostics::new();
//! diagnostics.push(BindingError::new(
//!     ErrorKind::StaticProperty,
//!     "Static properties are not supported",
//!     SymbolId::member("AMyActor", "Count", SymbolCategory::Property),
//! ));
//!
//! let errors = diagnostics.into_result(()).unwrap_err();
//! assert_eq!(errors.len(), 1);
//! ```
//!
//! # Thread Safety
//!
//! [`Diagnostics`] uses `boxcar::Vec` internally, so entries can be appended through a shared
//! reference from several threads without locking.

use std::fmt;

use strum::{Display, EnumIter};

use crate::metadata::token::Token;

/// Kind of a binding rule violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum ErrorKind {
    /// Enum name does not start with `E`
    InvalidEnumName,
    /// Struct name does not start with `F`
    InvalidStructName,
    /// Actor class name does not start with `A`
    InvalidActorName,
    /// Non-actor class name does not start with `U`
    InvalidClassName,
    /// Interface name does not start with `I`
    InvalidInterfaceName,
    /// Plain enumeration values are not sequential from zero
    EnumValueSequence,
    /// Two implementation types share a display name
    NameCollision,
    /// A declaration carries both a primary and a placeholder marker, or two primary markers
    ConflictingMarkers,
    /// The primary marker does not match the declaration shape
    MarkerMismatch,
    /// `Nullable<T>` of a value type
    NullableValueType,
    /// Raw class pointer instead of `TSubclassOf<T>`
    RawClassPointer,
    /// Single-cast delegate property
    SingleCastDelegateProperty,
    /// Soft reference or delegate inside a value type
    ReferenceMemberInValueType,
    /// Static property
    StaticProperty,
    /// Static function outside a function library
    StaticFunction,
    /// Function name declared twice
    FunctionOverload,
    /// Generic reflected type
    GenericType,
    /// Generic reflected function
    GenericFunction,
    /// `ReplicatedUsing` names no reflected function of the same type
    MissingReplicationCallback,
    /// A class does not derive from a reflected class
    InvalidSuperType,
    /// An interface inherits a non-reflected interface
    InvalidInterfaceBase,
    /// An interface declares a property
    InterfaceProperty,
    /// An override does not match the reflected base function
    OverrideSignatureMismatch,
    /// A fast-access struct has non-blittable members
    FastAccessNotBlittable,
    /// A type cannot be mapped to a type-class tag
    UnsupportedType,
}

/// Category of the declaration a diagnostic points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum SymbolCategory {
    /// A type
    Type,
    /// A field or property
    Property,
    /// A method
    Function,
    /// A parameter or return value
    Parameter,
    /// An enum member
    EnumField,
}

/// Identifies a declaration by owner type, member and category.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolId {
    /// Full name of the owner type
    pub owner: String,
    /// Member name, `None` for the type itself
    pub member: Option<String>,
    /// Category
    pub category: SymbolCategory,
}

impl SymbolId {
    /// The type `owner` itself.
    #[must_use]
    pub fn type_(owner: &str) -> Self {
        SymbolId {
            owner: owner.to_string(),
            member: None,
            category: SymbolCategory::Type,
        }
    }

    /// The member `member` of `owner`.
    #[must_use]
    pub fn member(owner: &str, member: &str, category: SymbolCategory) -> Self {
        SymbolId {
            owner: owner.to_string(),
            member: Some(member.to_string()),
            category,
        }
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.member {
            Some(member) => write!(f, "{} {}::{}", self.category, self.owner, member),
            None => write!(f, "{} {}", self.category, self.owner),
        }
    }
}

/// Module and metadata token of a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    /// Module name
    pub module: String,
    /// Token of the declaration
    pub token: Token,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (token: 0x{:08x})", self.module, self.token.value())
    }
}

/// One binding rule violation.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingError {
    /// Kind
    pub kind: ErrorKind,
    /// Human-readable description
    pub message: String,
    /// Offending declaration
    pub symbol: SymbolId,
    /// Locations of the offending declarations, more than one for collisions and overloads
    pub locations: Vec<SourceLocation>,
}

impl BindingError {
    /// Creates a new diagnostic without location.
    pub fn new(kind: ErrorKind, message: impl Into<String>, symbol: SymbolId) -> Self {
        BindingError {
            kind,
            message: message.into(),
            symbol,
            locations: Vec::new(),
        }
    }

    /// Adds a source location.
    #[must_use]
    pub fn at(mut self, module: &str, token: Token) -> Self {
        self.locations.push(SourceLocation {
            module: module.to_string(),
            token,
        });
        self
    }
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.symbol, self.message)?;
        for location in &self.locations {
            write!(f, " at {location}")?;
        }
        Ok(())
    }
}

/// A batch of binding errors, in detection order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BindingErrors(Vec<BindingError>);

impl BindingErrors {
    /// Iterate the errors.
    pub fn iter(&self) -> impl Iterator<Item = &BindingError> {
        self.0.iter()
    }

    /// Number of errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there is no error.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if any error has `kind`.
    #[must_use]
    pub fn contains(&self, kind: ErrorKind) -> bool {
        self.0.iter().any(|error| error.kind == kind)
    }
}

impl From<Vec<BindingError>> for BindingErrors {
    fn from(errors: Vec<BindingError>) -> Self {
        BindingErrors(errors)
    }
}

impl IntoIterator for BindingErrors {
    type Item = BindingError;
    type IntoIter = std::vec::IntoIter<BindingError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for BindingErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} binding error(s)", self.0.len())?;
        for error in &self.0 {
            write!(f, "\n  {error}")?;
        }
        Ok(())
    }
}

/// Lock-free collector of binding errors.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: boxcar::Vec<BindingError>,
}

impl Diagnostics {
    /// Creates a new empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an error.
    pub fn push(&self, error: BindingError) {
        log::debug!("{error}");
        self.entries.push(error);
    }

    /// Adds every error of a batch.
    pub fn extend(&self, errors: BindingErrors) {
        for error in errors {
            self.push(error);
        }
    }

    /// Returns `true` if any error has been collected.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.entries.count() > 0
    }

    /// Number of collected errors.
    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.count()
    }

    /// `Ok(value)` if nothing was collected, otherwise the batch in insertion order.
    ///
    /// # Errors
    /// Returns every collected error.
    pub fn into_result<T>(self, value: T) -> std::result::Result<T, BindingErrors> {
        if self.has_errors() {
            Err(BindingErrors(self.entries.into_iter().collect()))
        } else {
            Ok(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tables::TableId;

    #[test]
    fn display() {
        let error = BindingError::new(
            ErrorKind::FunctionOverload,
            "Function 'Fire' is declared twice",
            SymbolId::member("Game.AMyActor", "Fire", SymbolCategory::Function),
        )
        .at("Game", Token::from_parts(TableId::MethodDef, 1))
        .at("Game", Token::from_parts(TableId::MethodDef, 2));

        assert_eq!(
            error.to_string(),
            "[FunctionOverload] Function Game.AMyActor::Fire: Function 'Fire' is declared twice \
             at Game (token: 0x06000001) at Game (token: 0x06000002)"
        );
    }

    #[test]
    fn collect() {
        let diagnostics = Diagnostics::new();
        assert!(!diagnostics.has_errors());
        diagnostics.push(BindingError::new(
            ErrorKind::GenericType,
            "Generic types cannot be reflected",
            SymbolId::type_("Game.UBox`1"),
        ));
        diagnostics.push(BindingError::new(
            ErrorKind::InvalidEnumName,
            "Enum names start with 'E'",
            SymbolId::type_("Game.Mode"),
        ));
        assert_eq!(diagnostics.count(), 2);

        let errors = diagnostics.into_result(()).unwrap_err();
        assert!(errors.contains(ErrorKind::GenericType));
        assert!(!errors.contains(ErrorKind::NameCollision));
        assert!(errors.to_string().starts_with("2 binding error(s)"));
    }
}
