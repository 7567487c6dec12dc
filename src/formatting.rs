//! Display names for types and method signatures.
//!
//! Both formatters are [`Display`](core::fmt::Display) adapters, so they can
//! be written straight into an existing buffer. [`format_type_name`] and
//! [`format_method_signature`] are the owned-`String` shorthands used by the
//! report builder.

use alloc::string::{String, ToString};
use core::fmt::{self, Write};

use crate::descriptors::{MethodDescriptor, TypeDescriptor};

/// The type name rendered for a parameter whose type is not known.
pub const UNKNOWN_PARAMETER_TYPE: &str = "<UnknownType>";

/// Formats a type name with its generic arguments expanded.
///
/// A type without generic arguments is rendered as its (full or short) name
/// unchanged. A generic type is rendered as `Base<Arg1,Arg2>`, where `Base` is
/// the name with any backtick arity marker removed and every argument is
/// formatted recursively with its short name.
///
/// # Examples
///
/// ```
/// use errortree::{descriptors::TypeDescriptor, formatting::TypeNameFormatter};
///
/// let ty = TypeDescriptor::new("System.Collections.Generic.List`1", "List`1")
///     .with_generic_argument(TypeDescriptor::new("System.Int32", "Int32"));
///
/// assert_eq!(
///     TypeNameFormatter::new(&ty, true).to_string(),
///     "System.Collections.Generic.List<Int32>"
/// );
/// assert_eq!(TypeNameFormatter::new(&ty, false).to_string(), "List<Int32>");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TypeNameFormatter<'a> {
    ty: &'a TypeDescriptor,
    fully_qualified: bool,
}

impl<'a> TypeNameFormatter<'a> {
    /// Formats `ty`, using its full name when `fully_qualified` is set.
    pub fn new(ty: &'a TypeDescriptor, fully_qualified: bool) -> Self {
        Self {
            ty,
            fully_qualified,
        }
    }
}

impl fmt::Display for TypeNameFormatter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.fully_qualified {
            self.ty.full_name()
        } else {
            self.ty.name()
        };

        let arguments = self.ty.generic_arguments();
        if arguments.is_empty() {
            return f.write_str(name);
        }

        let base = name.split_once('`').map_or(name, |(base, _arity)| base);
        f.write_str(base)?;
        f.write_char('<')?;
        for (index, argument) in arguments.iter().enumerate() {
            if index > 0 {
                f.write_char(',')?;
            }
            write!(f, "{}", TypeNameFormatter::new(argument, false))?;
        }
        f.write_char('>')
    }
}

/// Formats a method as `Name[T1,T2](Type1 name1, Type2 name2)`.
///
/// The bracketed list only appears for generic methods. Parameter types use
/// their short, unexpanded name, or [`UNKNOWN_PARAMETER_TYPE`] when unknown.
///
/// # Examples
///
/// ```
/// use errortree::{
///     descriptors::{MethodDescriptor, ParameterDescriptor, TypeDescriptor},
///     formatting::MethodSignatureFormatter,
/// };
///
/// let method = MethodDescriptor::new("Convert")
///     .with_generic_parameter("T")
///     .with_parameter(ParameterDescriptor::new(
///         "input",
///         TypeDescriptor::new("System.String", "String"),
///     ))
///     .with_parameter(ParameterDescriptor::untyped("state"));
///
/// assert_eq!(
///     MethodSignatureFormatter::new(&method).to_string(),
///     "Convert[T](String input, <UnknownType> state)"
/// );
/// ```
#[derive(Debug, Clone, Copy)]
pub struct MethodSignatureFormatter<'a> {
    method: &'a MethodDescriptor,
}

impl<'a> MethodSignatureFormatter<'a> {
    /// Formats `method`.
    pub fn new(method: &'a MethodDescriptor) -> Self {
        Self { method }
    }
}

impl fmt::Display for MethodSignatureFormatter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.method.name)?;

        if self.method.is_generic() {
            f.write_char('[')?;
            for (index, parameter) in self.method.generic_parameters.iter().enumerate() {
                if index > 0 {
                    f.write_char(',')?;
                }
                f.write_str(parameter)?;
            }
            f.write_char(']')?;
        }

        f.write_char('(')?;
        for (index, parameter) in self.method.parameters.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            let type_name = parameter
                .parameter_type
                .as_ref()
                .map_or(UNKNOWN_PARAMETER_TYPE, TypeDescriptor::name);
            write!(f, "{type_name} {}", parameter.name)?;
        }
        f.write_char(')')
    }
}

/// Returns the display name of `ty`.
///
/// See [`TypeNameFormatter`].
pub fn format_type_name(ty: &TypeDescriptor, fully_qualified: bool) -> String {
    TypeNameFormatter::new(ty, fully_qualified).to_string()
}

/// Returns the display signature of `method`.
///
/// See [`MethodSignatureFormatter`].
pub fn format_method_signature(method: &MethodDescriptor) -> String {
    MethodSignatureFormatter::new(method).to_string()
}
