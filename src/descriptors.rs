//! Type and method metadata supplied by the host.
//!
//! The report builder never inspects types through a reflection API. Hosts
//! describe the types and methods they want reported with the plain values in
//! this module instead. Rust hosts can derive a [`TypeDescriptor`] from
//! [`core::any::type_name`] through [`TypeDescriptor::of`].

use alloc::{string::String, vec::Vec};

/// The display names of a type and its generic arguments.
///
/// # Examples
///
/// ```
/// use errortree::descriptors::TypeDescriptor;
///
/// let list = TypeDescriptor::new("System.Collections.Generic.List`1", "List`1")
///     .with_generic_argument(TypeDescriptor::new("System.String", "String"));
///
/// assert_eq!(list.name(), "List`1");
/// assert_eq!(list.generic_arguments().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    full_name: String,
    name: String,
    generic_arguments: Vec<TypeDescriptor>,
}

impl TypeDescriptor {
    /// Creates a descriptor without generic arguments.
    pub fn new(full_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            name: name.into(),
            generic_arguments: Vec::new(),
        }
    }

    /// Appends one generic argument.
    #[must_use]
    pub fn with_generic_argument(mut self, argument: TypeDescriptor) -> Self {
        self.generic_arguments.push(argument);
        self
    }

    /// Appends several generic arguments, in order.
    #[must_use]
    pub fn with_generic_arguments(
        mut self,
        arguments: impl IntoIterator<Item = TypeDescriptor>,
    ) -> Self {
        self.generic_arguments.extend(arguments);
        self
    }

    /// The namespace-qualified name.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// The unqualified name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The generic arguments, in declaration order.
    pub fn generic_arguments(&self) -> &[TypeDescriptor] {
        &self.generic_arguments
    }

    /// Describes the Rust type `T`.
    ///
    /// ```
    /// use errortree::descriptors::TypeDescriptor;
    ///
    /// let ty = TypeDescriptor::of::<Option<u32>>();
    /// assert_eq!(ty.full_name(), "core::option::Option");
    /// assert_eq!(ty.name(), "Option");
    /// assert_eq!(ty.generic_arguments()[0].name(), "u32");
    /// ```
    pub fn of<T: ?Sized>() -> Self {
        Self::parse(core::any::type_name::<T>())
    }

    /// Describes a Rust type from its textual name, such as the output of
    /// [`core::any::type_name`].
    ///
    /// A path with a trailing `<...>` argument list is split into its path and
    /// arguments. Anything else that is not a plain path (references, tuples,
    /// slices, arrays, pointers, trait objects, function types, qualified
    /// paths) is kept whole as a leaf.
    pub fn parse(type_name: &str) -> Self {
        let type_name = type_name.trim();
        if !is_path(type_name) {
            return Self::new(type_name, type_name);
        }

        let Some(open) = trailing_argument_list(type_name) else {
            return Self::new(type_name, last_segment(type_name));
        };

        let path = &type_name[..open];
        let arguments = &type_name[open + 1..type_name.len() - 1];
        Self::new(path, last_segment(path))
            .with_generic_arguments(split_top_level(arguments).map(Self::parse))
    }
}

/// Describes one formal parameter of a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterDescriptor {
    /// The parameter name.
    pub name: String,
    /// The parameter type, when the host could determine it.
    pub parameter_type: Option<TypeDescriptor>,
}

impl ParameterDescriptor {
    /// A parameter of a known type.
    pub fn new(name: impl Into<String>, parameter_type: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            parameter_type: Some(parameter_type),
        }
    }

    /// A parameter whose type is not known.
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameter_type: None,
        }
    }
}

/// Describes the method executing in a stack frame.
///
/// # Examples
///
/// ```
/// use errortree::descriptors::{MethodDescriptor, ParameterDescriptor, TypeDescriptor};
///
/// let method = MethodDescriptor::new("Parse")
///     .with_declaring_type(TypeDescriptor::new("App.Config", "Config"))
///     .with_parameter(ParameterDescriptor::new(
///         "text",
///         TypeDescriptor::new("System.String", "String"),
///     ));
///
/// assert_eq!(method.parameters.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    /// The method name.
    pub name: String,
    /// The type declaring the method.
    pub declaring_type: Option<TypeDescriptor>,
    /// Names of the method's own generic parameters. Empty for a non-generic
    /// method.
    pub generic_parameters: Vec<String>,
    /// Formal parameters, in order.
    pub parameters: Vec<ParameterDescriptor>,
}

impl MethodDescriptor {
    /// A non-generic method without parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declaring_type: None,
            generic_parameters: Vec::new(),
            parameters: Vec::new(),
        }
    }

    /// Sets the declaring type.
    #[must_use]
    pub fn with_declaring_type(mut self, declaring_type: TypeDescriptor) -> Self {
        self.declaring_type = Some(declaring_type);
        self
    }

    /// Appends a generic parameter name.
    #[must_use]
    pub fn with_generic_parameter(mut self, name: impl Into<String>) -> Self {
        self.generic_parameters.push(name.into());
        self
    }

    /// Appends a formal parameter.
    #[must_use]
    pub fn with_parameter(mut self, parameter: ParameterDescriptor) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Whether the method declares generic parameters of its own.
    pub fn is_generic(&self) -> bool {
        !self.generic_parameters.is_empty()
    }
}

fn is_path(type_name: &str) -> bool {
    const NON_PATH_PREFIXES: [&str; 6] = ["dyn ", "impl ", "fn(", "unsafe ", "extern ", "for<"];

    match type_name.chars().next() {
        None | Some('&' | '*' | '(' | '[' | '<' | '!') => false,
        Some(_) => !NON_PATH_PREFIXES
            .iter()
            .any(|prefix| type_name.starts_with(prefix)),
    }
}

/// The index of the `<` matching a trailing `>`, if there is one.
fn trailing_argument_list(type_name: &str) -> Option<usize> {
    if !type_name.ends_with('>') {
        return None;
    }

    let bytes = type_name.as_bytes();
    let mut depth = 0usize;
    for (index, &byte) in bytes.iter().enumerate().rev() {
        match byte {
            // `->` in function types is not a closing bracket.
            b'>' if index > 0 && bytes[index - 1] == b'-' => {}
            b'>' => depth += 1,
            b'<' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

fn last_segment(path: &str) -> &str {
    path.rsplit_once("::").map_or(path, |(_, last)| last)
}

/// Splits on commas that are not nested inside `<>`, `()` or `[]`.
fn split_top_level(list: &str) -> impl Iterator<Item = &str> {
    let mut depth = 0usize;
    let mut start = 0;
    let mut pieces = Vec::new();
    let mut previous = ' ';
    for (index, c) in list.char_indices() {
        match c {
            '<' | '(' | '[' => depth += 1,
            // `->` in function types is not a closing bracket.
            '>' if previous == '-' => {}
            '>' | ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                pieces.push(&list[start..index]);
                start = index + 1;
            }
            _ => {}
        }
        previous = c;
    }
    pieces.push(&list[start..]);
    pieces
        .into_iter()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
}

impl From<&str> for TypeDescriptor {
    fn from(type_name: &str) -> Self {
        Self::parse(type_name)
    }
}

/// Formats as [`format_type_name(self, true)`](crate::formatting::format_type_name).
impl core::fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&crate::formatting::TypeNameFormatter::new(self, true), f)
    }
}
