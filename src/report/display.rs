use alloc::string::String;
use core::fmt;

use crate::report::node::ErrorNode;

const NODE_MARKER: &str = "● ";
const ITEM_MIDDLE: &str = "├ ";
const ITEM_LAST: &str = "╰ ";
const CHILD_MIDDLE: &str = "├─ ";
const CHILD_LAST: &str = "╰─ ";
const CHILD_MIDDLE_INDENT: &str = "│  ";
const CHILD_LAST_INDENT: &str = "   ";
const SEPARATOR: &str = "│";

/// Renders the tree with one `●` line per exception, its frames and data
/// entries below it and its causes indented beneath.
///
/// ```
/// use errortree::{ErrorRecord, build, descriptors::TypeDescriptor};
///
/// let record = ErrorRecord::new(TypeDescriptor::new("App.Outer", "Outer"))
///     .with_data("attempt", 2)
///     .with_cause(ErrorRecord::new(TypeDescriptor::new("App.Inner", "Inner")));
///
/// assert_eq!(
///     build(&record).to_string(),
///     "● App.Outer\n\
///      ├ (no frames)\n\
///      ├ attempt: 2\n\
///      │\n\
///      ╰─ ● App.Inner\n   \
///         ╰ (no frames)\n"
/// );
/// ```
impl fmt::Display for ErrorNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_node(f, self, "", &mut String::new())
    }
}

fn write_node(
    f: &mut fmt::Formatter<'_>,
    node: &ErrorNode,
    head: &str,
    indent: &mut String,
) -> fmt::Result {
    writeln!(f, "{head}{NODE_MARKER}{}", node.type_name())?;

    let children = node.children();
    let item_count = node.frames().len() + node.data().len();
    let connector = |index: usize| {
        if index + 1 == item_count && children.is_empty() {
            ITEM_LAST
        } else {
            ITEM_MIDDLE
        }
    };

    for (index, frame) in node.frames().iter().enumerate() {
        writeln!(f, "{indent}{}{frame}", connector(index))?;
    }
    for (index, (key, value)) in node.data().iter().enumerate() {
        let index = node.frames().len() + index;
        writeln!(f, "{indent}{}{key}: {value}", connector(index))?;
    }

    for (index, child) in children.iter().enumerate() {
        if index > 0 || item_count > 0 {
            writeln!(f, "{indent}{SEPARATOR}")?;
        }
        let is_last = index + 1 == children.len();
        let (child_head, child_indent) = if is_last {
            (CHILD_LAST, CHILD_LAST_INDENT)
        } else {
            (CHILD_MIDDLE, CHILD_MIDDLE_INDENT)
        };

        let head = alloc::format!("{indent}{child_head}");
        let restore = indent.len();
        indent.push_str(child_indent);
        write_node(f, child, &head, indent)?;
        indent.truncate(restore);
    }

    Ok(())
}
