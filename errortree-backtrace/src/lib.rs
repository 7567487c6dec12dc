#![deny(
    missing_docs,
    unsafe_code,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]

//! Live stack capture and process memory access for errortree reports.
//!
//! The core `errortree` crate only ever sees the frames and memory a host
//! hands it. This crate is that host for plain Rust programs: it captures
//! the current call stack with the [`backtrace`] crate, renders it as stack
//! trace text, and reads native module images out of the running process.
//!
//! # Quick Start
//!
//! ```rust
//! use errortree::ErrorTreeBuilder;
//! use errortree_backtrace::{
//!     ErrorRecordExt, ProcessMemory, build_options_from_env, record_error,
//! };
//!
//! let error = "12a".parse::<u32>().unwrap_err();
//! let record = record_error(&error).capture_stack();
//!
//! let builder = ErrorTreeBuilder::with_options(ProcessMemory, build_options_from_env());
//! let report = builder.build(&record);
//! assert_eq!(report.type_name(), "core::num::error::ParseIntError");
//! assert!(!report.frames().is_empty());
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_BACKTRACE=full` - Captures every frame instead of the first
//!   [`FrameCaptureOptions::DEFAULT`] `max_frame_count`
//! - `ERRORTREE_BACKTRACE` - Comma-separated options:
//!   - `native_only` - Report every frame as a native frame
//!   - `full` - Same as `RUST_BACKTRACE=full`
//! - `ERRORTREE_REPORT` - Comma-separated options read by
//!   [`build_options_from_env`]:
//!   - `no_cycle_guard` - Do not replace repeated exceptions with a marker
//!   - `no_native_debug_info` - Do not read native module images
//!   - `short_type_names` - Use unqualified type names
//!
//! # Debugging symbols in release builds
//!
//! Frames only resolve to methods and source locations when debug info is
//! available. Unresolved frames are reported as native frames.
//!
//! ```toml
//! [profile.release]
//! strip = false
//! debug = "line-tables-only"
//! ```

use std::{error::Error, fmt::Write, sync::OnceLock};

use errortree::{
    BuildOptions, ErrorRecord,
    descriptors::{MethodDescriptor, TypeDescriptor},
    exception::CapturedFrame,
    formatting::{MethodSignatureFormatter, TypeNameFormatter},
};

mod memory;

pub use memory::ProcessMemory;

/// Configuration for capturing the current call stack.
///
/// # Examples
///
/// ```rust
/// use errortree_backtrace::{FrameCaptureOptions, capture_frames};
///
/// let frames = capture_frames(&FrameCaptureOptions {
///     max_frame_count: 4,
///     ..FrameCaptureOptions::DEFAULT
/// });
/// assert!(frames.len() <= 4);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameCaptureOptions {
    /// Symbol fragments of frames to drop while they appear at the top of the
    /// stack. Matching stops at the first frame whose symbol contains none of
    /// them.
    pub skipped_initial_symbols: &'static [&'static str],
    /// Maximum number of frames to capture.
    pub max_frame_count: usize,
    /// Report every frame with a known module as a native frame. Symbols are
    /// resolved only while
    /// [`skipped_initial_symbols`](Self::skipped_initial_symbols) is being
    /// applied.
    pub native_only: bool,
}

impl FrameCaptureOptions {
    /// Default capture settings.
    pub const DEFAULT: Self = Self {
        skipped_initial_symbols: &["backtrace::", "_Unwind_"],
        max_frame_count: 64,
        native_only: false,
    };

    /// Capture settings taken from the environment.
    ///
    /// `RUST_BACKTRACE=full` or the `full` option of `ERRORTREE_BACKTRACE`
    /// lifts the frame limit and keeps the capture machinery's own frames.
    /// The `native_only` option of `ERRORTREE_BACKTRACE` sets
    /// [`native_only`](Self::native_only).
    pub fn new_from_env() -> Self {
        let env_options = ErrortreeEnvOptions::get();

        let options = if env_options.full_backtrace {
            Self {
                skipped_initial_symbols: &[],
                max_frame_count: usize::MAX,
                ..Self::DEFAULT
            }
        } else {
            Self::DEFAULT
        };

        Self {
            native_only: env_options.native_only,
            ..options
        }
    }
}

impl Default for FrameCaptureOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug)]
struct ErrortreeEnvOptions {
    full_backtrace: bool,
    native_only: bool,
    build_options: BuildOptions,
}

impl ErrortreeEnvOptions {
    fn get() -> &'static Self {
        static ERRORTREE_FLAGS: OnceLock<ErrortreeEnvOptions> = OnceLock::new();

        ERRORTREE_FLAGS.get_or_init(|| {
            let mut full_backtrace =
                std::env::var_os("RUST_BACKTRACE").is_some_and(|var| var == "full");
            let mut native_only = false;
            if let Some(var) = std::env::var_os("ERRORTREE_BACKTRACE") {
                for v in var.to_string_lossy().split(',').map(str::trim) {
                    if v.eq_ignore_ascii_case("native_only") {
                        native_only = true;
                    } else if v.eq_ignore_ascii_case("full") {
                        full_backtrace = true;
                    }
                }
            }

            let build_options = match std::env::var_os("ERRORTREE_REPORT") {
                Some(var) => parse_build_options(&var.to_string_lossy()),
                None => BuildOptions::DEFAULT,
            };

            ErrortreeEnvOptions {
                full_backtrace,
                native_only,
                build_options,
            }
        })
    }
}

fn parse_build_options(flags: &str) -> BuildOptions {
    let mut options = BuildOptions::DEFAULT;
    for v in flags.split(',').map(str::trim) {
        if v.eq_ignore_ascii_case("no_cycle_guard") {
            options.detect_cycles = false;
        } else if v.eq_ignore_ascii_case("no_native_debug_info") {
            options.read_native_debug_info = false;
        } else if v.eq_ignore_ascii_case("short_type_names") {
            options.fully_qualified_type_names = false;
        }
    }
    options
}

/// The report [`BuildOptions`] selected by the `ERRORTREE_REPORT`
/// environment variable.
///
/// The variable is read once per process.
pub fn build_options_from_env() -> BuildOptions {
    ErrortreeEnvOptions::get().build_options
}

/// Captures the current call stack, innermost call first.
///
/// Frames whose symbol resolves become method frames carrying the symbol's
/// path, source file and line. Unresolved frames inside a known module
/// become native frames; frames with neither are dropped.
pub fn capture_frames(options: &FrameCaptureOptions) -> Vec<CapturedFrame> {
    let mut frames = Vec::new();
    let mut initial_filtering = !options.skipped_initial_symbols.is_empty();

    backtrace::trace(|frame| {
        if frames.len() >= options.max_frame_count {
            return false;
        }

        let instruction_address = frame.ip() as usize as u64;
        let module_base_address = frame.module_base_address().map(|base| base as usize as u64);

        // In native-only mode symbols are resolved only to skip the capture
        // machinery at the top of the stack.
        let resolved = if !options.native_only || initial_filtering {
            resolve_symbol(frame)
        } else {
            None
        };

        if initial_filtering && let Some((symbol, ..)) = &resolved {
            if options
                .skipped_initial_symbols
                .iter()
                .any(|fragment| symbol.contains(fragment))
            {
                return true;
            }
            initial_filtering = false;
        }

        if options.native_only {
            if let Some(module_base_address) = module_base_address {
                frames.push(CapturedFrame::native(instruction_address, module_base_address));
            }
            return true;
        }

        match (resolved, module_base_address) {
            (Some((symbol, file_name, line_number)), _) => {
                frames.push(CapturedFrame {
                    method: Some(method_from_symbol(&symbol)),
                    file_name,
                    line_number,
                    ..CapturedFrame::default()
                });
            }
            (None, Some(module_base_address)) => {
                frames.push(CapturedFrame::native(instruction_address, module_base_address));
            }
            (None, None) => {}
        }

        true
    });

    frames
}

/// The demangled name, file and line of the first symbol `frame` resolves to.
fn resolve_symbol(frame: &backtrace::Frame) -> Option<(String, Option<String>, Option<u32>)> {
    let mut resolved = None;
    backtrace::resolve_frame(frame, |symbol| {
        // Inlined calls resolve to several symbols; keep the first.
        if resolved.is_some() {
            return;
        }
        let Some(name) = symbol.name() else {
            return;
        };
        resolved = Some((
            format!("{name:#}"),
            symbol.filename().map(|path| path.display().to_string()),
            symbol.lineno(),
        ));
    });
    resolved
}

/// Builds a method descriptor from a demangled symbol such as
/// `app::config::Loader::load`.
fn method_from_symbol(symbol: &str) -> MethodDescriptor {
    match split_symbol(symbol) {
        (Some(path), name) => {
            MethodDescriptor::new(name).with_declaring_type(TypeDescriptor::parse(path))
        }
        (None, name) => MethodDescriptor::new(name),
    }
}

/// Splits a symbol at its last `::` outside of `<...>`.
fn split_symbol(symbol: &str) -> (Option<&str>, &str) {
    let mut angle_nesting_level = 0u64;
    let mut previous = ' ';
    let mut split = None;

    for (i, c) in symbol.char_indices() {
        match c {
            '<' => angle_nesting_level = angle_nesting_level.saturating_add(1),
            '>' if previous != '-' => {
                angle_nesting_level = angle_nesting_level.saturating_sub(1);
            }
            ':' if previous == ':' && angle_nesting_level == 0 => split = Some(i - 1),
            _ => {}
        }
        previous = c;
    }

    match split {
        Some(i) if i > 0 => (Some(&symbol[..i]), &symbol[i + 2..]),
        _ => (None, symbol),
    }
}

/// Renders frames as stack trace text, one `   at ...` line per frame.
///
/// # Examples
///
/// ```rust
/// use errortree::{
///     descriptors::{MethodDescriptor, TypeDescriptor},
///     exception::CapturedFrame,
/// };
/// use errortree_backtrace::render_stack_trace;
///
/// let frames = [
///     CapturedFrame::managed(
///         MethodDescriptor::new("load").with_declaring_type(TypeDescriptor::parse("app::Config")),
///     )
///     .with_location("src/config.rs", 42),
///     CapturedFrame::native(0x7f00_0000_1234, 0x7f00_0000_0000),
/// ];
///
/// assert_eq!(
///     render_stack_trace(&frames),
///     "   at app::Config.load() in src/config.rs:line 42\n   \
///      at 0x7f0000001234 (module 0x7f0000000000)"
/// );
/// ```
pub fn render_stack_trace(frames: &[CapturedFrame]) -> String {
    let mut text = String::new();
    for (index, frame) in frames.iter().enumerate() {
        if index > 0 {
            text.push('\n');
        }
        // Writing to a `String` cannot fail.
        let _ = write_frame(&mut text, frame);
    }
    text
}

fn write_frame(text: &mut String, frame: &CapturedFrame) -> std::fmt::Result {
    text.push_str("   at ");

    if let Some(native) = frame.native {
        return write!(
            text,
            "{:#x} (module {:#x})",
            native.instruction_address, native.module_base_address
        );
    }

    match &frame.method {
        Some(method) => {
            if let Some(declaring_type) = &method.declaring_type {
                write!(text, "{}.", TypeNameFormatter::new(declaring_type, true))?;
            }
            write!(text, "{}", MethodSignatureFormatter::new(method))?;
        }
        None => text.push_str("<UnknownMethod>"),
    }

    match (&frame.file_name, frame.line_number) {
        (Some(file_name), Some(line_number)) => {
            write!(text, " in {file_name}:line {line_number}")
        }
        (Some(file_name), None) => write!(text, " in {file_name}"),
        (None, _) => Ok(()),
    }
}

/// Extension trait for attaching the current call stack to an
/// [`ErrorRecord`].
///
/// # Examples
///
/// ```rust
/// use errortree::{ErrorRecord, ReportableError, descriptors::TypeDescriptor};
/// use errortree_backtrace::ErrorRecordExt;
///
/// let record = ErrorRecord::new(TypeDescriptor::new("app::Failure", "Failure")).capture_stack();
/// assert!(record.captured_frames().is_some());
/// ```
pub trait ErrorRecordExt: Sized {
    /// Captures the current call stack with
    /// [`FrameCaptureOptions::new_from_env`] and attaches both the frames and
    /// their rendered text.
    #[must_use]
    fn capture_stack(self) -> Self {
        self.capture_stack_with_options(&FrameCaptureOptions::new_from_env())
    }

    /// Like [`capture_stack`](Self::capture_stack), with explicit options.
    #[must_use]
    fn capture_stack_with_options(self, options: &FrameCaptureOptions) -> Self;
}

impl ErrorRecordExt for ErrorRecord {
    fn capture_stack_with_options(self, options: &FrameCaptureOptions) -> Self {
        let frames = capture_frames(options);
        let text = render_stack_trace(&frames);
        tracing::trace!(frame_count = frames.len(), "captured call stack");
        self.with_stack_trace(text).with_frames(frames)
    }
}

/// The data key under which [`record_error`] stores an error's message.
pub const MESSAGE_DATA_KEY: &str = "message";

/// Describes a Rust error and its [`source`](Error::source) chain.
///
/// The outermost record is typed as `E`. Sources are only known as trait
/// objects and are typed as `dyn core::error::Error`. Every record stores its
/// error's `Display` output under [`MESSAGE_DATA_KEY`]; each source becomes
/// the single cause of the record before it.
///
/// # Examples
///
/// ```rust
/// use errortree::build;
/// use errortree_backtrace::record_error;
///
/// let error = std::io::Error::other("disk on fire");
/// let report = build(&record_error(&error));
///
/// assert_eq!(report.type_name(), "std::io::error::Error");
/// assert_eq!(report.data()["message"], "disk on fire");
/// ```
pub fn record_error<E>(error: &E) -> ErrorRecord
where
    E: Error + ?Sized,
{
    let mut messages = Vec::new();
    let mut source = error.source();
    while let Some(current) = source {
        messages.push(current.to_string());
        source = current.source();
    }

    let source_type = TypeDescriptor::of::<dyn Error>();
    let cause = messages.into_iter().rev().fold(None, |cause, message| {
        let record = ErrorRecord::new(source_type.clone()).with_data(MESSAGE_DATA_KEY, message);
        Some(match cause {
            Some(cause) => record.with_cause(cause),
            None => record,
        })
    });

    let record =
        ErrorRecord::new(TypeDescriptor::of::<E>()).with_data(MESSAGE_DATA_KEY, error.to_string());
    match cause {
        Some(cause) => record.with_cause(cause),
        None => record,
    }
}
