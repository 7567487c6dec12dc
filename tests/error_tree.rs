//! End-to-end tests building report trees from hand-made exceptions.

use std::cell::OnceCell;

use errortree::{
    BuildOptions, CYCLE_DETECTED_MESSAGE, CauseLink, ErrorNode, ErrorRecord, ErrorTreeBuilder,
    MemoryImage, NO_STACK_TRACE_MESSAGE, ReportableError, StackFrame, UnreadableMemory, build,
    descriptors::{MethodDescriptor, ParameterDescriptor, TypeDescriptor},
    exception::{CapturedFrame, CauseShape, ReportData, empty_data},
};

const MODULE_BASE: u64 = 0x7FF6_2000_0000;
const SIGNATURE_OFFSET: usize = 0xF0;
const DEBUG_ENTRY: usize = 0x1A0;
const BLOB: usize = 0x1E0;
const PDB_NAME: &[u8] = b"D:\\a\\_work\\bin\\Native.pdb\0";

fn record(full_name: &str) -> ErrorRecord {
    let name = full_name.rsplit('.').next().unwrap_or(full_name);
    ErrorRecord::new(TypeDescriptor::new(full_name, name))
}

fn put(bytes: &mut [u8], offset: usize, value: &[u8]) {
    bytes[offset..offset + value.len()].copy_from_slice(value);
}

/// A module image with one debug directory entry naming [`PDB_NAME`].
///
/// `declared_size` is written as the entry's raw data size.
fn module_image(debug_directory: u32, declared_size: u32) -> Vec<u8> {
    let mut bytes = vec![0u8; 0x240];
    put(&mut bytes, 0, b"MZ");
    put(&mut bytes, 0x3C, &(SIGNATURE_OFFSET as u32).to_le_bytes());
    put(&mut bytes, SIGNATURE_OFFSET, b"PE\0\0");
    put(&mut bytes, SIGNATURE_OFFSET + 168, &debug_directory.to_le_bytes());
    put(&mut bytes, SIGNATURE_OFFSET + 172, &0x1Cu32.to_le_bytes());
    put(&mut bytes, DEBUG_ENTRY + 4, &0x6512_0A0Bu32.to_le_bytes());
    put(&mut bytes, DEBUG_ENTRY + 12, &2u32.to_le_bytes());
    put(&mut bytes, DEBUG_ENTRY + 16, &declared_size.to_le_bytes());
    put(&mut bytes, DEBUG_ENTRY + 20, &(BLOB as u32).to_le_bytes());
    put(&mut bytes, DEBUG_ENTRY + 24, &0x0000_4E00u32.to_le_bytes());
    put(&mut bytes, BLOB, b"RSDS");
    put(&mut bytes, BLOB + 4, &[0xAB; 16]);
    put(&mut bytes, BLOB + 20, &1u32.to_le_bytes());
    put(&mut bytes, BLOB + 24, PDB_NAME);
    bytes
}

fn valid_module_image() -> Vec<u8> {
    module_image(DEBUG_ENTRY as u32, 24 + PDB_NAME.len() as u32)
}

fn native_frames() -> [CapturedFrame; 3] {
    [
        CapturedFrame::native(MODULE_BASE + 0x1234, MODULE_BASE),
        CapturedFrame::managed(
            MethodDescriptor::new("Invoke")
                .with_declaring_type(TypeDescriptor::new("App.Interop", "Interop")),
        )
        .with_location("Interop.cs", 88),
        // A module that is not mapped in the image.
        CapturedFrame::native(0x5000_0010, 0x5000_0000),
    ]
}

#[test]
fn test_stack_text_is_preserved_verbatim() {
    let text = "   at App.Worker.Run() in Worker.cs:line 10\n   at App.Program.Main()";
    let node = build(&record("App.WorkerFailed").with_stack_trace(text));
    assert_eq!(node.message(), text);
}

#[test]
fn test_missing_stack_text_and_missing_frames_use_distinct_sentinels() {
    let node = build(&record("App.WorkerFailed").with_stack_trace(" \n"));
    assert_eq!(node.message(), NO_STACK_TRACE_MESSAGE);
    assert_eq!(node.frames(), [StackFrame::no_frames()]);

    let StackFrame::Managed { file_name, .. } = &node.frames()[0] else {
        panic!("sentinel frame is managed");
    };
    assert_ne!(file_name.as_deref(), Some(NO_STACK_TRACE_MESSAGE));
}

#[test]
fn test_composite_causes_keep_order_and_length() {
    let causes = [
        record("App.First").with_stack_trace("at First()"),
        record("App.Second"),
        record("App.Third").with_data("retry", true),
    ];
    let node = build(&record("System.AggregateException").with_causes(causes.clone()));

    let expected: Vec<ErrorNode> = causes.iter().map(|cause| build(cause)).collect();
    assert_eq!(node.cause(), &CauseLink::Multiple(expected));
}

#[test]
fn test_single_cause_is_built_recursively() {
    let inner = record("System.IO.FileNotFoundException").with_data("path", "/etc/app.toml");
    let node = build(&record("App.ConfigException").with_cause(inner.clone()));
    assert_eq!(node.cause(), &CauseLink::Single(Box::new(build(&inner))));
}

#[test]
fn test_empty_composite_is_multiple_not_none() {
    let node = build(&record("System.AggregateException").with_causes(Vec::new()));
    assert_eq!(node.cause(), &CauseLink::Multiple(Vec::new()));
}

#[test]
fn test_generic_type_names_are_expanded() {
    let ty = TypeDescriptor::new("App.Errors.BatchException`1", "BatchException`1")
        .with_generic_argument(
            TypeDescriptor::new("System.Collections.Generic.List`1", "List`1").with_generic_argument(
                TypeDescriptor::new("System.Collections.Generic.Dictionary`2", "Dictionary`2")
                    .with_generic_arguments([
                        TypeDescriptor::new("System.String", "String"),
                        TypeDescriptor::new("System.Int32", "Int32"),
                    ]),
            ),
        );

    let node = build(&ErrorRecord::new(ty));
    assert_eq!(
        node.type_name(),
        "App.Errors.BatchException<List<Dictionary<String,Int32>>>"
    );
}

#[test]
fn test_managed_frames_carry_signatures() {
    let method = MethodDescriptor::new("Parse")
        .with_declaring_type(TypeDescriptor::new("App.Config", "Config"))
        .with_generic_parameter("T")
        .with_parameter(ParameterDescriptor::new(
            "text",
            TypeDescriptor::new("System.String", "String"),
        ))
        .with_parameter(ParameterDescriptor::untyped("options"));
    let exception = record("App.ParseException")
        .with_frames([CapturedFrame::managed(method).with_instruction_offset(0x33)]);

    assert_eq!(
        build(&exception).frames(),
        [StackFrame::Managed {
            declaring_type_name: "App.Config".into(),
            method_signature: "Parse[T](String text, <UnknownType> options)".into(),
            file_name: None,
            line_number: 0x33,
        }]
    );
}

#[test]
fn test_native_frames_decode_debug_info() {
    let image = valid_module_image();
    let builder = ErrorTreeBuilder::new(MemoryImage::new(MODULE_BASE, &image));
    let node = builder.build(&record("App.NativeCrash").with_frames(native_frames()));

    let frames = node.frames();
    assert_eq!(frames.len(), 3);

    let StackFrame::Native {
        instruction_address,
        module_base_address,
        debug_info: Some(info),
    } = &frames[0]
    else {
        panic!("expected decoded debug info, got {:?}", frames[0]);
    };
    assert_eq!(*instruction_address, MODULE_BASE + 0x1234);
    assert_eq!(*module_base_address, MODULE_BASE);
    assert_eq!(info.timestamp, 0x6512_0A0B);
    assert_eq!(info.debug_type, 2);
    assert_eq!(info.raw_data_address, BLOB as u32);
    assert_eq!(info.raw_data_file_offset, 0x4E00);
    assert_eq!(&info.embedded_signature, b"RSDS");
    assert_eq!(info.debug_data_id, [0xAB; 16]);
    assert_eq!(info.age, 1);
    assert_eq!(info.debug_data_file_name, "D:\\a\\_work\\bin\\Native.pdb");

    assert!(!frames[1].is_native());
    assert_eq!(frames[2].debug_info(), None);
    assert!(frames[2].is_native());
}

#[test]
fn test_zero_debug_directory_means_no_debug_info() {
    let image = module_image(0, 24 + PDB_NAME.len() as u32);
    let builder = ErrorTreeBuilder::new(MemoryImage::new(MODULE_BASE, &image));
    let node = builder.build(&record("App.NativeCrash").with_frames(native_frames()));

    assert!(node.frames()[0].is_native());
    assert_eq!(node.frames()[0].debug_info(), None);
}

#[test]
fn test_oversized_debug_data_only_degrades_its_own_frame() {
    let image = module_image(DEBUG_ENTRY as u32, 0x4000);
    let builder = ErrorTreeBuilder::new(MemoryImage::new(MODULE_BASE, &image));
    let node = builder.build(&record("App.NativeCrash").with_frames(native_frames()));

    let frames = node.frames();
    assert_eq!(frames.len(), 3);
    assert_eq!(
        frames[0],
        StackFrame::Native {
            instruction_address: MODULE_BASE + 0x1234,
            module_base_address: MODULE_BASE,
            debug_info: None,
        }
    );
    assert_eq!(
        frames[1],
        StackFrame::Managed {
            declaring_type_name: "App.Interop".into(),
            method_signature: "Invoke()".into(),
            file_name: Some("Interop.cs".into()),
            line_number: 88,
        }
    );
}

#[test]
fn test_native_debug_info_can_be_disabled() {
    let image = valid_module_image();
    let builder = ErrorTreeBuilder::with_options(
        MemoryImage::new(MODULE_BASE, &image),
        BuildOptions {
            read_native_debug_info: false,
            ..BuildOptions::DEFAULT
        },
    );
    let node = builder.build(&record("App.NativeCrash").with_frames(native_frames()));
    assert!(node.frames().iter().all(|frame| frame.debug_info().is_none()));
}

#[test]
fn test_data_bag_is_shared_with_the_exception() {
    let exception = record("App.Failure")
        .with_data("tenant", "acme")
        .with_data("attempt", 3);
    let node = build(&exception);

    assert!(triomphe::Arc::ptr_eq(node.data(), exception.data()));
    let keys: Vec<&str> = node.data().keys().map(String::as_str).collect();
    assert_eq!(keys, ["tenant", "attempt"]);
}

/// An exception whose cause is set after construction, so causes can loop.
struct Linked<'a> {
    ty: TypeDescriptor,
    data: ReportData,
    cause: OnceCell<&'a Linked<'a>>,
}

impl<'a> Linked<'a> {
    fn new(full_name: &str) -> Self {
        Self {
            ty: TypeDescriptor::new(full_name, full_name),
            data: empty_data(),
            cause: OnceCell::new(),
        }
    }

    fn link(&self, cause: &'a Linked<'a>) {
        assert!(self.cause.set(cause).is_ok());
    }
}

impl ReportableError for Linked<'_> {
    fn type_descriptor(&self) -> &TypeDescriptor {
        &self.ty
    }

    fn stack_trace_text(&self) -> Option<&str> {
        Some("at Loop()")
    }

    fn captured_frames(&self) -> Option<&[CapturedFrame]> {
        None
    }

    fn cause_shape(&self) -> CauseShape<'_> {
        match self.cause.get() {
            Some(cause) => CauseShape::Single(*cause),
            None => CauseShape::None,
        }
    }

    fn data(&self) -> &ReportData {
        &self.data
    }
}

#[test]
fn test_cycles_end_in_a_marker_node() {
    let first = Linked::new("App.First");
    let second = Linked::new("App.Second");
    first.link(&second);
    second.link(&first);

    let node = build(&first);
    let names: Vec<&str> = node.iter().map(ErrorNode::type_name).collect();
    assert_eq!(names, ["App.First", "App.Second", "App.First"]);

    let marker = node.iter().last().unwrap();
    assert_eq!(marker.message(), CYCLE_DETECTED_MESSAGE);
    assert_eq!(marker.frames(), [StackFrame::no_frames()]);
    assert!(marker.cause().is_none());
}

#[test]
fn test_self_referencing_exception_is_cut_immediately() {
    let looped = Linked::new("App.Loop");
    looped.link(&looped);

    let node = build(&looped);
    assert_eq!(node.message(), "at Loop()");
    let CauseLink::Single(marker) = node.cause() else {
        panic!("expected the marker as single cause");
    };
    assert_eq!(marker.message(), CYCLE_DETECTED_MESSAGE);
    assert_eq!(marker.type_name(), "App.Loop");
}

#[test]
fn test_report_serializes_with_inner_error_keys() {
    let exception = record("App.SyncFailed")
        .with_stack_trace("at Sync()")
        .with_data("account", 42)
        .with_cause(record("System.AggregateException").with_causes([
            record("System.TimeoutException"),
            record("System.IO.IOException"),
        ]));

    let json = serde_json::to_value(build(&exception)).unwrap();
    assert_eq!(json["message"], "at Sync()");
    assert_eq!(json["data"]["account"], 42);
    assert_eq!(json["innerError"]["typeName"], "System.AggregateException");
    assert_eq!(
        json["innerError"]["innerErrors"][0]["message"],
        NO_STACK_TRACE_MESSAGE
    );
    assert_eq!(
        json["innerError"]["innerErrors"][1]["frames"][0]["fileName"],
        "none"
    );
}

#[test]
fn test_unreadable_memory_still_reports_native_frames() {
    let node = ErrorTreeBuilder::new(UnreadableMemory)
        .build(&record("App.NativeCrash").with_frames(native_frames()));
    assert_eq!(node.frames().iter().filter(|frame| frame.is_native()).count(), 2);
}
