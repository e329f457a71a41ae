//! Names of the managed runtime surface the emitted sources call.
//!
//! The native accessor layer is reached only through these entry points; their shapes are:
//!
//! | Name | Shape |
//! |---|---|
//! | [`FIND_TYPE`] | `(string path) -> IntPtr` |
//! | [`FIND_MEMBER`] | `(IntPtr type, string name) -> IntPtr` |
//! | [`GET_MEMBER_OFFSET`] | `(IntPtr member) -> int` |
//! | [`GET_MEMBER_SIZE`] | `(IntPtr member) -> int` |
//! | [`FIND_FUNCTION`] | `(IntPtr type, string name) -> IntPtr` |
//! | [`GET_FUNCTION_PARAMS_SIZE`] | `(IntPtr function) -> int` |
//! | [`INVOKE_FUNCTION`] | `(IntPtr target, IntPtr function, IntPtr buffer, int size)` |
//! | [`RESOLVE_FUNCTION_TABLE`] | `(IntPtr type, string[] names, IntPtr* slots)`, throws on any unresolved name |
//! | [`BROADCAST_DELEGATE`] | `(IntPtr target, int offset, IntPtr buffer, int size)` |

/// Namespace of the runtime support library.
pub const RUNTIME_NAMESPACE: &str = "Bindweaver.Runtime";

/// Static class hosting the accessor entry points.
pub const REFLECTION: &str = "NativeReflection";

/// Resolve a type handle from its native path.
pub const FIND_TYPE: &str = "NativeReflection.FindType";

/// Resolve a property handle of a type by name.
pub const FIND_MEMBER: &str = "NativeReflection.FindMember";

/// Byte offset of a property handle.
pub const GET_MEMBER_OFFSET: &str = "NativeReflection.GetMemberOffset";

/// Byte size of a property handle.
pub const GET_MEMBER_SIZE: &str = "NativeReflection.GetMemberSize";

/// Resolve a function handle of a type by name.
pub const FIND_FUNCTION: &str = "NativeReflection.FindFunction";

/// Size of a function's native parameter block.
pub const GET_FUNCTION_PARAMS_SIZE: &str = "NativeReflection.GetFunctionParamsSize";

/// Generic invocation of a reflected function over a parameter buffer.
pub const INVOKE_FUNCTION: &str = "NativeReflection.InvokeFunction";

/// Bulk resolution of native function pointers by name.
pub const RESOLVE_FUNCTION_TABLE: &str = "NativeReflection.ResolveFunctionTable";

/// Sentinel held by offset slots until they are resolved.
pub const UNRESOLVED_OFFSET: &str = "NativeReflection.UnresolvedOffset";

/// Failure raised when a resolved offset is negative or out of range.
pub const OFFSET_ASSERT: &str = "NativeReflection.CheckOffset";

/// Base class of every bound object without a generated super type.
pub const OBJECT_BASE: &str = "UObject";

/// Handle of the native object behind a bound instance.
pub const NATIVE_OBJECT: &str = "NativeObject";

/// Local holding the parameter block of a generic invocation.
pub const PARAMS_BUFFER: &str = "paramsBuffer";

/// Local holding the return value of a direct native call.
pub const RESULT_LOCAL: &str = "__result";

/// Broadcast of a multicast delegate property over a parameter buffer.
pub const BROADCAST_DELEGATE: &str = "NativeReflection.BroadcastDelegate";
