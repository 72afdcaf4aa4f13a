//! Exception extraction: turning a captured exception and its traceback
//! into structured, normalized event data.
//!
//! The heavy lifting of frame introspection (source lines, locals) lives
//! behind the [`ExceptionIntrospector`] seam - this module only walks,
//! shortens and assembles what the collaborator supplies. The view
//! resolution walk and its silent fallback are load-bearing for grouping
//! stability downstream; see [`resolve_view`].

use std::collections::HashSet;

use serde_json::{json, Map, Value};

use crate::normalize::{self, RawValue};

/// Key under which the diagnostic block lands in `Event::data`.
pub const DIAGNOSTIC_KEY: &str = "__faultline__";

/// One raw traceback frame, outermost call first.
///
/// This is the walkable skeleton of the traceback: enough to resolve the
/// originating view and format a human-readable trace. Rich per-frame
/// diagnostics (locals, source context) come from the introspector as
/// [`Frame`]s instead.
#[derive(Debug, Clone, Default)]
pub struct TracebackFrame {
    /// Fully qualified module name, e.g. `shop.cart.checkout`.
    pub module: String,
    pub function: String,
    pub filename: String,
    pub lineno: u32,
}

/// Template-syntax source location some exception types expose.
#[derive(Debug, Clone)]
pub struct TemplateSource {
    /// The template source text.
    pub origin: String,
    pub start: u32,
    pub end: u32,
    /// Template name or path.
    pub name: String,
}

/// A captured exception: the explicit replacement for "the currently
/// propagating exception".
///
/// Callers either construct one from whatever error they are handling or
/// configure a [`LastException`] source that produces it on demand.
#[derive(Debug, Clone, Default)]
pub struct ExceptionInfo {
    /// Exception class name, e.g. `ValueError`.
    pub class_name: String,
    /// Module path where the exception class is defined.
    pub module: String,
    /// Rendered exception message.
    pub message: String,
    /// Constructor arguments, coerced to text for the diagnostic block.
    pub args: Vec<RawValue>,
    /// Traceback frames, outermost call first.
    pub traceback: Vec<TracebackFrame>,
    /// Template source location, when the exception carries one.
    pub template: Option<TemplateSource>,
}

/// One stack frame's captured diagnostic context, as supplied by the
/// introspector. Owned exclusively by the extraction output; never
/// mutated after creation.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub filename: String,
    pub module: String,
    pub function: String,
    pub lineno: u32,
    /// Source lines before the failing line.
    pub pre_context: Vec<String>,
    /// The failing source line.
    pub context_line: String,
    /// Source lines after the failing line.
    pub post_context: Vec<String>,
    /// Local variables at the time of the call.
    pub vars: Vec<(String, RawValue)>,
}

/// Supplies rich frame context for a captured exception.
///
/// This is the web framework's exception-introspection utility, injected
/// rather than reimplemented.
pub trait ExceptionIntrospector: Send + Sync {
    fn frames(&self, exc: &ExceptionInfo) -> Vec<Frame>;
}

/// Supplies the set of application-installed module prefixes used by the
/// view resolution walk.
pub trait ModuleRegistry: Send + Sync {
    fn installed_modules(&self) -> HashSet<String>;
}

/// Explicit source for "the currently propagating exception".
///
/// Platforms with a thread-local last-error mechanism wire it in here;
/// the client never reads global state implicitly.
pub trait LastException: Send + Sync {
    fn current(&self) -> Option<ExceptionInfo>;
}

impl std::fmt::Debug for dyn ExceptionIntrospector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ExceptionIntrospector")
    }
}

/// Resolve the originating application view from a traceback.
///
/// Walks frames outermost to innermost and stops at the first whose
/// module prefix (the module name with its last dotted component
/// stripped) is in the installed set. When no frame matches, the last
/// frame walked supplies the view - the walk exhausts silently. Consumers
/// depend on this exact fallback for grouping stability; do not "fix" it.
/// An empty traceback yields `None`.
pub fn resolve_view(traceback: &[TracebackFrame], modules: &HashSet<String>) -> Option<String> {
    let mut resolved = None;
    for frame in traceback {
        resolved = Some(frame);
        if modules.contains(module_prefix(&frame.module)) {
            break;
        }
    }
    resolved.map(|frame| format!("{}.{}", frame.module, frame.function))
}

/// The module name with its last dotted component stripped; an undotted
/// name is its own prefix.
fn module_prefix(module: &str) -> &str {
    match module.rsplit_once('.') {
        Some((prefix, _)) => prefix,
        None => module,
    }
}

/// Convert introspected frames to their wire form, shortening every
/// text leaf of the frame structure - source context and variable
/// values alike.
pub fn process_frames(frames: &[Frame]) -> Value {
    Value::Array(
        frames
            .iter()
            .map(|frame| normalize::shorten(frame_value(frame)))
            .collect(),
    )
}

fn frame_value(frame: &Frame) -> Value {
    let mut vars = Map::with_capacity(frame.vars.len());
    for (name, value) in &frame.vars {
        vars.insert(name.clone(), normalize::to_text(value));
    }

    json!({
        "filename": frame.filename,
        "module": frame.module,
        "function": frame.function,
        "lineno": frame.lineno,
        "pre_context": frame.pre_context,
        "context_line": frame.context_line,
        "post_context": frame.post_context,
        "vars": vars,
    })
}

/// Assemble the nested diagnostic block stored under
/// [`DIAGNOSTIC_KEY`] in the event data.
pub fn diagnostic_block(exc: &ExceptionInfo, frames: Value) -> Value {
    let args: Vec<Value> = exc.args.iter().map(normalize::to_text).collect();

    let mut block = Map::new();
    block.insert(
        "exc".to_string(),
        json!([exc.module, args, frames]),
    );

    if let Some(ref template) = exc.template {
        block.insert(
            "template".to_string(),
            json!([template.origin, template.start, template.end, template.name]),
        );
    }

    Value::Object(block)
}

/// Produce the full formatted traceback text block for human display.
pub fn format_traceback(exc: &ExceptionInfo) -> String {
    let mut out = String::from("Traceback (most recent call last):\n");
    for frame in &exc.traceback {
        out.push_str(&format!(
            "  File \"{}\", line {}, in {}\n",
            frame.filename, frame.lineno, frame.function
        ));
    }
    out.push_str(&format!("{}: {}", exc.class_name, exc.message));
    out
}
