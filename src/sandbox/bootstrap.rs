//! Bootstrap document templating.
//!
//! A bootstrap document is the program text committed into an execution
//! context on every run. It has two parts, evaluated in order:
//!
//! 1. a console-capture prelude that installs shims for `log`, `error`,
//!    `warn`, `info` and `debug`, stringifies every argument inside the
//!    context, and records each call together with the instance's
//!    correlation token (baked in at installation time, not per call);
//! 2. a guarded region embedding the guest source verbatim inside
//!    `try/catch`, so a thrown exception becomes an `error` console call
//!    instead of escaping uncaught.
//!
//! The host pulls recorded events back out through [`DRAIN_CALL`], which
//! hands over the queue as a JSON string and resets it.

use crate::sandbox::relay::Token;

/// Expression the host evaluates to drain the recorded event queue.
pub const DRAIN_CALL: &str = "__playbox_drain__()";

/// The injected program text for one run of one sandbox instance.
#[derive(Debug, Clone)]
pub struct BootstrapDocument {
    prelude: String,
    guarded: String,
}

impl BootstrapDocument {
    /// Build a bootstrap document for `source`, attributing all output to
    /// `token`.
    pub fn new(token: &Token, source: &str) -> Self {
        Self {
            prelude: console_prelude(token),
            guarded: guarded_region(source),
        }
    }

    /// The console-capture prelude. Evaluated before any guest code.
    pub fn prelude(&self) -> &str {
        &self.prelude
    }

    /// The guarded guest program.
    pub fn guarded(&self) -> &str {
        &self.guarded
    }
}

/// Escape a value for embedding inside a single-quoted JS string literal.
fn js_string_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

fn console_prelude(token: &Token) -> String {
    format!(
        r#"(function () {{
    var queue = [];
    var native = typeof console !== 'undefined' ? console : null;
    var token = '{token}';
    var methods = ['log', 'error', 'warn', 'info', 'debug'];
    var shim = {{}};
    function display(value) {{
        if (value === undefined) {{ return 'undefined'; }}
        if (value === null) {{ return 'null'; }}
        return String(value);
    }}
    methods.forEach(function (method) {{
        var original = native && typeof native[method] === 'function'
            ? native[method]
            : null;
        shim[method] = function () {{
            var args = [];
            for (var i = 0; i < arguments.length; i++) {{
                args.push(display(arguments[i]));
            }}
            queue.push({{ kind: 'console', method: method, token: token, args: args }});
            if (original) {{
                original.apply(native, arguments);
            }}
        }};
    }});
    globalThis.console = shim;
    globalThis.__playbox_drain__ = function () {{
        var drained = queue;
        queue = [];
        return JSON.stringify(drained);
    }};
}})();
"#,
        token = js_string_escape(token.as_str()),
    )
}

fn guarded_region(source: &str) -> String {
    format!(
        r#"try {{
{source}
}} catch (e) {{
    console.error(e instanceof Error ? e.message : String(e));
}}
"#,
    )
}
