//! JavaScript module evaluation.
//!
//! Project configuration and locale files are small CommonJS-style script
//! modules. Each one is evaluated inside its own engine context and its
//! export crosses back into Rust as JSON.

use std::path::Path;
use std::sync::OnceLock;

use boa::JsValue;
use eyre::Result;
use log::trace;
use regex::Regex;
use serde_json::Value as JsonValue;

use crate::Error;

/// Name of the variable holding the module's export inside the wrapper.
const EXPORT_VAR: &str = "__michi_export";

fn export_default_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^(\s*)export\s+default\s+").unwrap())
}

/// Evaluate the given module source and return its export.
///
/// With a non-empty `args`, the export must be a function and is invoked with
/// those arguments. Without arguments a function export is invoked with none
/// and any other export is returned as-is.
///
/// `path` is only used for error reporting.
pub fn evaluate_module(path: &Path, source: &str, args: &[JsonValue]) -> Result<JsonValue> {
    let script = wrap_module(source, args)?;
    trace!("Attempting to execute script:\n{}", script);

    let mut ctx = boa::Context::new();
    let result = ctx
        .eval(script)
        .map_err(|e| Error::ModuleEvaluation(path.to_path_buf(), format!("{:?}", e)))?;
    let envelope = match &result {
        JsValue::String(s) => serde_json::from_str::<JsonValue>(&s.to_string())?,
        _ => {
            return Err(
                Error::ModuleExport(path.to_path_buf(), format!("{:?}", result)).into(),
            )
        }
    };
    unwrap_envelope(path, envelope)
}

// The wrapper always returns a JSON string holding one of:
//   {"value": ...}       the export
//   {"error": "..."}     a thrown exception
//   {"notAFactory": true}
fn unwrap_envelope(path: &Path, envelope: JsonValue) -> Result<JsonValue> {
    let mut obj = match envelope {
        JsonValue::Object(obj) => obj,
        other => {
            return Err(Error::ModuleExport(path.to_path_buf(), other.to_string()).into());
        }
    };
    if let Some(err) = obj.remove("error") {
        let msg = match err {
            JsonValue::String(s) => s,
            other => other.to_string(),
        };
        return Err(Error::ModuleEvaluation(path.to_path_buf(), msg).into());
    }
    if obj.contains_key("notAFactory") {
        return Err(Error::NotAFactory(path.to_path_buf()).into());
    }
    Ok(obj.remove("value").unwrap_or(JsonValue::Null))
}

fn wrap_module(source: &str, args: &[JsonValue]) -> Result<String> {
    let source = export_default_re().replace_all(source, "${1}module.exports = ");
    let args = args
        .iter()
        .map(|arg| {
            Ok(format!(
                r#"JSON.parse('{}')"#,
                format_json_str(&serde_json::to_string(arg)?)
            ))
        })
        .collect::<Result<Vec<String>>>()?;
    let invoke = if args.is_empty() {
        format!(
            r#"if (typeof {var} === "function") {{ {var} = {var}(); }}"#,
            var = EXPORT_VAR
        )
    } else {
        format!(
            r#"if (typeof {var} !== "function") {{
                    return JSON.stringify({{ notAFactory: true }});
                }}
                {var} = {var}({args});"#,
            var = EXPORT_VAR,
            args = args.join(", "),
        )
    };
    Ok(format!(
        r#"
            (function () {{
                try {{
                    var module = {{ exports: {{}} }};
                    var exports = module.exports;
                    {source}
                    ;
                    var {var} = module.exports;
                    {invoke}
                    return JSON.stringify({{ value: {var} === undefined ? null : {var} }});
                }} catch (e) {{
                    return JSON.stringify({{ error: String(e) }});
                }}
            }})()
        "#,
        source = source,
        var = EXPORT_VAR,
        invoke = invoke,
    ))
}

fn format_json_str(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn eval(source: &str, args: &[JsonValue]) -> Result<JsonValue> {
        evaluate_module(Path::new("test.js"), source, args)
    }

    #[test]
    fn plain_object_export() {
        let value = eval(r#"module.exports = { title: "Test", magicNumber: 42 };"#, &[]).unwrap();
        assert_eq!(value, json!({ "title": "Test", "magicNumber": 42 }));
    }

    #[test]
    fn export_default_is_rewritten() {
        let value = eval("export default { projects: ['a', 'b'] };", &[]).unwrap();
        assert_eq!(value, json!({ "projects": ["a", "b"] }));
    }

    #[test]
    fn zero_argument_factory_is_invoked() {
        let value = eval(r#"module.exports = () => ({ greeting: "Hi" });"#, &[]).unwrap();
        assert_eq!(value, json!({ "greeting": "Hi" }));
    }

    #[test]
    fn factory_receives_arguments() {
        let value = eval(
            "module.exports = function (name, n) { return name + ':' + (n * 2); };",
            &[json!("it's"), json!(21)],
        )
        .unwrap();
        assert_eq!(value, json!("it's:42"));
    }

    #[test]
    fn arguments_require_a_factory() {
        let err = eval("module.exports = { a: 1 };", &[json!(1)]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::NotAFactory(_))
        ));
    }

    #[test]
    fn undefined_export_becomes_null() {
        assert_eq!(eval("module.exports = undefined;", &[]).unwrap(), JsonValue::Null);
    }

    #[test]
    fn thrown_exception_is_reported() {
        let err = eval(r#"throw new Error("nope");"#, &[]).unwrap_err();
        match err.downcast_ref::<Error>() {
            Some(Error::ModuleEvaluation(_, msg)) => assert!(msg.contains("nope")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn syntax_error_is_reported() {
        let err = eval("module.exports = {", &[]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::ModuleEvaluation(..))
        ));
    }
}
