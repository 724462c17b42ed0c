//! Lua-backed evaluator
//!
//! One sandboxed `mlua::Lua` instance per pass: snippets see the match
//! variables (`CNT`, `LINE`, `LCNT`, `LPOS`, `APOS`, `COL`, `MATCH`,
//! `CAP1`..) as globals, and whatever globals they set themselves persist
//! until the pass ends. A snippet is a chunk whose return value (string or
//! number) becomes the replacement text.

use mlua::{Lua, Value};

use super::{Evaluator, MatchContext};
use crate::error::EngineError;

pub struct LuaEvaluator {
    lua: Lua,
    /// How many CAP globals the previous match set, so stale ones get
    /// cleared before the next evaluation
    caps_set: usize,
}

impl LuaEvaluator {
    pub fn new() -> Self {
        Self {
            lua: sandboxed_lua(),
            caps_set: 0,
        }
    }

    fn bind_context(&self, ctx: &MatchContext) -> Result<(), mlua::Error> {
        let globals = self.lua.globals();
        globals.set("CNT", ctx.cnt)?;
        globals.set("LINE", ctx.line)?;
        globals.set("LCNT", ctx.lcnt)?;
        globals.set("LPOS", ctx.lpos)?;
        globals.set("APOS", ctx.apos)?;
        match ctx.col {
            Some(col) => globals.set("COL", col)?,
            None => globals.set("COL", Value::Nil)?,
        }
        globals.set("MATCH", ctx.matched.as_str())?;
        for (i, cap) in ctx.captures.iter().enumerate() {
            let name = format!("CAP{}", i + 1);
            match cap {
                Some(text) => globals.set(name, text.as_str())?,
                None => globals.set(name, Value::Nil)?,
            }
        }
        for i in ctx.captures.len()..self.caps_set {
            globals.set(format!("CAP{}", i + 1), Value::Nil)?;
        }
        Ok(())
    }
}

impl Default for LuaEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator for LuaEvaluator {
    fn validate(&mut self, snippet: &str) -> Result<(), EngineError> {
        self.lua
            .load(snippet)
            .set_name("snippet")
            .into_function()
            .map(|_| ())
            .map_err(|e| EngineError::Snippet(e.to_string()))
    }

    fn begin_pass(&mut self) {
        self.lua = sandboxed_lua();
        self.caps_set = 0;
    }

    fn evaluate(&mut self, snippet: &str, ctx: &MatchContext) -> Result<String, EngineError> {
        self.bind_context(ctx)
            .map_err(|e| EngineError::Snippet(e.to_string()))?;
        self.caps_set = ctx.captures.len();

        let value: Value = self
            .lua
            .load(snippet)
            .set_name("snippet")
            .eval()
            .map_err(|e| EngineError::Snippet(e.to_string()))?;

        match value {
            Value::String(s) => Ok(s.to_string_lossy().to_string()),
            Value::Integer(i) => Ok(i.to_string()),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(EngineError::Snippet(format!(
                "snippet must return a string or number, got {}",
                other.type_name()
            ))),
        }
    }
}

/// A Lua state with no OS, file, or module access.
fn sandboxed_lua() -> Lua {
    let lua = Lua::new();
    {
        let globals = lua.globals();
        for name in ["os", "io", "package", "require", "dofile", "loadfile"] {
            let _ = globals.set(name, Value::Nil);
        }
    }
    lua
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> MatchContext {
        MatchContext {
            cnt: 3,
            line: 2,
            lcnt: 1,
            lpos: 4,
            apos: 14,
            col: Some(2),
            matched: "cat".to_string(),
            captures: vec![Some("c".to_string()), None],
        }
    }

    #[test]
    fn test_validate_accepts_good_snippet() {
        let mut eval = LuaEvaluator::new();
        assert!(eval.validate("return MATCH .. CNT").is_ok());
    }

    #[test]
    fn test_validate_rejects_syntax_error() {
        let mut eval = LuaEvaluator::new();
        assert!(eval.validate("return ..").is_err());
    }

    #[test]
    fn test_evaluate_sees_match_variables() {
        let mut eval = LuaEvaluator::new();
        let out = eval
            .evaluate("return MATCH .. '-' .. CNT .. '-' .. COL", &ctx())
            .unwrap();
        assert_eq!(out, "cat-3-2");
    }

    #[test]
    fn test_evaluate_numeric_result() {
        let mut eval = LuaEvaluator::new();
        assert_eq!(eval.evaluate("return CNT * 10", &ctx()).unwrap(), "30");
    }

    #[test]
    fn test_capture_variables() {
        let mut eval = LuaEvaluator::new();
        assert_eq!(eval.evaluate("return CAP1", &ctx()).unwrap(), "c");
        assert_eq!(
            eval.evaluate("return tostring(CAP2)", &ctx()).unwrap(),
            "nil"
        );
    }

    #[test]
    fn test_globals_persist_within_pass() {
        let mut eval = LuaEvaluator::new();
        eval.begin_pass();
        eval.evaluate("total = (total or 0) + 1 return total", &ctx())
            .unwrap();
        let out = eval
            .evaluate("total = (total or 0) + 1 return total", &ctx())
            .unwrap();
        assert_eq!(out, "2");
    }

    #[test]
    fn test_globals_dropped_between_passes() {
        let mut eval = LuaEvaluator::new();
        eval.begin_pass();
        eval.evaluate("total = 41 return total", &ctx()).unwrap();
        eval.begin_pass();
        let out = eval.evaluate("return tostring(total)", &ctx()).unwrap();
        assert_eq!(out, "nil");
    }

    #[test]
    fn test_runtime_error_is_reported() {
        let mut eval = LuaEvaluator::new();
        assert!(matches!(
            eval.evaluate("error('boom')", &ctx()),
            Err(EngineError::Snippet(_))
        ));
    }

    #[test]
    fn test_non_text_return_is_an_error() {
        let mut eval = LuaEvaluator::new();
        assert!(eval.evaluate("return {}", &ctx()).is_err());
        assert!(eval.evaluate("return nil", &ctx()).is_err());
    }

    #[test]
    fn test_sandbox_has_no_os_or_io() {
        let mut eval = LuaEvaluator::new();
        assert_eq!(
            eval.evaluate("return tostring(os)", &ctx()).unwrap(),
            "nil"
        );
        assert_eq!(
            eval.evaluate("return tostring(io)", &ctx()).unwrap(),
            "nil"
        );
    }
}
