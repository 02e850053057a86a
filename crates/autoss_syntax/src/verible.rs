//! Loader for the JSON exported by `verible-verilog-syntax --export_json
//! --printtree`.
//!
//! The export maps each input path to `{"tree": ..., "errors": [...]}`.
//! Branches are `{"tag", "children"}` objects whose children may be `null`
//! (Verible keeps empty grammar slots); tokens are `{"tag", "start", "end",
//! "text"}` with byte offsets into the parsed text. Null children are
//! dropped, so accessors must select sub-nodes by tag and never by index.

use crate::error::SyntaxError;
use crate::kinds::{NodeKind, TokenKind};
use crate::tree::{NodeId, SyntaxTree};
use autoss_source::FileId;
use serde_json::{Map, Value};

/// Loads the single tree contained in `json`.
///
/// `source` must be the exact text Verible parsed; token offsets index into
/// it.
pub fn load_json(json: &str, file: FileId, source: String) -> Result<SyntaxTree, SyntaxError> {
    let mut de = serde_json::Deserializer::from_str(json);
    de.disable_recursion_limit();
    let value: Value = serde::Deserialize::deserialize(&mut de)
        .map_err(|e| SyntaxError::Json(e.to_string()))?;

    let entries = value
        .as_object()
        .ok_or_else(|| SyntaxError::Json("top level is not an object".to_string()))?;
    let (file_key, entry) = entries
        .iter()
        .next()
        .ok_or_else(|| SyntaxError::Json("export contains no files".to_string()))?;

    let tree_value = match entry.get("tree") {
        Some(tree) if !tree.is_null() => tree,
        _ => {
            return Err(SyntaxError::MissingTree {
                file: file_key.clone(),
                errors: error_messages(entry),
            })
        }
    };

    let mut tree = SyntaxTree::new(file, source);
    let root = build(&mut tree, tree_value)?;
    tree.set_root(root);
    tracing::debug!(file = %file_key, nodes = tree.len(), "loaded verible tree");
    Ok(tree)
}

fn error_messages(entry: &Value) -> Vec<String> {
    let Some(errors) = entry.get("errors").and_then(Value::as_array) else {
        return Vec::new();
    };
    errors
        .iter()
        .map(|e| match e {
            Value::String(s) => s.clone(),
            Value::Object(obj) => {
                let text = obj.get("text").and_then(Value::as_str).unwrap_or("");
                match (
                    obj.get("line").and_then(Value::as_u64),
                    obj.get("column").and_then(Value::as_u64),
                ) {
                    (Some(line), Some(col)) => {
                        format!("{}:{}: syntax error at `{text}`", line + 1, col + 1)
                    }
                    _ => format!("syntax error at `{text}`"),
                }
            }
            other => other.to_string(),
        })
        .collect()
}

/// A branch whose children are still being converted.
struct Frame<'v> {
    kind: NodeKind,
    children: std::slice::Iter<'v, Value>,
    built: Vec<NodeId>,
}

/// Converts `value` without recursion; deeply nested `else if` chains
/// produce very deep trees.
fn build(tree: &mut SyntaxTree, value: &Value) -> Result<NodeId, SyntaxError> {
    let mut stack: Vec<Frame<'_>> = Vec::new();
    let mut pending = Some(value);
    loop {
        if let Some(value) = pending.take() {
            let obj = value
                .as_object()
                .ok_or_else(|| SyntaxError::Json(format!("expected a node object, found {value}")))?;
            match obj.get("children") {
                Some(children) => {
                    let children = children.as_array().ok_or_else(|| {
                        SyntaxError::Json("`children` is not an array".to_string())
                    })?;
                    stack.push(Frame {
                        kind: NodeKind::from_tag(tag(obj)?),
                        children: children.iter(),
                        built: Vec::new(),
                    });
                }
                None => {
                    let leaf = token(tree, obj)?;
                    match stack.last_mut() {
                        Some(parent) => parent.built.push(leaf),
                        None => return Ok(leaf),
                    }
                }
            }
        }

        let Some(frame) = stack.last_mut() else {
            return Err(SyntaxError::Json("empty tree".to_string()));
        };
        match frame.children.by_ref().find(|c| !c.is_null()) {
            Some(child) => pending = Some(child),
            None => {
                let Some(frame) = stack.pop() else {
                    return Err(SyntaxError::Json("empty tree".to_string()));
                };
                let id = tree.add_branch(frame.kind, frame.built);
                match stack.last_mut() {
                    Some(parent) => parent.built.push(id),
                    None => return Ok(id),
                }
            }
        }
    }
}

fn tag(obj: &Map<String, Value>) -> Result<&str, SyntaxError> {
    obj.get("tag")
        .and_then(Value::as_str)
        .ok_or_else(|| SyntaxError::Json("node without a `tag`".to_string()))
}

fn token(tree: &mut SyntaxTree, obj: &Map<String, Value>) -> Result<NodeId, SyntaxError> {
    let offset = |key: &str| {
        obj.get(key)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| SyntaxError::Json(format!("token without a valid `{key}`")))
    };
    let (start, end) = (offset("start")?, offset("end")?);
    if start > end || end as usize > tree.source().len() {
        return Err(SyntaxError::Json(format!(
            "token range {start}..{end} is outside the source"
        )));
    }
    Ok(tree.add_token(TokenKind::from_tag(tag(obj)?), start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::Tag;
    use crate::parser::parse;
    use autoss_diagnostics::DiagnosticSink;
    use serde_json::json;

    fn tok(tag: &str, start: usize, end: usize) -> Value {
        json!({"tag": tag, "start": start, "end": end})
    }

    /// Export of `module m (input clk); reg q; endmodule` in the shape
    /// Verible produces, nulls included.
    fn small_export() -> String {
        let export = json!({
            "m.v": {
                "tree": {
                    "tag": "kDescriptionList",
                    "children": [{
                        "tag": "kModuleDeclaration",
                        "children": [
                            {"tag": "kModuleHeader", "children": [
                                tok("module", 0, 6),
                                null,
                                tok("SymbolIdentifier", 7, 8),
                                null,
                                null,
                                {"tag": "kParenGroup", "children": [
                                    tok("(", 9, 10),
                                    {"tag": "kPortDeclarationList", "children": [
                                        {"tag": "kPortDeclaration", "children": [
                                            tok("input", 10, 15),
                                            null,
                                            {"tag": "kUnqualifiedId", "children": [
                                                tok("SymbolIdentifier", 16, 19)
                                            ]},
                                            null
                                        ]}
                                    ]},
                                    tok(")", 19, 20)
                                ]},
                                tok(";", 20, 21)
                            ]},
                            {"tag": "kModuleItemList", "children": [
                                {"tag": "kDataDeclaration", "children": [
                                    null,
                                    {"tag": "kInstantiationType", "children": [
                                        {"tag": "kDataType", "children": [tok("reg", 22, 25), null]}
                                    ]},
                                    {"tag": "kGateInstanceRegisterVariableList", "children": [
                                        {"tag": "kRegisterVariable", "children": [
                                            tok("SymbolIdentifier", 26, 27),
                                            null
                                        ]}
                                    ]},
                                    tok(";", 27, 28)
                                ]}
                            ]},
                            tok("endmodule", 29, 38),
                            null
                        ]
                    }]
                },
                "errors": []
            }
        });
        export.to_string()
    }

    #[test]
    fn loads_tree_and_drops_nulls() {
        let src = "module m (input clk); reg q; endmodule";
        let tree = load_json(&small_export(), FileId::from_raw(0), src.to_string()).unwrap();
        let root = tree.root().unwrap();
        assert!(tree.is(root, &NodeKind::DescriptionList));
        let header = tree.find(root, NodeKind::ModuleHeader).unwrap();
        let name = tree.child_identifier(header).unwrap();
        assert_eq!(tree.text(name), "m");
        assert_eq!(tree.children(header).len(), 4);
        let var = tree.find(root, NodeKind::RegisterVariable).unwrap();
        assert_eq!(tree.text(var), "q");
        assert_eq!(tree.emit(root), src);
    }

    #[test]
    fn missing_tree_carries_errors() {
        let json = r#"{"bad.v": {"errors": [{"line": 2, "column": 4, "phase": "parse", "text": "endmodule"}]}}"#;
        let err = load_json(json, FileId::from_raw(0), String::new()).unwrap_err();
        match err {
            SyntaxError::MissingTree { file, errors } => {
                assert_eq!(file, "bad.v");
                assert_eq!(errors, vec!["3:5: syntax error at `endmodule`".to_string()]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = load_json("{not json", FileId::from_raw(0), String::new()).unwrap_err();
        assert!(matches!(err, SyntaxError::Json(_)));
        let err = load_json(
            r#"{"m.v": {"tree": {"tag": "x", "start": 0, "end": 99}}}"#,
            FileId::from_raw(0),
            "short".to_string(),
        )
        .unwrap_err();
        assert!(matches!(err, SyntaxError::Json(_)));
    }

    #[test]
    fn deep_nesting_does_not_overflow() {
        let src = "x";
        let mut value = json!({"tag": "SymbolIdentifier", "start": 0, "end": 1, "text": "x"});
        for _ in 0..600 {
            value = json!({"tag": "kExpression", "children": [value]});
        }
        let export = json!({"d.v": {"tree": value}}).to_string();
        let tree = load_json(&export, FileId::from_raw(0), src.to_string()).unwrap();
        assert_eq!(tree.emit(tree.root().unwrap()), "x");
    }

    /// The built-in front end's output, serialized the way Verible exports
    /// it, loads back into an identical tree.
    #[test]
    fn builtin_shapes_round_trip_through_json() {
        let src = "module m #(parameter W = 8) (input clk, input rst, output [W-1:0] q);\n\
                   reg [W-1:0] cnt;\n\
                   always @(posedge clk) if (rst) cnt <= 0; else cnt <= cnt + 1;\n\
                   sub #(.N(2)) u (.a(cnt));\n\
                   endmodule\n";
        let sink = DiagnosticSink::new();
        let built = parse(src, FileId::from_raw(0), &[], &sink);
        assert!(!sink.has_errors());

        fn to_json(tree: &SyntaxTree, id: NodeId) -> Value {
            match tree.data(id) {
                crate::tree::NodeData::Branch { kind, children } => json!({
                    "tag": kind.tag(),
                    "children": children.iter().map(|&c| to_json(tree, c)).collect::<Vec<_>>(),
                }),
                crate::tree::NodeData::Token { kind, start, end } => {
                    let text = &tree.source()[*start as usize..*end as usize];
                    let tag = match kind {
                        TokenKind::SymbolIdentifier => "SymbolIdentifier".to_string(),
                        TokenKind::Number => "TK_DecNumber".to_string(),
                        _ => text.to_string(),
                    };
                    json!({"tag": tag, "start": start, "end": end, "text": text})
                }
                crate::tree::NodeData::Synthetic { .. } => Value::Null,
            }
        }

        let root = built.root().unwrap();
        let export = json!({"m.v": {"tree": to_json(&built, root), "errors": []}}).to_string();
        let loaded = load_json(&export, FileId::from_raw(0), src.to_string()).unwrap();
        let loaded_root = loaded.root().unwrap();

        let shape = |tree: &SyntaxTree, root: NodeId| -> Vec<(String, String)> {
            tree.descendants(root)
                .into_iter()
                .map(|n| (tree.tag_name(n), tree.text(n).to_string()))
                .collect()
        };
        assert_eq!(shape(&built, root), shape(&loaded, loaded_root));
        assert_eq!(loaded.emit(loaded_root), src);
        assert_eq!(
            loaded
                .find_all(loaded_root, &[Tag::Node(NodeKind::NonblockingAssignmentStatement)])
                .len(),
            2
        );
    }
}
