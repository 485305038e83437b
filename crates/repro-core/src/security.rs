//! Static security gate - pre-execution inspection of generated scripts
//!
//! Parses the candidate Python script with tree-sitter and walks every node
//! before the sandbox is ever launched. A script that cannot be parsed is
//! treated as unsafe, not as a separate error class. The policy itself is
//! data: two denylist tables and one writable path prefix.

use tree_sitter::{Node, Parser, Tree};

use crate::error::SecurityViolation;

/// Capability-level import denylist. Aliases and submodule imports are
/// resolved to their top-level module name before matching.
pub const BLOCKED_IMPORTS: &[&str] = &["os", "subprocess", "socket", "shutil", "sys", "pathlib"];

/// Dynamic-code-execution builtins a script may never call.
pub const BLOCKED_BUILTINS: &[&str] = &["eval", "exec", "compile", "__import__"];

/// The only path a script may open files under - the artifact mount.
pub const WRITABLE_MOUNT: &str = "/screenshots/";

/// Reject the script if it contains any unsafe construct.
///
/// Pure static analysis: parsing never executes script code, and the walk
/// runs to completion even on adversarial input. Called once per script,
/// before every execution attempt - refinement can reintroduce unsafe
/// constructs.
pub fn check(script: &str) -> Result<(), SecurityViolation> {
    let tree = parse(script)?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(SecurityViolation::new("script does not parse as Python"));
    }

    // Iterative pre-order walk; recursion depth is attacker-controlled.
    let mut cursor = root.walk();
    loop {
        inspect(cursor.node(), script)?;
        if cursor.goto_first_child() {
            continue;
        }
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                return Ok(());
            }
        }
    }
}

/// Parse-only validity check used by the generation steps before a script
/// is allowed to consume an execution attempt.
pub fn syntax_check(script: &str) -> Result<(), String> {
    let tree = parse(script).map_err(|violation| violation.reason)?;
    let root = tree.root_node();
    if !root.has_error() {
        return Ok(());
    }

    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            return Err(format!(
                "syntax error at line {}",
                node.start_position().row + 1
            ));
        }
        if cursor.goto_first_child() {
            continue;
        }
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                return Err("syntax error".to_string());
            }
        }
    }
}

fn parse(script: &str) -> Result<Tree, SecurityViolation> {
    let mut parser = Parser::new();
    parser
        .set_language(tree_sitter_python::language())
        .map_err(|e| SecurityViolation::new(format!("parser initialization failed: {e}")))?;
    parser
        .parse(script, None)
        .ok_or_else(|| SecurityViolation::new("script could not be parsed"))
}

fn inspect(node: Node, src: &str) -> Result<(), SecurityViolation> {
    match node.kind() {
        "import_statement" | "import_from_statement" => check_import(node, src),
        "call" => check_call(node, src),
        _ => Ok(()),
    }
}

/// Collect every module name an import statement touches and match each
/// against the denylist. For `from x import y` both `x` and `y` are checked,
/// so `from importlib import os` cannot smuggle a capability in.
fn check_import(node: Node, src: &str) -> Result<(), SecurityViolation> {
    let mut names = Vec::new();

    if node.kind() == "import_from_statement" {
        if let Some(module) = node.child_by_field_name("module_name") {
            if let Some(name) = top_level_name(module, src) {
                names.push(name);
            }
        }
    }

    let mut cursor = node.walk();
    for imported in node.children_by_field_name("name", &mut cursor) {
        if let Some(name) = top_level_name(imported, src) {
            names.push(name);
        }
    }

    for name in names {
        if BLOCKED_IMPORTS.contains(&name.as_str()) {
            return Err(SecurityViolation::new(format!("blocked import: {name}")));
        }
    }
    Ok(())
}

/// Resolve an import target to its top-level module name.
/// `import os.path as p` resolves through the alias to `os`.
fn top_level_name(node: Node, src: &str) -> Option<String> {
    let target = if node.kind() == "aliased_import" {
        node.child_by_field_name("name")?
    } else {
        node
    };
    // Leading-dot imports are package-relative and have no top-level module.
    if target.kind() == "relative_import" {
        return None;
    }
    let text = target.utf8_text(src.as_bytes()).ok()?;
    Some(text.split('.').next().unwrap_or(text).trim().to_string())
}

fn check_call(node: Node, src: &str) -> Result<(), SecurityViolation> {
    let func = match node.child_by_field_name("function") {
        Some(func) => func,
        None => return Ok(()),
    };
    if func.kind() != "identifier" {
        return Ok(());
    }
    let name = func.utf8_text(src.as_bytes()).unwrap_or("");

    if BLOCKED_BUILTINS.contains(&name) {
        return Err(SecurityViolation::new(format!("blocked builtin: {name}()")));
    }
    if name == "open" {
        return check_open(node, src);
    }
    Ok(())
}

/// `open()` is permitted only with a string-literal path under the artifact
/// mount. A non-literal first argument cannot be proven safe statically, so
/// it is rejected outright.
fn check_open(call: Node, src: &str) -> Result<(), SecurityViolation> {
    let args = match call.child_by_field_name("arguments") {
        Some(args) => args,
        None => return Ok(()),
    };
    let first = match args.named_child(0) {
        Some(first) => first,
        None => return Ok(()),
    };

    if first.kind() != "string" {
        return Err(SecurityViolation::new(
            "open() with a non-literal path is blocked",
        ));
    }
    let literal = first.utf8_text(src.as_bytes()).unwrap_or("");
    if !literal.contains(WRITABLE_MOUNT) {
        return Err(SecurityViolation::new(format!(
            "open() outside {WRITABLE_MOUNT} is blocked"
        )));
    }
    Ok(())
}
