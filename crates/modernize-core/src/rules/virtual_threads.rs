/*!
# Fixed Thread Pools to Virtual Threads

`Executors.newFixedThreadPool(n)` whose tasks spend their time blocked on
I/O is replaced by `Executors.newVirtualThreadPerTaskExecutor()`. The pool
size bounded concurrency; for blocking work that bound is rarely wanted,
for CPU-bound work it is, so tasks that cannot be shown to block keep their
pool.
*/

use tree_sitter::Node;

use super::{ensure, require, Abstain, Captures, Category, Rewrite, Rule};
use crate::edit::Edit;
use crate::matcher::MatchInstance;
use crate::parser::syntax::{
    child_of_kind, contains_kind, descendants, has_modifier, is_field_of_parent, is_reference, named_children,
    simple_type_name, target_name,
};
use crate::parser::SourceUnit;
use crate::version::VersionTag;

/// Calls that block the calling thread on I/O or on another thread
const BLOCKING_CALLS: &[&str] = &[
    "read",
    "readLine",
    "readAllBytes",
    "readAllLines",
    "readString",
    "readNBytes",
    "write",
    "writeString",
    "flush",
    "newBufferedReader",
    "newBufferedWriter",
    "newInputStream",
    "newOutputStream",
    "openStream",
    "openConnection",
    "getInputStream",
    "getOutputStream",
    "getResponseCode",
    "connect",
    "accept",
    "receive",
    "send",
    "getConnection",
    "executeQuery",
    "executeUpdate",
    "exchange",
    "getForObject",
    "getForEntity",
    "postForObject",
    "postForEntity",
    "block",
    "sleep",
    "join",
    "take",
];

/// Types whose construction opens a file or socket
const BLOCKING_TYPES: &[&str] = &[
    "FileInputStream",
    "FileOutputStream",
    "FileReader",
    "FileWriter",
    "RandomAccessFile",
    "Socket",
    "ServerSocket",
];

/// Calls accepted in a pool size expression
const PURE_CALLS: &[&str] = &["getRuntime", "availableProcessors", "max", "min"];

const SUBMISSIONS: &[&str] = &["submit", "execute", "invokeAny", "invokeAll"];

pub(super) fn rule() -> Rule {
    Rule::new(
        "fixed-pool-to-virtual-threads",
        Category::VirtualThreads,
        VersionTag::Java21,
        "fixed thread pool running blocking tasks becomes a virtual thread per task executor",
        &["method_invocation"],
        predicate,
        guard,
        rewrite,
    )
}

/// Variable the pool is stored in
fn executor_name<'u>(node: Node<'_>, unit: &'u SourceUnit) -> Option<&'u str> {
    let parent = node.parent()?;
    match parent.kind() {
        "variable_declarator" if is_field_of_parent(node, "value") => {
            parent.child_by_field_name("name").map(|n| unit.text_of(n))
        }
        "assignment_expression" if is_field_of_parent(node, "right") => {
            target_name(parent.child_by_field_name("left")?, unit)
        }
        _ => None,
    }
}

fn predicate(node: Node<'_>, unit: &SourceUnit) -> Option<Captures> {
    let name = node.child_by_field_name("name")?;
    let object = node.child_by_field_name("object")?;
    if unit.text_of(name) != "newFixedThreadPool" || simple_type_name(unit.text_of(object)) != "Executors" {
        return None;
    }
    executor_name(node, unit)?;
    Some(
        Captures::new(node)
            .bind("object", object, unit)
            .bind("arguments", node.child_by_field_name("arguments")?, unit),
    )
}

/// The only method declared in the unit under `name`
fn unit_method<'t>(root: Node<'t>, name: &str, unit: &SourceUnit) -> Option<Node<'t>> {
    let candidates: Vec<Node<'t>> = descendants(root)
        .into_iter()
        .filter(|n| {
            n.kind() == "method_declaration"
                && n.child_by_field_name("name")
                    .is_some_and(|id| unit.text_of(id) == name)
        })
        .collect();
    match candidates.as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}

fn blocks_directly(node: Node<'_>, unit: &SourceUnit) -> bool {
    descendants(node).into_iter().any(|n| match n.kind() {
        "method_invocation" => n
            .child_by_field_name("name")
            .is_some_and(|id| BLOCKING_CALLS.contains(&unit.text_of(id))),
        "object_creation_expression" => n
            .child_by_field_name("type")
            .is_some_and(|t| BLOCKING_TYPES.contains(&simple_type_name(unit.text_of(t)))),
        _ => false,
    })
}

/// Same-unit methods called without a receiver (or on `this`) under `node`
fn local_callees<'t>(node: Node<'_>, root: Node<'t>, unit: &SourceUnit) -> Vec<Node<'t>> {
    descendants(node)
        .into_iter()
        .filter(|n| n.kind() == "method_invocation")
        .filter(|n| {
            n.child_by_field_name("object")
                .map_or(true, |o| o.kind() == "this")
        })
        .filter_map(|n| n.child_by_field_name("name"))
        .filter_map(|id| unit_method(root, unit.text_of(id), unit))
        .collect()
}

/// Code a submitted task runs, plus the methods it calls one level down
fn task_code<'t>(task: Node<'t>, root: Node<'t>, unit: &SourceUnit) -> Result<Vec<Node<'t>>, Abstain> {
    let body = match task.kind() {
        "lambda_expression" => require(task.child_by_field_name("body"), "lambda has no body")?,
        "object_creation_expression" => require(child_of_kind(task, "class_body"), "task is not a class body")?,
        "method_reference" => {
            let method = require(named_children(task).last().copied(), "malformed method reference")?;
            ensure(method.kind() == "identifier", "constructor reference task")?;
            let declaration = require(
                unit_method(root, unit.text_of(method), unit),
                "task method is not declared in this unit",
            )?;
            ensure(!has_modifier(declaration, unit, "synchronized"), "task is synchronized")?;
            require(declaration.child_by_field_name("body"), "task method has no body")?
        }
        _ => return Err(Abstain::new("task cannot be inspected")),
    };

    let mut code = vec![body];
    for callee in local_callees(body, root, unit) {
        ensure(!has_modifier(callee, unit, "synchronized"), "task calls a synchronized method")?;
        if let Some(callee_body) = callee.child_by_field_name("body") {
            code.push(callee_body);
        }
    }
    Ok(code)
}

fn guard(m: &MatchInstance, unit: &SourceUnit) -> Result<(), Abstain> {
    let node = m.anchor(unit)?;
    let root = unit.root();
    let name = require(executor_name(node, unit), "pool is not stored in a variable")?;

    let arguments = named_children(m.node("arguments", unit)?);
    let [size] = arguments.as_slice() else {
        return Err(Abstain::new("pool takes a thread factory"));
    };
    ensure(
        !contains_kind(
            *size,
            &["assignment_expression", "update_expression", "object_creation_expression"],
        ),
        "pool size has side effects",
    )?;
    let impure = descendants(*size).into_iter().any(|n| {
        n.kind() == "method_invocation"
            && n.child_by_field_name("name")
                .is_some_and(|id| !PURE_CALLS.contains(&unit.text_of(id)))
    });
    ensure(!impure, "pool size has side effects")?;

    let casts = descendants(root).into_iter().any(|n| {
        n.kind() == "cast_expression"
            && n.child_by_field_name("type")
                .is_some_and(|t| simple_type_name(unit.text_of(t)) == "ThreadPoolExecutor")
    });
    ensure(!casts, "pool is cast to ThreadPoolExecutor")?;

    let mut submissions = Vec::new();
    for id in descendants(root) {
        if id.kind() != "identifier" || unit.text_of(id) != name {
            continue;
        }
        let receiver = match id.parent() {
            Some(p) if p.kind() == "field_access" && is_field_of_parent(id, "field") => {
                let on_this = p.child_by_field_name("object").is_some_and(|o| o.kind() == "this");
                if !on_this {
                    continue;
                }
                p
            }
            _ if is_reference(id) => id,
            _ => continue,
        };
        let call = receiver
            .parent()
            .filter(|p| p.kind() == "method_invocation" && is_field_of_parent(receiver, "object"));
        let assigned = receiver
            .parent()
            .is_some_and(|p| p.kind() == "assignment_expression" && is_field_of_parent(receiver, "left"));
        match call {
            Some(call) => {
                let method = require(call.child_by_field_name("name"), "malformed call")?;
                if SUBMISSIONS.contains(&unit.text_of(method)) {
                    submissions.push(call);
                }
            }
            None if assigned => {}
            None => return Err(Abstain::new("pool escapes to code that cannot be inspected")),
        }
    }
    ensure(!submissions.is_empty(), "no tasks are submitted to the pool")?;

    for call in submissions {
        let method = require(call.child_by_field_name("name"), "malformed call")?;
        ensure(unit.text_of(method) != "invokeAll", "tasks of invokeAll cannot be inspected")?;
        let arguments = require(call.child_by_field_name("arguments"), "malformed call")?;
        let task = require(named_children(arguments).first().copied(), "submission has no task")?;
        let code = task_code(task, root, unit)?;
        ensure(
            !code.iter().any(|c| contains_kind(*c, &["synchronized_statement"])),
            "task synchronizes",
        )?;
        ensure(
            code.iter().any(|c| blocks_directly(*c, unit)),
            "tasks do not block; a fixed pool bounds CPU-bound work",
        )?;
    }
    Ok(())
}

fn rewrite(m: &MatchInstance, _unit: &SourceUnit) -> Result<Rewrite, Abstain> {
    let text = format!("{}.newVirtualThreadPerTaskExecutor()", m.text("object")?);
    Ok(Rewrite::single(Edit::replace(m.span, text)))
}
