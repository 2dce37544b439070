//! The mutating optimise pass.
//!
//! Runs after the check pass and never fails. It only removes nodes:
//! - class fields whose names never appear in any method/constructor body
//!   (field initialisers are side-effect-free in this language);
//! - block locals with the same criterion, scoped to their block;
//! - statements following a `return`;
//! - `while(false)` loops and constant `if` branches.
//!
//! Every rewrite is reported as a [`Rewrite`] log entry.

use crate::ast::*;
use rustc_hash::FxHashSet;

/// One optimiser rewrite, loggable as a single line.
#[derive(Debug, Clone, PartialEq)]
pub enum Rewrite {
    RemovedField { class: String, field: String },
    RemovedLocal { context: String, name: String },
    TrimmedUnreachable { context: String, count: usize },
    RemovedWhileFalse { context: String },
    CollapsedIfTrue { context: String },
    CollapsedIfFalse { context: String },
    RemovedIfFalse { context: String },
}

impl std::fmt::Display for Rewrite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rewrite::RemovedField { class, field } => {
                write!(f, "removed unused field `{}.{}`", class, field)
            }
            Rewrite::RemovedLocal { context, name } => {
                write!(f, "removed unused variable `{}` in `{}`", name, context)
            }
            Rewrite::TrimmedUnreachable { context, count } => write!(
                f,
                "removed {} unreachable statement(s) after `return` in `{}`",
                count, context
            ),
            Rewrite::RemovedWhileFalse { context } => {
                write!(f, "removed `while(false)` loop in `{}`", context)
            }
            Rewrite::CollapsedIfTrue { context } => {
                write!(f, "collapsed `if(true)` to its then branch in `{}`", context)
            }
            Rewrite::CollapsedIfFalse { context } => {
                write!(f, "collapsed `if(false)` to its else branch in `{}`", context)
            }
            Rewrite::RemovedIfFalse { context } => {
                write!(f, "removed `if(false)` with no else branch in `{}`", context)
            }
        }
    }
}

/// Run the optimise pass, returning the rewrite log.
pub fn optimize(program: &mut Program) -> Vec<Rewrite> {
    let mut optimizer = Optimizer {
        rewrites: Vec::new(),
    };
    optimizer.run(program);
    optimizer.rewrites
}

struct Optimizer {
    rewrites: Vec<Rewrite>,
}

impl Optimizer {
    fn run(&mut self, program: &mut Program) {
        // Names appearing anywhere in a method or constructor body. Field
        // initialisers are not bodies and do not keep a field alive.
        let mut used = FxHashSet::default();
        for class in &program.classes {
            for member in &class.members {
                match member {
                    Member::Constructor(ctor) => collect_block(&ctor.body, &mut used),
                    Member::Method(method) => match &method.body {
                        MethodBody::Block(block) => collect_block(block, &mut used),
                        MethodBody::Arrow(expr) => collect_expr(expr, &mut used),
                        MethodBody::Forward => {}
                    },
                    Member::Field(_) => {}
                }
            }
        }

        for class in &mut program.classes {
            let class_name = class.name.name.clone();
            class.members.retain(|member| match member {
                Member::Field(field) if !used.contains(&field.name.name) => {
                    self.rewrites.push(Rewrite::RemovedField {
                        class: class_name.clone(),
                        field: field.name.name.clone(),
                    });
                    false
                }
                _ => true,
            });
        }

        for class in &mut program.classes {
            let class_name = class.name.name.clone();
            for member in &mut class.members {
                match member {
                    Member::Constructor(ctor) => {
                        let context = format!("{}.this", class_name);
                        ctor.body = self.optimize_block(&ctor.body, &context);
                    }
                    Member::Method(method) => {
                        if let MethodBody::Block(block) = &method.body {
                            let context = format!("{}.{}", class_name, method.name.name);
                            let optimized = self.optimize_block(block, &context);
                            method.body = MethodBody::Block(optimized);
                        }
                    }
                    Member::Field(_) => {}
                }
            }
        }
    }

    fn optimize_block(&mut self, block: &Block, context: &str) -> Block {
        let mut items: Vec<BlockItem> = Vec::new();
        for item in &block.body {
            match item {
                BlockItem::Var(decl) => items.push(BlockItem::Var(decl.clone())),
                BlockItem::Stmt(stmt) => {
                    if let Some(stmt) = self.optimize_statement(stmt, context) {
                        items.push(BlockItem::Stmt(stmt));
                    }
                }
            }
        }

        // No statement may follow a `return`.
        if let Some(pos) = items
            .iter()
            .position(|item| matches!(item, BlockItem::Stmt(Statement::Return(_))))
        {
            let removed = items.len() - pos - 1;
            if removed > 0 {
                items.truncate(pos + 1);
                self.rewrites.push(Rewrite::TrimmedUnreachable {
                    context: context.to_string(),
                    count: removed,
                });
            }
        }

        // Locals whose names appear nowhere else in the block.
        let mut keep = vec![true; items.len()];
        for (i, item) in items.iter().enumerate() {
            let BlockItem::Var(decl) = item else { continue };
            let name = &decl.name.name;
            let mut is_used = false;
            for (j, other) in items.iter().enumerate() {
                if i == j {
                    continue;
                }
                let mut names = FxHashSet::default();
                collect_item(other, &mut names);
                if names.contains(name) {
                    is_used = true;
                    break;
                }
            }
            if !is_used {
                keep[i] = false;
                self.rewrites.push(Rewrite::RemovedLocal {
                    context: context.to_string(),
                    name: name.clone(),
                });
            }
        }
        let items: Vec<BlockItem> = items
            .into_iter()
            .zip(keep)
            .filter_map(|(item, kept)| kept.then_some(item))
            .collect();

        Block::new(items, block.span)
    }

    fn optimize_statement(&mut self, stmt: &Statement, context: &str) -> Option<Statement> {
        match stmt {
            Statement::While(while_stmt) => match const_bool(&while_stmt.condition) {
                Some(false) => {
                    self.rewrites.push(Rewrite::RemovedWhileFalse {
                        context: context.to_string(),
                    });
                    None
                }
                _ => Some(Statement::While(WhileStatement {
                    condition: while_stmt.condition.clone(),
                    body: self.optimize_block(&while_stmt.body, context),
                    span: while_stmt.span,
                })),
            },
            Statement::If(if_stmt) => match const_bool(&if_stmt.condition) {
                Some(true) => {
                    self.rewrites.push(Rewrite::CollapsedIfTrue {
                        context: context.to_string(),
                    });
                    if_stmt
                        .then_block
                        .statements
                        .first()
                        .and_then(|s| self.optimize_statement(s, context))
                }
                Some(false) => match &if_stmt.else_block {
                    Some(else_block) => {
                        self.rewrites.push(Rewrite::CollapsedIfFalse {
                            context: context.to_string(),
                        });
                        else_block
                            .statements
                            .first()
                            .and_then(|s| self.optimize_statement(s, context))
                    }
                    None => {
                        self.rewrites.push(Rewrite::RemovedIfFalse {
                            context: context.to_string(),
                        });
                        None
                    }
                },
                None => Some(Statement::If(IfStatement {
                    condition: if_stmt.condition.clone(),
                    then_block: self.optimize_block(&if_stmt.then_block, context),
                    else_block: if_stmt
                        .else_block
                        .as_ref()
                        .map(|b| self.optimize_block(b, context)),
                    span: if_stmt.span,
                })),
            },
            // The expression walk is structural; nothing is folded below
            // statement level.
            other => Some(other.clone()),
        }
    }
}

/// Constant-evaluate a boolean condition: a literal, or `Boolean(...)` of
/// a constant.
fn const_bool(expr: &Expression) -> Option<bool> {
    match expr {
        Expression::BoolLiteral(lit) => Some(lit.value),
        Expression::New(new) if new.class_name.name == "Boolean" && new.args.len() == 1 => {
            const_bool(&new.args[0])
        }
        _ => None,
    }
}

fn collect_item(item: &BlockItem, names: &mut FxHashSet<String>) {
    match item {
        BlockItem::Var(decl) => {
            if let Some(init) = &decl.init {
                collect_expr(init, names);
            }
        }
        BlockItem::Stmt(stmt) => collect_stmt(stmt, names),
    }
}

fn collect_block(block: &Block, names: &mut FxHashSet<String>) {
    for item in &block.body {
        collect_item(item, names);
    }
}

fn collect_stmt(stmt: &Statement, names: &mut FxHashSet<String>) {
    match stmt {
        Statement::Assign(assign) => {
            names.insert(assign.target.name().to_string());
            collect_expr(&assign.value, names);
        }
        Statement::Expression(stmt) => collect_expr(&stmt.expression, names),
        Statement::While(stmt) => {
            collect_expr(&stmt.condition, names);
            collect_block(&stmt.body, names);
        }
        Statement::If(stmt) => {
            collect_expr(&stmt.condition, names);
            collect_block(&stmt.then_block, names);
            if let Some(else_block) = &stmt.else_block {
                collect_block(else_block, names);
            }
        }
        Statement::Return(stmt) => {
            if let Some(value) = &stmt.value {
                collect_expr(value, names);
            }
        }
    }
}

fn collect_expr(expr: &Expression, names: &mut FxHashSet<String>) {
    match expr {
        Expression::Identifier(id) => {
            names.insert(id.name.clone());
        }
        Expression::Member(member) => {
            collect_expr(&member.target, names);
            names.insert(member.member.name.clone());
        }
        Expression::Call(call) => {
            collect_expr(&call.callee, names);
            for arg in &call.args {
                collect_expr(arg, names);
            }
        }
        Expression::New(new) => {
            for arg in &new.args {
                collect_expr(arg, names);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn run(source: &str) -> (Program, Vec<Rewrite>) {
        let mut program = Parser::new(source).parse().expect("parse error");
        let rewrites = optimize(&mut program);
        (program, rewrites)
    }

    #[test]
    fn test_unused_field_removed_with_log() {
        let (program, rewrites) =
            run("class M is var z: Integer method main() is return end end");
        assert_eq!(program.classes[0].fields().count(), 0);
        assert!(rewrites.iter().any(|r| matches!(
            r,
            Rewrite::RemovedField { class, field } if class == "M" && field == "z"
        )));
    }

    #[test]
    fn test_used_field_kept() {
        let (program, rewrites) = run(
            "class M is var z: Integer method main() is this.z := Integer(1) end end",
        );
        assert_eq!(program.classes[0].fields().count(), 1);
        assert!(rewrites.is_empty());
    }

    #[test]
    fn test_if_true_collapsed() {
        let (program, rewrites) = run(
            "class M is method main() is if Boolean(true) then print(Integer(1)) else print(Integer(2)) end end end",
        );
        let method = program.classes[0].methods().next().unwrap();
        let MethodBody::Block(block) = &method.body else {
            panic!("expected block body");
        };
        assert_eq!(block.statements.len(), 1);
        assert!(matches!(
            block.statements[0],
            Statement::Expression(_)
        ));
        // the log mentions if(true)
        assert!(rewrites.iter().any(|r| r.to_string().contains("if(true)")));
    }

    #[test]
    fn test_if_false_without_else_removed() {
        let (program, rewrites) = run(
            "class M is method main() is if false then print(Integer(1)) end end end",
        );
        let method = program.classes[0].methods().next().unwrap();
        let MethodBody::Block(block) = &method.body else {
            panic!("expected block body");
        };
        assert!(block.is_empty());
        assert!(rewrites
            .iter()
            .any(|r| matches!(r, Rewrite::RemovedIfFalse { .. })));
    }

    #[test]
    fn test_while_false_removed() {
        let (program, rewrites) = run(
            "class M is method main() is while false loop print(Integer(1)) end end end",
        );
        let method = program.classes[0].methods().next().unwrap();
        let MethodBody::Block(block) = &method.body else {
            panic!("expected block body");
        };
        assert!(block.is_empty());
        assert!(rewrites
            .iter()
            .any(|r| matches!(r, Rewrite::RemovedWhileFalse { .. })));
    }

    #[test]
    fn test_statements_after_return_trimmed() {
        let (program, rewrites) = run(
            "class M is method main() is return; print(Integer(1)); print(Integer(2)) end end",
        );
        let method = program.classes[0].methods().next().unwrap();
        let MethodBody::Block(block) = &method.body else {
            panic!("expected block body");
        };
        assert!(block.ends_with_return());
        assert_eq!(block.body.len(), 1);
        assert!(rewrites.iter().any(|r| matches!(
            r,
            Rewrite::TrimmedUnreachable { count: 2, .. }
        )));
    }

    #[test]
    fn test_unused_local_removed() {
        let (program, rewrites) = run(
            "class M is method main() is var unused : Integer(1) print(Integer(2)) end end",
        );
        let method = program.classes[0].methods().next().unwrap();
        let MethodBody::Block(block) = &method.body else {
            panic!("expected block body");
        };
        assert!(block.locals.is_empty());
        assert!(rewrites.iter().any(|r| matches!(
            r,
            Rewrite::RemovedLocal { name, .. } if name == "unused"
        )));
    }

    #[test]
    fn test_optimizer_only_removes() {
        let source =
            "class M is var z: Integer method main() is if true then return end print(Integer(1)) end end";
        let mut program = Parser::new(source).parse().unwrap();
        let before = count_nodes(&program);
        optimize(&mut program);
        assert!(count_nodes(&program) <= before);
    }

    fn count_nodes(program: &Program) -> usize {
        let mut count = 0;
        for class in &program.classes {
            count += class.members.len();
            for member in &class.members {
                if let Member::Method(m) = member {
                    if let MethodBody::Block(b) = &m.body {
                        count += b.body.len();
                    }
                }
            }
        }
        count
    }

    #[test]
    fn test_block_projections_stay_consistent() {
        let (program, _) = run(
            "class M is method main() is var x : Integer(1) if true then x := Integer(2) end print(x) end end",
        );
        let method = program.classes[0].methods().next().unwrap();
        let MethodBody::Block(block) = &method.body else {
            panic!("expected block body");
        };
        assert_eq!(
            block.locals.len() + block.statements.len(),
            block.body.len()
        );
    }

    #[test]
    fn test_return_in_typeless_method_parses_without_value() {
        // `return` directly followed by a statement keyword takes no value
        let (program, _) =
            run("class M is method main() is return end end");
        let method = program.classes[0].methods().next().unwrap();
        let MethodBody::Block(block) = &method.body else {
            panic!("expected block body");
        };
        assert!(matches!(
            &block.statements[0],
            Statement::Return(r) if r.value.is_none()
        ));
    }
}
