/*
 * ******************************************************************************************
 * Copyright (c) 2020 Pascal Kuthe. This file is part of the VACFA project.
 * It is subject to the license terms in the LICENSE file found in the top-level directory
 *  of this distribution and at  https://gitlab.com/DSPOM/VACFA/blob/master/LICENSE.
 *  No part of VACFA, including this file, may be copied, modified, propagated, or
 *  distributed except according to the terms contained in the LICENSE file.
 * *****************************************************************************************
 */

use super::ControlFlow;
use crate::fexpr::Features;
use crate::ir::ast::{Conditional, NodeKind, Opt};
use crate::ir::{Ast, AstBuilder, AstEnv, NodeId};

fn init_log() {
    let _ = fern::Dispatch::new()
        .format(|out, message, _record| out.finish(*message))
        .level(log::LevelFilter::Debug)
        .chain(std::io::stderr())
        .apply();
}

struct Fixture {
    ast: Ast,
    env: AstEnv,
    feats: Features,
    function: NodeId,
}

impl Fixture {
    fn new(build: AstBuilder, function: NodeId, feats: Features) -> Self {
        let ast = build.finish();
        let mut feats = feats;
        let env = AstEnv::build(&ast, function, &mut feats);
        Self {
            ast,
            env,
            feats,
            function,
        }
    }

    fn cfg(&mut self) -> ControlFlow<'_> {
        ControlFlow::new(&self.ast, &self.env, &mut self.feats)
    }
}

fn assert_consistent(fixture: &mut Fixture) {
    let function = fixture.function;
    let mut cfg = fixture.cfg();
    let diagnostics = cfg.compare_succ_with_pred(function);
    assert!(
        diagnostics.is_empty(),
        "cfg is asymmetric: {:?}",
        diagnostics
    );
}

#[test]
fn for_loop() {
    init_log();
    // int run() { for (i = 0; i < N; i++) { s += i; } return; }
    let mut build = AstBuilder::new();
    let i1 = build.id("i");
    let zero = build.constant("0");
    let init = build.assign(i1, zero);
    let i2 = build.id("i");
    let n = build.id("N");
    let cond = build.binary(i2, "<", n);
    let i3 = build.id("i");
    let inc = build.post_inc(i3);
    let s = build.id("s");
    let i4 = build.id("i");
    let add = build.assign_op(s, "+=", i4);
    let body_stmt = build.expr_stmt(add);
    let body = build.block(&[body_stmt]);
    let for_stmt = build.for_stmt(Some(init), Some(cond), Some(inc), body);
    let after = build.return_stmt(None);
    let fn_body = build.block(&[for_stmt, after]);
    let (function, _) = build.function_def("run", fn_body);

    let mut fixture = Fixture::new(build, function, Features::new());
    let mut cfg = fixture.cfg();

    assert_eq!(cfg.succ(function), vec![init]);
    assert_eq!(cfg.succ(init), vec![cond]);

    let cond_succ = cfg.succ(cond);
    assert!(cond_succ.contains(&body_stmt), "{:?}", cond_succ);
    assert!(cond_succ.contains(&after), "{:?}", cond_succ);
    assert_eq!(cond_succ.len(), 2);

    assert_eq!(cfg.succ(body_stmt), vec![inc]);
    assert_eq!(cfg.succ(inc), vec![cond]);
    assert!(cfg.pred(inc).contains(&body_stmt));
    assert_eq!(cfg.pred(body_stmt), vec![cond]);
    assert_eq!(cfg.pred(after), vec![cond]);
    // the exit sentinel collects the return
    assert_eq!(cfg.pred(function), vec![after]);
    assert_eq!(cfg.succ(after), vec![function]);

    drop(cfg);
    assert_consistent(&mut fixture);
}

#[test]
fn succ_is_idempotent() {
    init_log();
    let mut build = AstBuilder::new();
    let c = build.id("c");
    let t = build.return_stmt(None);
    let e = build.return_stmt(None);
    let if_stmt = build.if_stmt(c, t, Some(e));
    let fn_body = build.block(&[if_stmt]);
    let (function, _) = build.function_def("run", fn_body);

    let mut fixture = Fixture::new(build, function, Features::new());
    let mut cfg = fixture.cfg();

    let first = cfg.succ(c);
    let second = cfg.succ(c);
    assert_eq!(first, second);
    let first = cfg.pred(t);
    let second = cfg.pred(t);
    assert_eq!(first, second);
}

#[test]
fn switch_fall_through() {
    init_log();
    // int run() { switch (x) { case 1: a(); case 2: b(); break; default: c(); } return; }
    let mut build = AstBuilder::new();
    let x = build.id("x");
    let one = build.constant("1");
    let a = build.id("a");
    let a_call = build.call(a, vec![]);
    let a_stmt = build.expr_stmt(a_call);
    let case1 = build.case_stmt(one, Some(a_stmt));
    let two = build.constant("2");
    let b = build.id("b");
    let b_call = build.call(b, vec![]);
    let b_stmt = build.expr_stmt(b_call);
    let case2 = build.case_stmt(two, Some(b_stmt));
    let brk = build.break_stmt();
    let c = build.id("c");
    let c_call = build.call(c, vec![]);
    let c_stmt = build.expr_stmt(c_call);
    let default = build.default_stmt(Some(c_stmt));
    let body = build.block(&[case1, case2, brk, default]);
    let switch = build.switch_stmt(x, body);
    let after = build.return_stmt(None);
    let fn_body = build.block(&[switch, after]);
    let (function, _) = build.function_def("run", fn_body);

    let mut fixture = Fixture::new(build, function, Features::new());
    let mut cfg = fixture.cfg();

    // the switch dispatches onto every label
    assert_eq!(cfg.succ(x), vec![case1, case2, default]);

    // fall through chains
    assert_eq!(cfg.succ(case1), vec![a_stmt]);
    assert_eq!(cfg.succ(a_stmt), vec![case2]);
    assert_eq!(cfg.succ(b_stmt), vec![brk]);
    assert_eq!(cfg.succ(brk), vec![after]);

    let case2_pred = cfg.pred(case2);
    assert!(case2_pred.contains(&x), "{:?}", case2_pred);
    assert!(case2_pred.contains(&a_stmt), "{:?}", case2_pred);

    // after the switch: the break and the default tail
    let after_pred = cfg.pred(after);
    assert!(after_pred.contains(&brk), "{:?}", after_pred);
    assert!(after_pred.contains(&c_stmt), "{:?}", after_pred);
    assert_eq!(after_pred.len(), 2);

    drop(cfg);
    assert_consistent(&mut fixture);
}

#[test]
fn goto_and_label() {
    init_log();
    // int run() { L: goto L; }
    let mut build = AstBuilder::new();
    let (label, _) = build.label_stmt("L");
    let (goto, _) = build.goto_stmt("L");
    let fn_body = build.block(&[label, goto]);
    let (function, _) = build.function_def("run", fn_body);

    let mut fixture = Fixture::new(build, function, Features::new());
    let mut cfg = fixture.cfg();

    assert_eq!(cfg.succ(goto), vec![label]);
    let label_pred = cfg.pred(label);
    assert!(label_pred.contains(&goto), "{:?}", label_pred);
    assert!(label_pred.contains(&function), "{:?}", label_pred);
    assert_eq!(cfg.succ(label), vec![goto]);

    // the function never falls through to its exit
    assert_eq!(cfg.pred(function), Vec::<NodeId>::new());

    drop(cfg);
    assert_consistent(&mut fixture);
}

#[test]
fn break_and_continue_scoping() {
    init_log();
    // int run() { while (c) { if (d) continue; break; } return; }
    let mut build = AstBuilder::new();
    let c = build.id("c");
    let d = build.id("d");
    let cont = build.continue_stmt();
    let if_stmt = build.if_stmt(d, cont, None);
    let brk = build.break_stmt();
    let body = build.block(&[if_stmt, brk]);
    let while_stmt = build.while_stmt(c, body);
    let after = build.return_stmt(None);
    let fn_body = build.block(&[while_stmt, after]);
    let (function, _) = build.function_def("run", fn_body);

    let mut fixture = Fixture::new(build, function, Features::new());
    let mut cfg = fixture.cfg();

    // continue re-enters the loop at its condition, break leaves it
    assert_eq!(cfg.succ(cont), vec![c]);
    assert_eq!(cfg.succ(brk), vec![after]);

    let c_succ = cfg.succ(c);
    assert!(c_succ.contains(&d), "{:?}", c_succ);
    assert!(c_succ.contains(&after), "{:?}", c_succ);
    // the break never shows up as a successor outside its loop
    assert!(!c_succ.contains(&brk));

    let c_pred = cfg.pred(c);
    assert!(c_pred.contains(&cont), "{:?}", c_pred);
    assert!(c_pred.contains(&function), "{:?}", c_pred);

    let d_succ = cfg.succ(d);
    assert!(d_succ.contains(&cont), "{:?}", d_succ);
    assert!(d_succ.contains(&brk), "{:?}", d_succ);

    drop(cfg);
    assert_consistent(&mut fixture);
}

#[test]
fn do_loop() {
    init_log();
    // int run() { do { b(); } while (c); return; }
    let mut build = AstBuilder::new();
    let b = build.id("b");
    let b_call = build.call(b, vec![]);
    let b_stmt = build.expr_stmt(b_call);
    let body = build.block(&[b_stmt]);
    let c = build.id("c");
    let do_stmt = build.do_stmt(body, c);
    let after = build.return_stmt(None);
    let fn_body = build.block(&[do_stmt, after]);
    let (function, _) = build.function_def("run", fn_body);

    let mut fixture = Fixture::new(build, function, Features::new());
    let mut cfg = fixture.cfg();

    // the body runs before the first condition check
    assert_eq!(cfg.succ(function), vec![b_stmt]);
    assert_eq!(cfg.succ(b_stmt), vec![c]);

    let c_succ = cfg.succ(c);
    assert!(c_succ.contains(&b_stmt), "{:?}", c_succ);
    assert!(c_succ.contains(&after), "{:?}", c_succ);

    let b_pred = cfg.pred(b_stmt);
    assert!(b_pred.contains(&function), "{:?}", b_pred);
    assert!(b_pred.contains(&c), "{:?}", b_pred);

    drop(cfg);
    assert_consistent(&mut fixture);
}

#[test]
fn elif_cascade() {
    init_log();
    // int run() { if (c) a(); else if (d) b(); else e(); return; }
    let mut build = AstBuilder::new();
    let c = build.id("c");
    let a = build.id("a");
    let a_call = build.call(a, vec![]);
    let a_stmt = build.expr_stmt(a_call);
    let d = build.id("d");
    let b = build.id("b");
    let b_call = build.call(b, vec![]);
    let b_stmt = build.expr_stmt(b_call);
    let elif = build.push(NodeKind::ElifStatement {
        condition: Conditional::one(d),
        then_branch: Conditional::one(b_stmt),
    });
    let e = build.id("e");
    let e_call = build.call(e, vec![]);
    let e_stmt = build.expr_stmt(e_call);
    let if_stmt = build.push(NodeKind::IfStatement {
        condition: Conditional::one(c),
        then_branch: Conditional::one(a_stmt),
        elifs: vec![Opt::always(elif)],
        else_branch: Some(Conditional::one(e_stmt)),
    });
    let after = build.return_stmt(None);
    let fn_body = build.block(&[if_stmt, after]);
    let (function, _) = build.function_def("run", fn_body);

    let mut fixture = Fixture::new(build, function, Features::new());
    let mut cfg = fixture.cfg();

    let c_succ = cfg.succ(c);
    assert!(c_succ.contains(&a_stmt), "{:?}", c_succ);
    assert!(c_succ.contains(&d), "{:?}", c_succ);
    assert_eq!(c_succ.len(), 2);

    let d_succ = cfg.succ(d);
    assert!(d_succ.contains(&b_stmt), "{:?}", d_succ);
    assert!(d_succ.contains(&e_stmt), "{:?}", d_succ);

    assert_eq!(cfg.pred(d), vec![c]);
    assert_eq!(cfg.pred(e_stmt), vec![d]);

    let after_pred = cfg.pred(after);
    assert!(after_pred.contains(&a_stmt), "{:?}", after_pred);
    assert!(after_pred.contains(&b_stmt), "{:?}", after_pred);
    assert!(after_pred.contains(&e_stmt), "{:?}", after_pred);
    assert_eq!(after_pred.len(), 3);

    drop(cfg);
    assert_consistent(&mut fixture);
}

#[test]
fn ifdef_alternatives() {
    init_log();
    // int run() {
    // #if A
    //     x = 1;
    // #else
    //     x = 2;
    // #endif
    //     return;
    // }
    let mut feats = Features::new();
    let a = feats.named_atom("A");
    let not_a = feats.not(a);

    let mut build = AstBuilder::new();
    let x1 = build.id("x");
    let one = build.constant("1");
    let assign1 = build.assign(x1, one);
    let s1 = build.expr_stmt(assign1);
    let x2 = build.id("x");
    let two = build.constant("2");
    let assign2 = build.assign(x2, two);
    let s2 = build.expr_stmt(assign2);
    let after = build.return_stmt(None);
    let fn_body = build.compound(vec![Opt::new(a, s1), Opt::new(not_a, s2), Opt::always(after)]);
    let (function, _) = build.function_def("run", fn_body);

    let mut fixture = Fixture::new(build, function, feats);
    let mut cfg = fixture.cfg();

    // both alternatives are entered, the disjunction covers every configuration
    assert_eq!(cfg.succ(function), vec![s1, s2]);

    // within one alternative the other arm is skipped
    assert_eq!(cfg.succ(s1), vec![after]);
    assert_eq!(cfg.succ(s2), vec![after]);

    let after_pred = cfg.pred(after);
    assert_eq!(after_pred, vec![s2, s1]);

    drop(cfg);
    assert_consistent(&mut fixture);
}

#[test]
fn optional_statement() {
    init_log();
    // int run() { a(); #if A b(); #endif c(); return; }
    let mut feats = Features::new();
    let a_feat = feats.named_atom("A");

    let mut build = AstBuilder::new();
    let a = build.id("a");
    let a_call = build.call(a, vec![]);
    let a_stmt = build.expr_stmt(a_call);
    let b = build.id("b");
    let b_call = build.call(b, vec![]);
    let b_stmt = build.expr_stmt(b_call);
    let c = build.id("c");
    let c_call = build.call(c, vec![]);
    let c_stmt = build.expr_stmt(c_call);
    let after = build.return_stmt(None);
    let fn_body = build.compound(vec![
        Opt::always(a_stmt),
        Opt::new(a_feat, b_stmt),
        Opt::always(c_stmt),
        Opt::always(after),
    ]);
    let (function, _) = build.function_def("run", fn_body);

    let mut fixture = Fixture::new(build, function, feats);
    let mut cfg = fixture.cfg();

    // the optional statement and the fall through past it
    let a_succ = cfg.succ(a_stmt);
    assert_eq!(a_succ, vec![b_stmt, c_stmt]);

    assert_eq!(cfg.succ(b_stmt), vec![c_stmt]);

    let c_pred = cfg.pred(c_stmt);
    assert_eq!(c_pred, vec![b_stmt, a_stmt]);

    drop(cfg);
    assert_consistent(&mut fixture);
}
