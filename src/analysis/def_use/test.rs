/*
 * ******************************************************************************************
 * Copyright (c) 2020 Pascal Kuthe. This file is part of the VACFA project.
 * It is subject to the license terms in the LICENSE file found in the top-level directory
 *  of this distribution and at  https://gitlab.com/DSPOM/VACFA/blob/master/LICENSE.
 *  No part of VACFA, including this file, may be copied, modified, propagated, or
 *  distributed except according to the terms contained in the LICENSE file.
 * *****************************************************************************************
 */

use super::{DefUseBuilder, DefUseChain};
use crate::fexpr::Features;
use crate::ir::ast::{NodeKind, Opt};
use crate::ir::{Ast, AstBuilder, AstEnv, NodeId};

fn init_log() {
    let _ = fern::Dispatch::new()
        .format(|out, message, _record| out.finish(*message))
        .level(log::LevelFilter::Debug)
        .chain(std::io::stderr())
        .apply();
}

fn run(build: AstBuilder, root: NodeId, mut feats: Features) -> (Ast, DefUseChain) {
    let ast = build.finish();
    let env = AstEnv::build(&ast, root, &mut feats);
    let chain = DefUseBuilder::new(&ast, &env).run(root);
    (ast, chain)
}

#[test]
fn declaration_and_assignment() {
    init_log();
    // int run() { int x; x = 1; }
    let mut build = AstBuilder::new();
    let (decl, x_def) = build.int_var_decl("x");
    let x_use = build.id("x");
    let one = build.constant("1");
    let assign = build.assign(x_use, one);
    let stmt = build.expr_stmt(assign);
    let fn_body = build.block(&[decl, stmt]);
    let (function, run_id) = build.function_def("run", fn_body);

    let (_, chain) = run(build, function, Features::new());

    assert!(chain.is_def(x_def));
    assert_eq!(chain.uses_of(x_def), Some(&[x_use][..]));
    assert!(!chain.is_def(x_use));
    assert!(chain.is_def(run_id));
    assert_eq!(chain.uses_of(run_id), Some(&[][..]));
}

#[test]
fn forward_declaration_keys_the_chain() {
    init_log();
    // int f(void); int f(void) { return 0; }
    let mut build = AstBuilder::new();
    let spec1 = build.int_specifier();
    let (fwd_declarator, fwd_id) = build.init_declarator("f", None);
    let decl = build.declaration(vec![Opt::always(spec1)], vec![Opt::always(fwd_declarator)]);

    let zero = build.constant("0");
    let ret = build.return_stmt(Some(zero));
    let fn_body = build.block(&[ret]);
    let (function, def_id) = build.function_def("f", fn_body);

    let tu = build.translation_unit(vec![Opt::always(decl), Opt::always(function)]);
    let (_, chain) = run(build, tu, Features::new());

    // the declaration owns the chain; the definition is its first use
    assert!(chain.is_def(fwd_id));
    assert_eq!(chain.uses_of(fwd_id), Some(&[def_id][..]));
    assert!(!chain.is_def(def_id));
}

#[test]
fn alternative_declarations_key_separately() {
    init_log();
    // #if A
    // int x;
    // #else
    // int x;
    // #endif
    // x = 1;
    let mut feats = Features::new();
    let a = feats.named_atom("A");
    let not_a = feats.not(a);

    let mut build = AstBuilder::new();
    let (decl1, x1) = build.int_var_decl("x");
    let (decl2, x2) = build.int_var_decl("x");
    let x_use = build.id("x");
    let one = build.constant("1");
    let assign = build.assign(x_use, one);
    let stmt = build.expr_stmt(assign);
    let fn_body = build.compound(vec![
        Opt::new(a, decl1),
        Opt::new(not_a, decl2),
        Opt::always(stmt),
    ]);
    let (function, _) = build.function_def("run", fn_body);

    let (_, chain) = run(build, function, feats);

    // both declarators key a chain and both record the use
    assert!(chain.is_def(x1));
    assert!(chain.is_def(x2));
    assert_eq!(chain.uses_of(x1), Some(&[x_use][..]));
    assert_eq!(chain.uses_of(x2), Some(&[x_use][..]));
}

#[test]
fn unresolved_identifier_becomes_its_own_key() {
    init_log();
    // int run() { y = 1; y = 2; }
    let mut build = AstBuilder::new();
    let y1 = build.id("y");
    let one = build.constant("1");
    let assign1 = build.assign(y1, one);
    let stmt1 = build.expr_stmt(assign1);
    let y2 = build.id("y");
    let two = build.constant("2");
    let assign2 = build.assign(y2, two);
    let stmt2 = build.expr_stmt(assign2);
    let fn_body = build.block(&[stmt1, stmt2]);
    let (function, _) = build.function_def("run", fn_body);

    let (_, chain) = run(build, function, Features::new());

    // the first occurrence is the synthetic root, the second its use
    assert!(chain.is_def(y1));
    assert_eq!(chain.uses_of(y1), Some(&[y2][..]));
    assert!(!chain.is_def(y2));
}

#[test]
fn parameters_are_definitions() {
    init_log();
    // int f(int p) { return p; }
    let mut build = AstBuilder::new();
    let int1 = build.int_specifier();
    let (p_declarator, p_def) = build.declarator("p");
    let param = build.push(NodeKind::ParameterDeclarationD {
        specifiers: vec![Opt::always(int1)],
        declarator: p_declarator,
    });
    let params = build.push(NodeKind::DeclParameterDeclList {
        declarations: vec![Opt::always(param)],
    });
    let f_id = build.id("f");
    let f_declarator = build.push(NodeKind::AtomicNamedDeclarator {
        pointers: Vec::new(),
        id: f_id,
        extensions: vec![Opt::always(params)],
    });
    let p_use = build.id("p");
    let ret = build.return_stmt(Some(p_use));
    let fn_body = build.block(&[ret]);
    let int2 = build.int_specifier();
    let function = build.push(NodeKind::FunctionDef {
        specifiers: vec![Opt::always(int2)],
        declarator: f_declarator,
        old_style_parameters: Vec::new(),
        body: fn_body,
    });

    let (_, chain) = run(build, function, Features::new());

    assert!(chain.is_def(p_def));
    assert_eq!(chain.uses_of(p_def), Some(&[p_use][..]));
    assert!(chain.is_def(f_id));
}

#[test]
fn struct_fields_and_member_access() {
    init_log();
    // struct S { int f; };
    // int run() { struct S s; s.f = 1; }
    let mut build = AstBuilder::new();

    let s_tag = build.id("S");
    let int1 = build.int_specifier();
    let (f_declarator, f_def) = build.declarator("f");
    let field = build.push(NodeKind::StructDeclarator {
        declarator: f_declarator,
        bitfield: None,
    });
    let member = build.push(NodeKind::StructDeclaration {
        specifiers: vec![Opt::always(int1)],
        declarators: vec![Opt::always(field)],
    });
    let struct_spec = build.push(NodeKind::StructOrUnionSpecifier {
        is_union: false,
        tag: Some(s_tag),
        members: Some(vec![Opt::always(member)]),
    });
    let struct_decl = build.declaration(vec![Opt::always(struct_spec)], Vec::new());

    let s_tag_use = build.id("S");
    let var_spec = build.push(NodeKind::StructOrUnionSpecifier {
        is_union: false,
        tag: Some(s_tag_use),
        members: None,
    });
    let (s_declarator, s_def) = build.init_declarator("s", None);
    let var_decl = build.declaration(vec![Opt::always(var_spec)], vec![Opt::always(s_declarator)]);
    let var_stmt = build.push(NodeKind::DeclarationStatement {
        declaration: var_decl,
    });

    let s_use = build.id("s");
    let (access, f_use) = build.member_access(s_use, "f", false);
    let one = build.constant("1");
    let assign = build.assign(access, one);
    let stmt = build.expr_stmt(assign);
    let fn_body = build.block(&[var_stmt, stmt]);
    let (function, _) = build.function_def("run", fn_body);

    let tu = build.translation_unit(vec![Opt::always(struct_decl), Opt::always(function)]);
    let (_, chain) = run(build, tu, Features::new());

    // the field chain
    assert!(chain.is_def(f_def));
    assert_eq!(chain.uses_of(f_def), Some(&[f_use][..]));

    // the variable chain
    assert!(chain.is_def(s_def));
    assert_eq!(chain.uses_of(s_def), Some(&[s_use][..]));

    // the tag chain
    assert!(chain.is_def(s_tag));
    assert_eq!(chain.uses_of(s_tag), Some(&[s_tag_use][..]));
}

#[test]
fn typedef_namespace() {
    init_log();
    // typedef int T; T x;
    let mut build = AstBuilder::new();
    let storage = build.typedef_specifier();
    let int1 = build.int_specifier();
    let (t_declarator, t_def) = build.init_declarator("T", None);
    let typedef_decl = build.declaration(
        vec![Opt::always(storage), Opt::always(int1)],
        vec![Opt::always(t_declarator)],
    );

    let t_use = build.id("T");
    let t_spec = build.push(NodeKind::TypeDefTypeSpecifier { name: t_use });
    let (x_declarator, x_def) = build.init_declarator("x", None);
    let var_decl = build.declaration(vec![Opt::always(t_spec)], vec![Opt::always(x_declarator)]);

    let tu = build.translation_unit(vec![Opt::always(typedef_decl), Opt::always(var_decl)]);
    let (_, chain) = run(build, tu, Features::new());

    assert!(chain.is_def(t_def));
    assert_eq!(chain.uses_of(t_def), Some(&[t_use][..]));
    assert!(chain.is_def(x_def));
}

#[test]
fn enumerators_bind_in_the_ordinary_namespace() {
    init_log();
    // enum E { RED, GREEN }; int z = RED;
    let mut build = AstBuilder::new();
    let e_tag = build.id("E");
    let red = build.id("RED");
    let red_enumerator = build.push(NodeKind::Enumerator {
        id: red,
        value: None,
    });
    let green = build.id("GREEN");
    let green_enumerator = build.push(NodeKind::Enumerator {
        id: green,
        value: None,
    });
    let enum_spec = build.push(NodeKind::EnumSpecifier {
        tag: Some(e_tag),
        enumerators: Some(vec![
            Opt::always(red_enumerator),
            Opt::always(green_enumerator),
        ]),
    });
    let enum_decl = build.declaration(vec![Opt::always(enum_spec)], Vec::new());

    let int1 = build.int_specifier();
    let red_use = build.id("RED");
    let (z_declarator, z_def) = build.init_declarator("z", Some(red_use));
    let var_decl = build.declaration(vec![Opt::always(int1)], vec![Opt::always(z_declarator)]);

    let tu = build.translation_unit(vec![Opt::always(enum_decl), Opt::always(var_decl)]);
    let (_, chain) = run(build, tu, Features::new());

    assert!(chain.is_def(red));
    assert_eq!(chain.uses_of(red), Some(&[red_use][..]));
    assert!(chain.is_def(green));
    assert!(chain.is_def(z_def));
}

#[test]
fn labels_and_gotos() {
    init_log();
    // int run() { goto L; L: return; }
    let mut build = AstBuilder::new();
    let (goto, goto_id) = build.goto_stmt("L");
    let (label, label_id) = build.label_stmt("L");
    let ret = build.return_stmt(None);
    let fn_body = build.block(&[goto, label, ret]);
    let (function, _) = build.function_def("run", fn_body);

    let (_, chain) = run(build, function, Features::new());

    // forward references resolve against the complete label namespace
    assert!(chain.is_def(label_id));
    assert_eq!(chain.uses_of(label_id), Some(&[goto_id][..]));
    assert!(!chain.is_def(goto_id));
}

#[test]
fn duplicate_uses_are_kept() {
    init_log();
    // int run() { int x; x = x + x; }
    let mut build = AstBuilder::new();
    let (decl, x_def) = build.int_var_decl("x");
    let target = build.id("x");
    let lhs = build.id("x");
    let rhs = build.id("x");
    let sum = build.binary(lhs, "+", rhs);
    let assign = build.assign(target, sum);
    let stmt = build.expr_stmt(assign);
    let fn_body = build.block(&[decl, stmt]);
    let (function, _) = build.function_def("run", fn_body);

    let (_, chain) = run(build, function, Features::new());

    assert_eq!(chain.uses_of(x_def), Some(&[target, lhs, rhs][..]));
}

#[test]
fn every_identifier_is_keyed_or_used_once() {
    init_log();
    // the closure invariant on a variability free unit:
    // int run() { int x; int y; x = y; return x; }
    let mut build = AstBuilder::new();
    let (decl_x, _) = build.int_var_decl("x");
    let (decl_y, _) = build.int_var_decl("y");
    let x_use = build.id("x");
    let y_use = build.id("y");
    let assign = build.assign(x_use, y_use);
    let stmt = build.expr_stmt(assign);
    let x_ret = build.id("x");
    let ret = build.return_stmt(Some(x_ret));
    let fn_body = build.block(&[decl_x, decl_y, stmt, ret]);
    let (function, _) = build.function_def("run", fn_body);

    let (ast, chain) = run(build, function, Features::new());

    for (node, kind) in ast.nodes.iter_enumerated() {
        if let NodeKind::Id { .. } = kind {
            let is_key = chain.is_def(node);
            let host_count = chain.defs_of_use(node).len();
            assert!(
                (is_key && host_count == 0) || (!is_key && host_count == 1),
                "identifier {:?} is keyed {} times and used {} times",
                node,
                is_key as usize,
                host_count
            );
        }
    }
}

#[test]
fn orphan_use_repair() {
    init_log();
    // registering through a node that is already recorded as a use appends to
    // the hosting chains
    let mut build = AstBuilder::new();
    let def = build.id("a");
    let use1 = build.id("a");
    let use2 = build.id("a");
    let _ = build.translation_unit(Vec::new());

    let mut chain = DefUseChain::default();
    chain.ensure_def(def);
    chain.add_to_def_use_map(def, use1);
    // use1 is not a key; the target lands in def's list
    chain.add_to_def_use_map(use1, use2);
    assert_eq!(chain.uses_of(def), Some(&[use1, use2][..]));
    assert!(!chain.is_def(use1));
}
