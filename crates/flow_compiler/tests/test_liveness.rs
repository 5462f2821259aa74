use flow_compiler::{
    context::UserDefinedVariable, lang::BinaryOperator, scope::ScopeTree, visitor::resolve, *,
};
use proptest::prelude::*;

/// One statement of a generated straight-line program.
#[derive(Debug, Clone)]
enum Step {
    Declare { operand: usize, literal: i64 },
    Assign { target: usize, operand: usize, literal: i64 },
    Use { operand: usize },
    Scoped { literal: i64 },
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (any::<usize>(), -50i64..50).prop_map(|(operand, literal)| Step::Declare { operand, literal }),
        (any::<usize>(), any::<usize>(), -50i64..50)
            .prop_map(|(target, operand, literal)| Step::Assign { target, operand, literal }),
        any::<usize>().prop_map(|operand| Step::Use { operand }),
        (-50i64..50).prop_map(|literal| Step::Scoped { literal }),
    ]
}

const MAX_NAMES: usize = 8;

fn build(steps: &[Step]) -> SyntaxTree {
    let mut builder = TreeBuilder::new(FlowConfig::default());
    let mut names: Vec<String> = Vec::new();

    // `name + literal`, or the bare literal before anything is declared.
    let operand = |builder: &mut TreeBuilder, names: &[String], pick: usize, literal: i64| {
        let value = builder.literal(literal);
        if names.is_empty() {
            return value;
        }
        let access = builder.access(&names[pick % names.len()]);
        builder.binary(access, BinaryOperator::Add, value)
    };

    for (position, step) in steps.iter().enumerate() {
        match *step {
            Step::Declare { operand: pick, literal } if names.len() < MAX_NAMES => {
                let value = operand(&mut builder, &names, pick, literal);
                let name = format!("v{position}");
                builder.declare_variable(&name, value);
                names.push(name);
            }
            Step::Declare { .. } => {}
            Step::Assign {
                target,
                operand: pick,
                literal,
            } if !names.is_empty() => {
                let value = operand(&mut builder, &names, pick, literal);
                let target = names[target % names.len()].clone();
                builder.assign(&target, value);
            }
            Step::Assign { .. } => {}
            Step::Use { operand: pick } if !names.is_empty() => {
                let access = builder.access(&names[pick % names.len()]);
                builder.call_statement("sink", vec![access]);
            }
            Step::Use { .. } => {}
            Step::Scoped { literal } => {
                let name = format!("t{position}");
                builder.if_then(
                    |b| b.literal(1),
                    |b| {
                        let value = b.literal(literal);
                        let mask = b.literal(0);
                        let masked = b.binary(value, BinaryOperator::BitOr, mask);
                        b.declare_variable(&name, masked);
                        let access = b.access(&name);
                        b.call_statement("sink", vec![access]);
                    },
                );
            }
        }
    }
    builder.finish()
}

fn overlaps(a: &UserDefinedVariable, b: &UserDefinedVariable) -> bool {
    a.declare_index <= b.last_referenced_index && b.declare_index <= a.last_referenced_index
}

proptest! {
    #[test]
    fn test_liveness_indices_are_ordered(steps in prop::collection::vec(step(), 1..40)) {
        logs::init_tracing();
        let mut tree = build(&steps);
        let mut context = FlowContext::new().with_method("sink", MethodReturnKind::Void);
        resolve(&mut tree, &mut context).unwrap();

        for variable in context.user_variables() {
            prop_assert!(variable.declare_index <= variable.last_reassigned_index);
            prop_assert!(variable.last_reassigned_index <= variable.last_referenced_index);
        }
        for variable in tree.scopes.variables() {
            prop_assert!(variable.declare_index <= variable.last_reassigned_index);
            prop_assert!(variable.last_reassigned_index <= variable.last_referenced_index);
        }
    }

    #[test]
    fn test_live_bindings_never_share_a_register(steps in prop::collection::vec(step(), 1..40)) {
        let mut tree = build(&steps);
        let mut context = FlowContext::new().with_method("sink", MethodReturnKind::Void);
        resolve(&mut tree, &mut context).unwrap();

        let bindings = context.user_variables();
        for (position, a) in bindings.iter().enumerate() {
            for b in &bindings[position + 1..] {
                let same_register =
                    tree.scopes.variable(a.variable).register == tree.scopes.variable(b.variable).register;
                prop_assert!(!(same_register && overlaps(a, b)), "{} and {} share a register", a.name, b.name);
            }
        }
        prop_assert!(tree.scopes.scope(ScopeTree::ROOT).pool().unwrap().used() <= 16);
    }
}
