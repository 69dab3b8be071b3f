use bridge_model::DataSet;
use bridge_validate::{Validator, Verdict, rule_fn};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Behaviour {
    Pass,
    Fail,
    Error,
    ThresholdAbove(i64),
}

fn behaviour() -> impl Strategy<Value = Behaviour> {
    prop_oneof![
        Just(Behaviour::Pass),
        Just(Behaviour::Fail),
        Just(Behaviour::Error),
        any::<i64>().prop_map(Behaviour::ThresholdAbove),
    ]
}

fn build_validator(behaviours: &[Behaviour]) -> Validator<i64> {
    let mut validator = Validator::new();
    for (index, behaviour) in behaviours.iter().copied().enumerate() {
        validator
            .add_rule(rule_fn(format!("rule-{index}"), move |ds: &DataSet<i64>| {
                match behaviour {
                    Behaviour::Pass => Ok(Verdict::pass()),
                    Behaviour::Fail => Ok(Verdict::fail("always fails")),
                    Behaviour::Error => Err(anyhow::anyhow!("rule error")),
                    Behaviour::ThresholdAbove(t) => Ok(Verdict::check(*ds.objects() > t, || {
                        format!("{} <= {t}", ds.objects())
                    })),
                }
            }))
            .unwrap();
    }
    validator
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #[test]
    fn one_entry_per_rule_in_order(
        behaviours in prop::collection::vec(behaviour(), 0..12),
        value in any::<i64>(),
    ) {
        let validator = build_validator(&behaviours);
        let result = block_on(validator.evaluate(&DataSet::new(value)));

        prop_assert_eq!(result.entries().len(), behaviours.len());
        for (index, entry) in result.entries().iter().enumerate() {
            prop_assert_eq!(entry.rule_name(), format!("rule-{index}"));
            prop_assert!(entry.evaluated());
        }
        prop_assert_eq!(result.passed(), result.entries().iter().all(|e| e.passed()));
    }

    #[test]
    fn validation_is_idempotent(
        behaviours in prop::collection::vec(behaviour(), 0..12),
        value in any::<i64>(),
    ) {
        let validator = build_validator(&behaviours);
        let mut data_set = DataSet::new(value);
        let first = block_on(validator.validate(&mut data_set));
        let after_first = data_set.clone();
        let second = block_on(validator.validate(&mut data_set));

        prop_assert_eq!(first, second);
        prop_assert_eq!(after_first, data_set);
    }
}
