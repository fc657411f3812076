use std::sync::Arc;
use std::thread;

use rstest::{fixture, rstest};

use talentcalc::application::services::{Outcome, PlannerService, Step};
use talentcalc::application::ApplicationError;
use talentcalc::domain::{BuildBuilder, Denial, DomainError, Rules, TalentDef, TreeDef};
use talentcalc::util::testing;

fn arms() -> TreeDef {
    TreeDef::new("arms")
        .talent(TalentDef::new("tactical-mastery", 0, 0, 5))
        .talent(TalentDef::new("deflection", 0, 1, 5))
        .talent(TalentDef::new("anger-management", 1, 0, 1).requires("tactical-mastery"))
}

fn fury() -> TreeDef {
    TreeDef::new("fury").talent(TalentDef::new("cruelty", 0, 0, 5))
}

#[fixture]
fn planner() -> PlannerService {
    testing::init_test_setup();
    let build = BuildBuilder::new(Rules::default())
        .tree(arms())
        .tree(fury())
        .build()
        .unwrap();
    PlannerService::new(build)
}

#[rstest]
fn given_fresh_build_when_increasing_then_applied_with_totals(planner: PlannerService) {
    // Act
    let outcome = planner.increase("arms", "deflection").unwrap();

    // Assert
    match outcome {
        Outcome::Applied(totals) => {
            assert_eq!(totals.total, 1);
            assert_eq!(totals.tree("arms"), Some(1));
            assert_eq!(totals.remaining(), 50);
        }
        other => panic!("expected applied, got {other:?}"),
    }
}

#[rstest]
fn given_locked_talent_when_increasing_then_declined_without_change(planner: PlannerService) {
    // Act
    let outcome = planner.increase("arms", "anger-management").unwrap();

    // Assert
    assert_eq!(
        outcome,
        Outcome::Declined(Denial::PrerequisiteUnmet {
            prerequisite: "tactical-mastery".to_string()
        })
    );
    assert_eq!(planner.totals().unwrap().total, 0);
}

#[rstest]
fn given_unknown_talent_when_increasing_then_domain_error(planner: PlannerService) {
    // Act
    let result = planner.increase("arms", "whirlwind");

    // Assert
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::UnknownNode { .. }))
    ));
}

#[rstest]
fn given_plan_when_applying_then_reports_each_step_in_order(planner: PlannerService) {
    // Arrange
    let mut steps: Vec<Step> = (0..5)
        .map(|_| Step::increase("arms", "tactical-mastery"))
        .collect();
    steps.push(Step::increase("arms", "anger-management"));
    steps.push(Step::decrease("arms", "tactical-mastery"));

    // Act
    let reports = planner.apply(&steps).unwrap();

    // Assert
    assert_eq!(reports.len(), 7);
    assert!(reports[..6].iter().all(|r| r.outcome.is_applied()));
    assert_eq!(
        reports[6].outcome,
        Outcome::Declined(Denial::HasDependents {
            dependent: "anger-management".to_string()
        })
    );
    assert_eq!(planner.points_spent("arms").unwrap(), 6);
}

#[rstest]
fn given_plan_with_reset_when_applying_then_later_steps_start_from_zero(
    planner: PlannerService,
) {
    // Arrange
    let steps: Vec<Step> = ["arms:deflection+", "fury:cruelty+", "reset", "fury:cruelty+"]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();

    // Act
    let reports = planner.apply(&steps).unwrap();

    // Assert
    assert!(reports.iter().all(|r| r.outcome.is_applied()));
    let totals = planner.totals().unwrap();
    assert_eq!(totals.total, 1);
    assert_eq!(totals.tree("arms"), Some(0));
    assert_eq!(totals.tree("fury"), Some(1));
}

#[rstest]
fn given_plan_with_unknown_step_when_applying_then_aborts(planner: PlannerService) {
    // Arrange
    let steps = [
        Step::increase("arms", "deflection"),
        Step::increase("prot", "shield-wall"),
    ];

    // Act
    let result = planner.apply(&steps);

    // Assert
    assert!(result.is_err());
}

#[rstest]
fn given_snapshot_when_mutating_service_then_snapshot_unchanged(planner: PlannerService) {
    // Arrange
    let snapshot = planner.snapshot().unwrap();

    // Act
    planner.increase("arms", "deflection").unwrap();

    // Assert
    assert_eq!(snapshot.total_points_spent(), 0);
    assert_eq!(planner.snapshot().unwrap().total_points_spent(), 1);
}

#[rstest]
fn given_node_view_when_prerequisite_maxed_then_unlocked_and_learnable(planner: PlannerService) {
    // Arrange
    for _ in 0..5 {
        planner.increase("arms", "tactical-mastery").unwrap();
    }

    // Act
    let view = planner.node_view("arms", "anger-management").unwrap();

    // Assert
    assert!(view.unlocked);
    assert!(view.increase.is_ok());
    assert_eq!(view.decrease, Err(Denial::NoPointsAllocated));
}

#[test]
fn given_concurrent_callers_when_spending_then_budget_never_exceeded() {
    // Arrange: 8 row-0 talents of rank 5, budget 12
    testing::init_test_setup();
    let tree = (0..8).fold(TreeDef::new("arms"), |t, i| {
        t.talent(TalentDef::new(format!("t{i}"), 0, i, 5))
    });
    let build = BuildBuilder::new(Rules::new(12, 5))
        .tree(tree)
        .build()
        .unwrap();
    let planner = Arc::new(PlannerService::new(build));

    // Act
    let applied: usize = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let planner = Arc::clone(&planner);
                s.spawn(move || {
                    (0..5)
                        .filter(|_| {
                            planner
                                .increase("arms", &format!("t{i}"))
                                .unwrap()
                                .is_applied()
                        })
                        .count()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });

    // Assert
    assert_eq!(applied, 12);
    assert_eq!(planner.totals().unwrap().total, 12);
}

#[rstest]
fn given_decision_queries_when_asking_then_build_is_not_mutated(planner: PlannerService) {
    // Act
    let increase = planner.can_increase("arms", "anger-management").unwrap();
    let decrease = planner.can_decrease("arms", "deflection").unwrap();
    let unlocked = planner.is_unlocked("arms", "deflection").unwrap();

    // Assert
    assert!(matches!(increase, Err(Denial::PrerequisiteUnmet { .. })));
    assert_eq!(decrease, Err(Denial::NoPointsAllocated));
    assert!(unlocked);
    assert_eq!(planner.totals().unwrap().total, 0);
    assert!(planner.can_increase("prot", "shield-wall").is_err());
}

#[test]
fn given_punctuated_ids_when_planning_from_text_then_steps_apply() {
    // Arrange
    testing::init_test_setup();
    let build = BuildBuilder::new(Rules::default())
        .tree(
            TreeDef::new("my tree")
                .talent(TalentDef::new("sweeping.strikes", 0, 0, 1))
                .talent(TalentDef::new("death's wish", 0, 1, 1)),
        )
        .build()
        .unwrap();
    let planner = PlannerService::new(build);
    let steps: Vec<Step> = [
        Step::increase("my tree", "sweeping.strikes"),
        Step::increase("my tree", "death's wish"),
    ]
    .iter()
    .map(|s| s.to_string().parse().unwrap())
    .collect();

    // Act
    let reports = planner.apply(&steps).unwrap();

    // Assert
    assert!(reports.iter().all(|r| r.outcome.is_applied()));
    assert_eq!(planner.points_spent("my tree").unwrap(), 2);
}
