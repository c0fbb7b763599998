use adg_core::{
    Decision, DecisionRepository, DecisionServiceError, FileDecisionRepository,
    FileModelRepository, ModelService,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

type Service = ModelService<FileModelRepository, FileDecisionRepository>;

fn setup_with(titles: &[&str]) -> (TempDir, PathBuf, Service, Vec<Decision>) {
    let dir = TempDir::new().unwrap();
    let model = dir.path().join("model");
    let service = ModelService::new(FileModelRepository::new(), FileDecisionRepository::default());
    service.create_model(&model).unwrap();
    let decisions = titles
        .iter()
        .map(|title| service.decisions().add_new(&model, title).unwrap())
        .collect();
    (dir, model, service, decisions)
}

fn file_text(service: &Service, model: &Path, id: &str) -> String {
    let path = service
        .decisions()
        .repo()
        .find_decision_file(model, id)
        .unwrap();
    std::fs::read_to_string(path).unwrap()
}

#[test]
fn default_link_writes_precedes_and_succeeds_pair() {
    let (_dir, model, service, mut ds) = setup_with(&["Use Kafka", "Schema registry"]);
    let (a, b) = ds.split_at_mut(1);

    service
        .decisions()
        .link(&model, &mut a[0], &mut b[0], "", "")
        .unwrap();

    let source = service.decisions().get_by_id(&model, "0001").unwrap();
    let target = service.decisions().get_by_id(&model, "0002").unwrap();
    assert_eq!(source.links.precedes, ["0002"]);
    assert_eq!(target.links.succeeds, ["0001"]);
    assert_eq!(source, a[0]);
    assert_eq!(target, b[0]);
    assert!(file_text(&service, &model, "0001").contains("links:\n  precedes:\n  - '0002'\n"));
}

#[test]
fn cycle_is_rejected_and_nothing_changes() {
    let (_dir, model, service, mut ds) = setup_with(&["A", "B", "C"]);
    let decisions = service.decisions();
    {
        let (left, right) = ds.split_at_mut(1);
        decisions
            .link(&model, &mut left[0], &mut right[0], "precedes", "succeeds")
            .unwrap();
        let (middle, last) = right.split_at_mut(1);
        decisions
            .link(&model, &mut middle[0], &mut last[0], "", "")
            .unwrap();
    }

    let before_a = file_text(&service, &model, "0001");
    let before_c = file_text(&service, &model, "0003");
    let index_before = std::fs::read_to_string(model.join("index.yaml")).unwrap();

    let mut c = decisions.get_by_id(&model, "0003").unwrap();
    let mut a = decisions.get_by_id(&model, "0001").unwrap();
    let err = decisions.link(&model, &mut c, &mut a, "", "").unwrap_err();
    assert!(matches!(
        err,
        DecisionServiceError::CycleDetected { source_id, target_id }
            if source_id == "0003" && target_id == "0001"
    ));

    assert!(c.links.precedes.is_empty());
    assert!(a.links.succeeds.is_empty());
    assert_eq!(file_text(&service, &model, "0001"), before_a);
    assert_eq!(file_text(&service, &model, "0003"), before_c);
    assert_eq!(
        std::fs::read_to_string(model.join("index.yaml")).unwrap(),
        index_before
    );
}

#[test]
fn direct_back_edge_is_a_cycle() {
    let (_dir, model, service, mut ds) = setup_with(&["A", "B"]);
    let decisions = service.decisions();
    let (a, b) = ds.split_at_mut(1);
    decisions.link(&model, &mut a[0], &mut b[0], "", "").unwrap();

    let err = decisions
        .link(&model, &mut b[0], &mut a[0], "", "")
        .unwrap_err();
    assert!(matches!(err, DecisionServiceError::CycleDetected { .. }));
}

#[test]
fn custom_links_are_unique_per_tag_and_skip_cycle_check() {
    let (_dir, model, service, mut ds) = setup_with(&["A", "B"]);
    let decisions = service.decisions();
    let (a, b) = ds.split_at_mut(1);

    decisions.link(&model, &mut a[0], &mut b[0], "", "").unwrap();
    decisions
        .link(&model, &mut b[0], &mut a[0], "blocks", "blocked by")
        .unwrap();
    decisions
        .link(&model, &mut b[0], &mut a[0], "blocks", "")
        .unwrap();
    decisions
        .link(&model, &mut a[0], &mut b[0], "relates to", "")
        .unwrap();

    let stored_a = decisions.get_by_id(&model, "0001").unwrap();
    let stored_b = decisions.get_by_id(&model, "0002").unwrap();
    assert_eq!(stored_b.links.custom["blocks"], ["0001"]);
    assert_eq!(stored_a.links.custom["blocked by"], ["0002"]);
    assert_eq!(stored_a.links.custom["relates to"], ["0002"]);
    assert!(!stored_b.links.custom.contains_key("relates to"));

    let text = file_text(&service, &model, "0002");
    assert!(text.contains(
        "links:\n  blocks:\n  - '0001'\n  precedes: []\n  succeeds:\n  - '0001'\n"
    ));
    assert!(!text.contains("custom"));
}

#[test]
fn self_link_and_reserved_tags_are_rejected() {
    let (_dir, model, service, mut ds) = setup_with(&["A", "B"]);
    let decisions = service.decisions();
    let mut same = ds[0].clone();

    let err = decisions
        .link(&model, &mut ds[0], &mut same, "", "")
        .unwrap_err();
    assert!(matches!(err, DecisionServiceError::SelfLink(id) if id == "0001"));

    let (a, b) = ds.split_at_mut(1);
    for (tag, reverse) in [("succeeds", ""), ("blocks", "precedes"), ("precedes", "follows")] {
        let err = decisions
            .link(&model, &mut a[0], &mut b[0], tag, reverse)
            .unwrap_err();
        assert!(matches!(err, DecisionServiceError::ReservedTag(_)));
    }
    assert!(decisions.get_by_id(&model, "0001").unwrap().links.is_empty());
}

#[test]
fn failed_target_save_reports_partial_link_and_keeps_source() {
    let (_dir, model, service, mut ds) = setup_with(&["A", "B"]);
    let decisions = service.decisions();
    let target_file = decisions.repo().find_decision_file(&model, "0002").unwrap();
    std::fs::remove_file(target_file).unwrap();

    let (a, b) = ds.split_at_mut(1);
    let err = decisions
        .link(&model, &mut a[0], &mut b[0], "", "")
        .unwrap_err();
    assert!(matches!(
        err,
        DecisionServiceError::PartialLink { saved_id, failed_id, .. }
            if saved_id == "0001" && failed_id == "0002"
    ));

    assert_eq!(a[0].links.precedes, ["0002"]);
    assert!(b[0].links.succeeds.is_empty());
    assert!(file_text(&service, &model, "0001").contains("  precedes:\n  - '0002'\n"));
    assert_eq!(
        decisions.get_by_id(&model, "0001").unwrap().links.precedes,
        ["0002"]
    );
}
